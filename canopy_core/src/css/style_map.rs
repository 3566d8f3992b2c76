// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable per-shape declaration tables.

use core::cmp::Reverse;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::property::StyleOrigin;
use super::pseudo::PseudoClassSet;
use super::selector::{Specificity, StateRequirement};
use super::value::ParsedValue;

/// Stable small-integer identity of a [`StyleMap`].
///
/// Ids are never reused, so a cache keyed by an id that was invalidated can
/// never be confused with a later map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StyleMapId(pub u32);

/// Identity of a stylesheet registered with a style manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SheetId(pub u32);

/// One candidate declaration for a property.
#[derive(Clone, Debug)]
pub struct CascadingStyle {
    /// Declared value.
    pub value: ParsedValue,
    /// Origin of the sheet the declaration came from.
    pub origin: StyleOrigin,
    /// Specificity of the selector.
    pub specificity: Specificity,
    /// Whether the declaration was `!important`.
    pub important: bool,
    /// Position of the rule among all matched rules; later wins ties.
    pub ordinal: u32,
    /// Pseudo-classes the selector needs, by chain position.
    pub requirement: Arc<StateRequirement>,
}

impl CascadingStyle {
    fn precedence(&self) -> (bool, StyleOrigin, Specificity, u32) {
        (self.important, self.origin, self.specificity, self.ordinal)
    }

    /// Whether `self` outranks `other` in the cascade.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        self.precedence() > other.precedence()
    }
}

/// The declarations that can apply to nodes of one static shape.
///
/// Candidates per property are sorted strongest first, so the first
/// candidate whose requirement holds wins.
#[derive(Debug)]
pub struct StyleMap {
    id: StyleMapId,
    styles: FxHashMap<SmolStr, Vec<CascadingStyle>>,
    triggers: Vec<PseudoClassSet>,
    sheets: SmallVec<[SheetId; 4]>,
}

impl StyleMap {
    /// Builds a map from unsorted candidates.
    #[must_use]
    pub fn new(
        id: StyleMapId,
        candidates: Vec<(SmolStr, CascadingStyle)>,
        sheets: SmallVec<[SheetId; 4]>,
    ) -> Self {
        let mut styles: FxHashMap<SmolStr, Vec<CascadingStyle>> = FxHashMap::default();
        let mut triggers = Vec::new();
        for (name, style) in candidates {
            style.requirement.collect_triggers(&mut triggers);
            styles.entry(name).or_default().push(style);
        }
        for list in styles.values_mut() {
            list.sort_by_key(|s| Reverse(s.precedence()));
        }
        Self {
            id,
            styles,
            triggers,
            sheets,
        }
    }

    /// Returns the map id.
    #[must_use]
    pub fn id(&self) -> StyleMapId {
        self.id
    }

    /// Returns the strongest candidate for `name` whose requirement holds
    /// for `states` (the node's state first, then its ancestors').
    #[must_use]
    pub fn find(&self, name: &str, states: &[PseudoClassSet]) -> Option<&CascadingStyle> {
        self.styles
            .get(name)?
            .iter()
            .find(|s| s.requirement.is_met(states))
    }

    /// Whether any candidate exists for `name`, regardless of state.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    /// Pseudo-classes that affect this map, by chain position.
    #[must_use]
    pub fn triggers(&self) -> &[PseudoClassSet] {
        &self.triggers
    }

    /// Stylesheets that contributed to this map.
    #[must_use]
    pub fn sheets(&self) -> &[SheetId] {
        &self.sheets
    }

    /// Whether the map has no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Names with at least one candidate.
    pub fn property_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.styles.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Selector;

    fn style(value: f64, origin: StyleOrigin, selector: &str, ordinal: u32) -> CascadingStyle {
        let sel = Selector::parse(selector).unwrap();
        CascadingStyle {
            value: ParsedValue::Number(value),
            origin,
            specificity: sel.specificity(),
            important: false,
            ordinal,
            requirement: Arc::new(StateRequirement::always()),
        }
    }

    #[test]
    fn strongest_candidate_first() {
        let map = StyleMap::new(
            StyleMapId(1),
            vec![
                ("x".into(), style(1.0, StyleOrigin::Author, ".a", 0)),
                ("x".into(), style(2.0, StyleOrigin::Author, ".a.b", 1)),
                ("x".into(), style(3.0, StyleOrigin::UserAgent, "#z.a.b", 2)),
                ("x".into(), style(4.0, StyleOrigin::Author, ".b", 3)),
            ],
            SmallVec::new(),
        );
        let found = map.find("x", &[PseudoClassSet::new()]).unwrap();
        assert_eq!(found.value, ParsedValue::Number(2.0), "origin, then specificity");
        assert!(map.find("y", &[]).is_none());
    }

    #[test]
    fn later_rule_wins_ties() {
        let map = StyleMap::new(
            StyleMapId(1),
            vec![
                ("x".into(), style(1.0, StyleOrigin::Author, ".a", 0)),
                ("x".into(), style(2.0, StyleOrigin::Author, ".b", 1)),
            ],
            SmallVec::new(),
        );
        assert_eq!(
            map.find("x", &[PseudoClassSet::new()]).unwrap().value,
            ParsedValue::Number(2.0)
        );
    }
}
