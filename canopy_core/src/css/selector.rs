// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selectors and matching against a node's ancestor chain.
//!
//! Matching is split in two. The static part (type, id, classes, and
//! combinators) is checked once, when a node's style map is built. What is
//! left is a [`StateRequirement`]: which pseudo-classes must be present at
//! which chain positions for the selector to apply. Requirements are checked
//! against state snapshots at lookup time, so a style map can be shared by
//! every node with the same static shape.

use smallvec::SmallVec;
use smol_str::SmolStr;

use super::pseudo::{PseudoClass, PseudoClassSet};
use crate::error::StyleError;

/// The static identity of one node in an ancestor chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectorSubject {
    /// Type selector name.
    pub type_name: SmolStr,
    /// Style id (`#id`).
    pub id: Option<SmolStr>,
    /// Style classes (`.class`).
    pub classes: SmallVec<[SmolStr; 2]>,
}

/// One compound selector, e.g. `container.toolbar:hover`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SimpleSelector {
    /// Required type name; `None` matches any type.
    pub type_name: Option<SmolStr>,
    /// Required style id.
    pub id: Option<SmolStr>,
    /// Required style classes.
    pub classes: SmallVec<[SmolStr; 2]>,
    /// Required pseudo-classes.
    pub pseudo_classes: PseudoClassSet,
}

impl SimpleSelector {
    fn matches_static(&self, subject: &SelectorSubject) -> bool {
        if let Some(t) = &self.type_name
            && *t != subject.type_name
        {
            return false;
        }
        if let Some(id) = &self.id
            && subject.id.as_ref() != Some(id)
        {
            return false;
        }
        self.classes.iter().all(|c| subject.classes.contains(c))
    }

    fn parse(text: &str) -> Result<Self, StyleError> {
        let mut out = Self::default();
        let mut rest = text;
        let head_end = rest.find(['#', '.', ':']).unwrap_or(rest.len());
        let head = &rest[..head_end];
        if !head.is_empty() && head != "*" {
            if !is_name(head) {
                return Err(StyleError::Parse(format!("bad type selector {head:?}")));
            }
            out.type_name = Some(SmolStr::new(head));
        }
        rest = &rest[head_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.', ':']).unwrap_or(body.len());
            let name = &body[..end];
            if !is_name(name) {
                return Err(StyleError::Parse(format!("bad selector part {rest:?}")));
            }
            match marker {
                '#' => out.id = Some(SmolStr::new(name)),
                '.' => out.classes.push(SmolStr::new(name)),
                _ => {
                    out.pseudo_classes.insert(PseudoClass::new(name));
                }
            }
            rest = &body[end..];
        }
        Ok(out)
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Relation between adjacent compounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `a b`: any ancestor.
    Descendant,
    /// `a > b`: the direct parent.
    Child,
}

/// CSS specificity: (ids, classes and pseudo-classes, types).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u16, pub u16, pub u16);

impl Specificity {
    /// Higher than any selector can reach.
    pub const INLINE: Self = Self(u16::MAX, u16::MAX, u16::MAX);
}

/// A complex selector.
///
/// Compounds are stored subject-first: `compounds[0]` must match the node
/// itself, and `combinators[i]` relates `compounds[i]` to `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    compounds: SmallVec<[SimpleSelector; 3]>,
    combinators: SmallVec<[Combinator; 2]>,
}

impl Selector {
    /// Parses a single complex selector (no commas).
    pub fn parse(text: &str) -> Result<Self, StyleError> {
        let mut compounds = SmallVec::<[SimpleSelector; 3]>::new();
        let mut combinators = SmallVec::<[Combinator; 2]>::new();
        let spaced = text.replace('>', " > ");
        let mut pending = None;
        for token in spaced.split_whitespace() {
            if token == ">" {
                if compounds.is_empty() || pending.is_some() {
                    return Err(StyleError::Parse(format!("dangling '>' in {text:?}")));
                }
                pending = Some(Combinator::Child);
                continue;
            }
            if !compounds.is_empty() {
                combinators.push(pending.take().unwrap_or(Combinator::Descendant));
            }
            compounds.push(SimpleSelector::parse(token)?);
        }
        if compounds.is_empty() || pending.is_some() {
            return Err(StyleError::Parse(format!("incomplete selector {text:?}")));
        }
        compounds.reverse();
        combinators.reverse();
        Ok(Self {
            compounds,
            combinators,
        })
    }

    /// Returns the specificity.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        let mut s = Specificity::default();
        for c in &self.compounds {
            s.0 += u16::from(c.id.is_some());
            s.1 += u16::try_from(c.classes.len() + c.pseudo_classes.len()).unwrap_or(u16::MAX);
            s.2 += u16::from(c.type_name.is_some());
        }
        s
    }

    /// The compound that must match the node itself.
    #[must_use]
    pub fn subject(&self) -> &SimpleSelector {
        &self.compounds[0]
    }

    /// Matches the static parts of the selector against `chain` (node first,
    /// then its ancestors) and returns the pseudo-class requirement, or
    /// `None` if the selector can never apply.
    ///
    /// Runs in time linear in the chain length per compound, however many
    /// ways the compounds can be placed.
    #[must_use]
    pub fn match_chain(&self, chain: &[SelectorSubject]) -> Option<StateRequirement> {
        let n = chain.len();
        let m = self.compounds.len();
        if n == 0 {
            return None;
        }
        let fits: Vec<Vec<bool>> = self
            .compounds
            .iter()
            .map(|c| chain.iter().map(|s| c.matches_static(s)).collect())
            .collect();

        // `reach[k][pos]`: compounds 0..=k can be placed with k at `pos`.
        let mut reach = vec![vec![false; n]; m];
        reach[0][0] = fits[0][0];
        for k in 1..m {
            let mut seen = false;
            for pos in 1..n {
                let prev = reach[k - 1][pos - 1];
                seen |= prev;
                let linked = match self.combinators[k - 1] {
                    Combinator::Child => prev,
                    Combinator::Descendant => seen,
                };
                reach[k][pos] = linked && fits[k][pos];
            }
        }
        if !reach[m - 1].iter().any(|&r| r) {
            return None;
        }

        // `finish[k][pos]`: compounds k.. can be placed with k at `pos`.
        let mut finish = vec![vec![false; n]; m];
        finish[m - 1].clone_from(&fits[m - 1]);
        for k in (0..m - 1).rev() {
            let mut later = false;
            for pos in (0..n).rev() {
                let next = pos + 1 < n && finish[k + 1][pos + 1];
                later |= next;
                let linked = match self.combinators[k] {
                    Combinator::Child => next,
                    Combinator::Descendant => later,
                };
                finish[k][pos] = linked && fits[k][pos];
            }
        }

        if self.compounds.iter().all(|c| c.pseudo_classes.is_empty()) {
            return Some(StateRequirement::always());
        }
        let steps = self
            .compounds
            .iter()
            .enumerate()
            .map(|(k, c)| Step {
                positions: (0..n)
                    .filter(|&pos| reach[k][pos] && finish[k][pos])
                    .filter_map(|pos| u16::try_from(pos).ok())
                    .collect(),
                pseudo_classes: c.pseudo_classes.clone(),
            })
            .collect();
        Some(StateRequirement {
            steps,
            combinators: self.combinators.clone(),
        })
    }
}

/// Where one compound can land on the chain, and what it needs there.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Step {
    /// Ascending chain positions on some complete static match.
    positions: SmallVec<[u16; 4]>,
    pseudo_classes: PseudoClassSet,
}

/// The pseudo-classes a statically matched selector still needs.
///
/// For each compound it keeps the chain positions the compound can occupy
/// and the pseudo-classes it requires there. The selector applies if the
/// compounds can be placed, respecting the combinators, on positions whose
/// state holds the required pseudo-classes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateRequirement {
    steps: SmallVec<[Step; 3]>,
    combinators: SmallVec<[Combinator; 2]>,
}

impl StateRequirement {
    /// A requirement that always holds.
    #[must_use]
    pub fn always() -> Self {
        Self {
            steps: SmallVec::new(),
            combinators: SmallVec::new(),
        }
    }

    /// Whether the requirement holds for `states` (node first, then its
    /// ancestors).
    #[must_use]
    pub fn is_met(&self, states: &[PseudoClassSet]) -> bool {
        let holds = |step: &Step, pos: u16| {
            step.pseudo_classes.is_empty()
                || states
                    .get(usize::from(pos))
                    .is_some_and(|have| step.pseudo_classes.is_subset(have))
        };
        let mut reach: SmallVec<[u16; 8]> = SmallVec::new();
        for (k, step) in self.steps.iter().enumerate() {
            let next: SmallVec<[u16; 8]> = if k == 0 {
                step.positions
                    .iter()
                    .copied()
                    .filter(|&pos| holds(step, pos))
                    .collect()
            } else {
                let lowest = reach[0];
                step.positions
                    .iter()
                    .copied()
                    .filter(|&pos| match self.combinators[k - 1] {
                        Combinator::Child => pos > 0 && reach.binary_search(&(pos - 1)).is_ok(),
                        Combinator::Descendant => pos > lowest,
                    })
                    .filter(|&pos| holds(step, pos))
                    .collect()
            };
            if next.is_empty() {
                return false;
            }
            reach = next;
        }
        true
    }

    /// Whether no pseudo-class is ever needed.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.steps.iter().all(|s| s.pseudo_classes.is_empty())
    }

    /// Adds every pseudo-class mentioned at each position into `triggers`,
    /// growing it as needed.
    pub fn collect_triggers(&self, triggers: &mut Vec<PseudoClassSet>) {
        for step in self.steps.iter().filter(|s| !s.pseudo_classes.is_empty()) {
            for &pos in &step.positions {
                let pos = usize::from(pos);
                if triggers.len() <= pos {
                    triggers.resize_with(pos + 1, PseudoClassSet::new);
                }
                triggers[pos].union_with(&step.pseudo_classes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(type_name: &str, classes: &[&str]) -> SelectorSubject {
        SelectorSubject {
            type_name: SmolStr::new(type_name),
            id: None,
            classes: classes.iter().map(|c| SmolStr::new(*c)).collect(),
        }
    }

    fn states(list: &[&[&str]]) -> Vec<PseudoClassSet> {
        list.iter()
            .map(|s| s.iter().copied().collect())
            .collect()
    }

    #[test]
    fn parses_compounds_and_combinators() {
        let sel = Selector::parse("container.bar > leaf#ok.a:hover").unwrap();
        assert_eq!(sel.specificity(), Specificity(1, 3, 2));
        assert_eq!(sel.subject().id.as_deref(), Some("ok"));
        assert!(Selector::parse("> .a").is_err());
        assert!(Selector::parse(".a >").is_err());
        assert!(Selector::parse(".a..b").is_err());
    }

    #[test]
    fn descendant_matches_any_ancestor() {
        let sel = Selector::parse(".x .y").unwrap();
        let chain = [subject("leaf", &["y"]), subject("container", &[]), subject("container", &["x"])];
        let req = sel.match_chain(&chain).expect("static match");
        assert!(req.is_unconditional());
    }

    #[test]
    fn child_requires_direct_parent() {
        let sel = Selector::parse(".x > .y").unwrap();
        let chain = [subject("leaf", &["y"]), subject("container", &[]), subject("container", &["x"])];
        assert!(sel.match_chain(&chain).is_none());
    }

    #[test]
    fn pseudo_classes_become_positional_requirements() {
        let sel = Selector::parse(".x:hover .y").unwrap();
        let chain = [subject("leaf", &["y"]), subject("container", &["x"]), subject("container", &["x"])];
        let req = sel.match_chain(&chain).unwrap();
        assert!(!req.is_met(&states(&[&[], &[], &[]])));
        assert!(req.is_met(&states(&[&[], &["hover"], &[]])));
        assert!(req.is_met(&states(&[&[], &[], &["hover"]])), "either ancestor may match");
        assert!(!req.is_met(&states(&[&["hover"], &[], &[]])));

        let mut triggers = Vec::new();
        req.collect_triggers(&mut triggers);
        assert_eq!(triggers.len(), 3);
        assert!(triggers[0].is_empty());
        assert_eq!(triggers[1], ["hover"].into_iter().collect());
    }


    #[test]
    fn deep_descendant_chains_stay_linear() {
        let sel = Selector::parse("container:hover container container container leaf").unwrap();
        let mut chain = vec![subject("leaf", &[])];
        chain.extend((0..60).map(|_| subject("container", &[])));
        let req = sel.match_chain(&chain).expect("static match");
        assert!(!req.is_unconditional());

        let mut states = vec![PseudoClassSet::new(); chain.len()];
        assert!(!req.is_met(&states), "no hover anywhere");
        states[3] = ["hover"].into_iter().collect();
        assert!(!req.is_met(&states), "too close for three more containers");
        states[40] = ["hover"].into_iter().collect();
        assert!(req.is_met(&states), "far enough up");

        let mut triggers = Vec::new();
        req.collect_triggers(&mut triggers);
        assert_eq!(triggers.len(), 61, "every position the hover compound can take");
        assert!(triggers[3].is_empty() && !triggers[4].is_empty());

        let plain = Selector::parse("container container container container leaf").unwrap();
        assert!(plain.match_chain(&chain).expect("static match").is_unconditional());
    }

    #[test]
    fn child_after_descendant_needs_adjacent_positions() {
        let sel = Selector::parse(".x:hover > .y:focused .z").unwrap();
        let chain = [
            subject("leaf", &["z"]),
            subject("container", &["y"]),
            subject("container", &["x"]),
            subject("container", &["y"]),
            subject("container", &["x"]),
        ];
        let req = sel.match_chain(&chain).unwrap();
        assert!(req.is_met(&states(&[&[], &["focused"], &["hover"], &[], &[]])));
        assert!(req.is_met(&states(&[&[], &[], &[], &["focused"], &["hover"]])));
        assert!(
            !req.is_met(&states(&[&[], &["focused"], &[], &[], &["hover"]])),
            "hover must sit directly above the focused node"
        );
    }
}
