// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The CSS pass.
//!
//! Style resolution is cached at two tiers:
//!
//! 1. Each node keeps a [`StyleHelper`] naming its style map and the map ids
//!    of its styled ancestors. A reapply that yields the same map under the
//!    same ancestors keeps the helper.
//! 2. Nodes whose helpers name the same chain of maps share a cache. Within
//!    it, resolved values are stored per combination of relevant
//!    pseudo-class states and parent font, so a node in a state seen before
//!    is styled without running a single converter.
//!
//! When a helper is rebuilt, everything below it is resolved from scratch
//! once, whatever the shared cache holds.

use std::collections::hash_map::Entry;

use log::{trace, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::cache::{CacheEntry, CalculatedValue, EntryKey, Resolved, StyleCache, StyleStats};
use super::helper::{CacheKey, StyleHelper};
use super::lookup::{Chain, Resolver};
use super::manager::StyleSource;
use super::property::{PropertyId, PropertyRegistry, StyleOrigin};
use super::pseudo::PseudoClassSet;
use crate::error::StyleError;
use crate::node::{CssFlag, INVALID, NodeId, NodeStore};

/// Resolves and applies styles.
#[derive(Debug, Default)]
pub struct StyleEngine {
    registry: PropertyRegistry,
    caches: FxHashMap<CacheKey, StyleCache>,
    stats: StyleStats,
}

enum Visit {
    Styled { rebuilt: bool },
    Stale,
}

impl StyleEngine {
    /// Creates an engine with the standard properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with a custom registry.
    #[must_use]
    pub fn with_registry(registry: PropertyRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// The property registry.
    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    /// Mutable access to the registry. Drops every shared cache.
    pub fn registry_mut(&mut self) -> &mut PropertyRegistry {
        self.caches.clear();
        &mut self.registry
    }

    /// Counters since creation or the last [`reset_stats`](Self::reset_stats).
    #[must_use]
    pub fn stats(&self) -> StyleStats {
        self.stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&mut self) {
        self.stats = StyleStats::default();
    }

    /// Number of shared caches.
    #[must_use]
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    /// Drops every shared cache. Nodes styled from a dropped cache are
    /// reapplied the next time they are visited.
    pub fn clear(&mut self) {
        self.caches.clear();
    }

    /// Drops caches built from maps `source` no longer considers current.
    /// Returns how many were dropped.
    pub fn prune<S: StyleSource + ?Sized>(&mut self, source: &S) -> usize {
        let before = self.caches.len();
        self.caches
            .retain(|_, cache| cache.maps.iter().all(|m| source.is_current(m)));
        before - self.caches.len()
    }

    /// Runs the CSS pass over the subtree at `root`, including embedded
    /// sub-scenes. Returns the number of nodes styled.
    ///
    /// Flags are cleared as nodes are visited. A node found with stale
    /// cached state is flagged for reapply and its subtree is left for the
    /// next pass.
    pub fn apply_styles<S: StyleSource + ?Sized>(
        &mut self,
        store: &mut NodeStore,
        root: NodeId,
        source: &mut S,
    ) -> usize {
        store.validate(root);
        let mut styled = 0;
        let mut stack: Vec<(u32, CssFlag, bool)> = vec![(root.idx, CssFlag::Clean, false)];
        while let Some((idx, inherited, force)) = stack.pop() {
            let i = idx as usize;
            let flag = store.css_flag[i].max(inherited);
            store.css_flag[i] = CssFlag::Clean;
            if flag == CssFlag::Clean {
                continue;
            }
            let mut force_below = force;
            if flag >= CssFlag::Update {
                match self.style_node(store, idx, flag, force, source) {
                    Visit::Styled { rebuilt } => {
                        styled += 1;
                        force_below |= rebuilt;
                    }
                    Visit::Stale => continue,
                }
            }
            let down = if flag >= CssFlag::Update {
                flag
            } else {
                CssFlag::Clean
            };
            let sub = store.sub_root[i];
            if sub != INVALID {
                stack.push((sub, down, force_below));
            }
            for &c in store.children[i].iter().rev() {
                stack.push((c, down, force_below));
            }
        }
        styled
    }

    fn style_node<S: StyleSource + ?Sized>(
        &mut self,
        store: &mut NodeStore,
        idx: u32,
        flag: CssFlag,
        force: bool,
        source: &mut S,
    ) -> Visit {
        let i = idx as usize;
        let node = store.handle(idx);
        let mut chain = Chain::build(store, idx);
        let mut rebuilt = false;

        match &store.helper[i] {
            Some(helper) if flag < CssFlag::Reapply => {
                let stale = helper.map.as_ref().is_some_and(|m| !source.is_current(m))
                    || !self.caches.contains_key(&helper.key);
                if stale {
                    warn!("{node:?}: cached style state is stale, reapplying");
                    store.helper[i] = None;
                    store.mark_css(idx, CssFlag::Reapply);
                    self.stats.stale += 1;
                    return Visit::Stale;
                }
            }
            _ => {
                let map = source.style_map(store, node);
                let parent_ids = chain.parent_ids();
                let keep = store.helper[i].as_ref().is_some_and(|h| {
                    h.matches(map.as_ref(), &parent_ids) && self.caches.contains_key(&h.key)
                });
                if keep {
                    self.stats.helpers_reused += 1;
                } else {
                    store.helper[i] = Some(StyleHelper::new(map.clone(), parent_ids));
                    self.stats.helpers_built += 1;
                    rebuilt = true;
                }
                if let Some(map) = &map {
                    for (k, triggers) in map.triggers().iter().enumerate().skip(1) {
                        if triggers.is_empty() {
                            continue;
                        }
                        if let Some(&a) = chain.nodes.get(k) {
                            store.helper[a as usize]
                                .get_or_insert_with(StyleHelper::default)
                                .triggers
                                .union_with(triggers);
                        }
                    }
                }
                chain.set_own(map);
            }
        }

        let Some(helper) = &store.helper[i] else {
            return Visit::Stale;
        };
        let key = helper.key.clone();
        let parent_font = chain.parent_font();
        let states = chain
            .nodes
            .iter()
            .zip(&chain.states)
            .map(|(&n, state)| {
                store.helper[n as usize]
                    .as_ref()
                    .map(|h| state.intersection(&h.triggers))
                    .unwrap_or_default()
            })
            .collect::<SmallVec<[PseudoClassSet; 4]>>();
        let entry_key = EntryKey {
            states,
            font: parent_font.key(),
        };

        let cache = self
            .caches
            .entry(key)
            .or_insert_with(|| StyleCache::new(chain.key_maps()));
        let entry = match cache.entries.entry(entry_key) {
            Entry::Occupied(o) if !force => {
                trace!("{node:?}: style cache hit");
                self.stats.cache_hits += 1;
                o.into_mut()
            }
            slot => {
                trace!("{node:?}: resolving styles");
                let mut resolver = Resolver::new(&self.registry, &chain);
                let fresh = resolver.resolve_all(node);
                self.stats.cache_misses += 1;
                self.stats.converter_calls += resolver.converter_calls;
                self.stats.failures += resolver.failures;
                slot.insert_entry(fresh).into_mut()
            }
        };
        self.stats.failures += apply_entry(&self.registry, store, idx, entry);

        let font = store.props[i]
            .get(PropertyId::FONT)
            .and_then(|s| s.value.as_font().cloned())
            .unwrap_or(parent_font);
        if let Some(helper) = &mut store.helper[i] {
            helper.font = font;
        }
        self.stats.nodes_styled += 1;
        Visit::Styled { rebuilt }
    }

    /// Resolves one property of `node` against the styles attached by the
    /// last pass, reporting resolution errors instead of skipping.
    ///
    /// `Ok(None)` means no declaration applies.
    pub fn lookup(
        &self,
        store: &NodeStore,
        node: NodeId,
        prop: PropertyId,
    ) -> Result<Option<CalculatedValue>, StyleError> {
        store.validate(node);
        if usize::from(prop.index()) >= self.registry.len() {
            return Err(StyleError::UnknownProperty(SmolStr::new(format!("{prop:?}"))));
        }
        let chain = Chain::build(store, node.idx);
        let mut resolver = Resolver::new(&self.registry, &chain);
        let font = resolver.resolve_own_font();
        if prop == PropertyId::FONT {
            return font;
        }
        resolver.resolve(prop)
    }

    /// [`lookup`](Self::lookup) by property name.
    pub fn lookup_by_name(
        &self,
        store: &NodeStore,
        node: NodeId,
        name: &str,
    ) -> Result<Option<CalculatedValue>, StyleError> {
        let prop = self
            .registry
            .id(name)
            .ok_or_else(|| StyleError::UnknownProperty(SmolStr::new(name)))?;
        self.lookup(store, node, prop)
    }
}

/// Writes resolved values into a node. Returns the number of values that
/// failed validation; those become [`Resolved::Skip`] in the shared entry.
fn apply_entry(
    registry: &PropertyRegistry,
    store: &mut NodeStore,
    idx: u32,
    entry: &mut CacheEntry,
) -> u64 {
    let mut failures = 0;
    for (id, resolved) in entry.iter_mut() {
        let def = registry.def(*id);
        let current = store.props[idx as usize].get(*id);
        match resolved {
            Resolved::Skip => {}
            Resolved::Unset => {
                if current.is_some_and(|s| s.origin.is_style()) {
                    store.reset_property_at(idx, *id, def.effects);
                }
            }
            Resolved::Value(cv) => {
                // A value set by application code only yields to stylesheets
                // above the user agent's.
                if current.is_some_and(|s| s.origin == StyleOrigin::User)
                    && cv.origin == StyleOrigin::UserAgent
                {
                    continue;
                }
                if let Err(e) = def.validate(&cv.value) {
                    warn!("{:?}: keeping {}: {e}", store.handle(idx), def.name);
                    *resolved = Resolved::Skip;
                    failures += 1;
                    continue;
                }
                store.set_property_at(idx, *id, cv.value.clone(), cv.origin, def.effects);
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use kurbo::Insets;

    use super::*;
    use crate::css::{Color, ComputedValue, StyleManager, Stylesheet};
    use crate::node::NodeKind;

    struct Fixture {
        store: NodeStore,
        manager: StyleManager,
        engine: StyleEngine,
        root: NodeId,
        kids: Vec<NodeId>,
    }

    impl Fixture {
        fn new(sheet: &str, kids: usize) -> Self {
            let mut store = NodeStore::new();
            let root = store.create_node(NodeKind::Container);
            let kids: Vec<_> = (0..kids)
                .map(|_| {
                    let k = store.create_node(NodeKind::Leaf);
                    store.add_child(root, k).unwrap();
                    k
                })
                .collect();
            let mut manager = StyleManager::new();
            manager.add_stylesheet(Stylesheet::parse(StyleOrigin::Author, sheet).unwrap());
            Self {
                store,
                manager,
                engine: StyleEngine::new(),
                root,
                kids,
            }
        }

        fn pass(&mut self) -> usize {
            self.engine
                .apply_styles(&mut self.store, self.root, &mut self.manager)
        }

        fn value(&self, id: NodeId, prop: PropertyId) -> Option<ComputedValue> {
            self.store.property(id, prop).map(|s| s.value.clone())
        }
    }

    #[test]
    fn applies_matching_declarations() {
        let mut fx = Fixture::new("leaf { opacity: 0.5; fill: red }", 2);
        assert_eq!(fx.pass(), 3, "root and both leaves are styled");
        let kid = fx.kids[0];
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.5)),
            "opacity applied"
        );
        assert_eq!(
            fx.store.property(kid, PropertyId::FILL).map(|s| s.origin),
            Some(StyleOrigin::Author),
            "author origin recorded"
        );
        assert_eq!(fx.value(fx.root, PropertyId::OPACITY), None, "root untouched");
        assert_eq!(fx.store.css_flag(kid), CssFlag::Clean, "flags cleared");
        assert_eq!(fx.pass(), 0, "second pass has nothing to do");
    }

    #[test]
    fn update_is_served_from_the_shared_cache() {
        let mut fx = Fixture::new("leaf { opacity: 0.5; fill: red }", 3);
        fx.pass();
        let first = fx.engine.stats();
        assert!(first.converter_calls > 0, "first pass converts");

        for &k in &fx.kids {
            fx.store.mark_css(k.idx, CssFlag::Update);
        }
        assert_eq!(fx.pass(), 3, "every leaf restyled");
        let second = fx.engine.stats();
        assert_eq!(
            second.converter_calls, first.converter_calls,
            "no converter runs for a known state"
        );
        assert_eq!(second.cache_hits - first.cache_hits, 3, "one hit per leaf");
        assert_eq!(
            fx.value(fx.kids[2], PropertyId::FILL),
            Some(ComputedValue::Color(Color::rgb(255, 0, 0))),
            "values unchanged"
        );
    }

    #[test]
    fn unchanged_reapply_keeps_helpers() {
        let mut fx = Fixture::new("leaf { opacity: 0.5 }", 2);
        fx.pass();
        let before = fx.engine.stats();
        fx.store.request_css_reapply(fx.root);
        assert_eq!(fx.pass(), 3, "whole subtree visited");
        let after = fx.engine.stats();
        assert_eq!(after.helpers_reused - before.helpers_reused, 3, "helpers kept");
        assert_eq!(after.helpers_built, before.helpers_built, "nothing rebuilt");
        assert_eq!(after.converter_calls, before.converter_calls, "no conversions");
    }

    #[test]
    fn user_value_survives_user_agent_styles_only() {
        let mut fx = Fixture::new("leaf.loud { opacity: 0.6 }", 1);
        let kid = fx.kids[0];
        fx.manager.add_stylesheet(
            Stylesheet::parse(StyleOrigin::UserAgent, "leaf { opacity: 0.3 }").unwrap(),
        );
        fx.store.set_property_at(
            kid.idx,
            PropertyId::OPACITY,
            ComputedValue::Number(0.9),
            StyleOrigin::User,
            fx.engine.registry().def(PropertyId::OPACITY).effects,
        );
        fx.pass();
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.9)),
            "user value outranks the user agent"
        );

        fx.store.add_style_class(kid, "loud");
        fx.pass();
        let slot = fx.store.property(kid, PropertyId::OPACITY).cloned().unwrap();
        assert_eq!(slot.value, ComputedValue::Number(0.6), "author outranks user");
        assert_eq!(slot.origin, StyleOrigin::Author, "origin follows the winner");
    }

    #[test]
    fn pseudo_class_change_restyles_only_that_node() {
        let mut fx = Fixture::new("leaf:hover { opacity: 0.5 }", 3);
        fx.pass();
        let hovered = fx.kids[1];

        fx.store.set_pseudo_class(fx.kids[0], "focused", true);
        assert_eq!(fx.store.css_flag(fx.kids[0]), CssFlag::Clean, "unrelated state");

        fx.store.set_pseudo_class(hovered, "hover", true);
        assert_eq!(fx.store.css_flag(hovered), CssFlag::Update, "hovered node");
        assert_eq!(fx.store.css_flag(fx.root), CssFlag::DirtyBranch, "path to root");
        assert_eq!(fx.store.css_flag(fx.kids[0]), CssFlag::Clean, "sibling");
        assert_eq!(fx.store.css_flag(fx.kids[2]), CssFlag::Clean, "sibling");

        assert_eq!(fx.pass(), 1, "one node restyled");
        assert_eq!(
            fx.value(hovered, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.5)),
            "hover style applied"
        );
        assert_eq!(fx.value(fx.kids[2], PropertyId::OPACITY), None, "sibling untouched");

        fx.store.set_pseudo_class(hovered, "hover", false);
        fx.pass();
        assert_eq!(fx.value(hovered, PropertyId::OPACITY), None, "style value cleared");
    }

    #[test]
    fn ancestor_state_reaches_descendant_selectors() {
        let mut fx = Fixture::new("container:hover leaf { opacity: 0.25 }", 2);
        fx.pass();
        fx.store.set_pseudo_class(fx.root, "hover", true);
        assert_eq!(fx.store.css_flag(fx.root), CssFlag::Update, "root triggers");
        fx.pass();
        for &k in &fx.kids {
            assert_eq!(
                fx.value(k, PropertyId::OPACITY),
                Some(ComputedValue::Number(0.25)),
                "descendant styled by ancestor state"
            );
        }
    }

    #[test]
    fn reference_cycle_is_reported_and_skipped() {
        let mut fx = Fixture::new(
            "leaf { --a: var(--b); --b: var(--a); fill: var(--a); opacity: 0.5 }",
            1,
        );
        fx.pass();
        let kid = fx.kids[0];
        assert_eq!(fx.value(kid, PropertyId::FILL), None, "cyclic value skipped");
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.5)),
            "other properties still apply"
        );
        assert!(fx.engine.stats().failures >= 1, "failure counted");
        assert_eq!(
            fx.engine.lookup(&fx.store, kid, PropertyId::FILL),
            Err(StyleError::ReferenceCycle {
                chain: vec!["--a".into(), "--b".into(), "--a".into()],
            }),
            "lookup names the cycle"
        );
    }

    #[test]
    fn references_resolve_through_ancestors() {
        let mut fx = Fixture::new(
            "container { --accent: #00ff00 } leaf { fill: var(--accent); text-fill: var(--missing) }",
            1,
        );
        fx.pass();
        let kid = fx.kids[0];
        assert_eq!(
            fx.value(kid, PropertyId::FILL),
            Some(ComputedValue::Color(Color::rgb(0, 255, 0))),
            "named value found on the parent"
        );
        assert_eq!(
            fx.engine.lookup_by_name(&fx.store, kid, "text-fill"),
            Err(StyleError::UnresolvedReference("--missing".into())),
            "missing reference reported"
        );
    }

    #[test]
    fn relative_units_follow_the_inherited_font() {
        let mut fx = Fixture::new(
            "container { font-size: 20px; opacity: 0.4 } leaf { padding: 1em; opacity: inherit }",
            1,
        );
        fx.pass();
        let kid = fx.kids[0];
        assert_eq!(
            fx.value(kid, PropertyId::PADDING),
            Some(ComputedValue::Insets(Insets::uniform(20.0))),
            "em resolves against the parent's font"
        );
        assert_eq!(
            fx.value(kid, PropertyId::FONT_SIZE),
            Some(ComputedValue::Number(20.0)),
            "font size inherited"
        );
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.4)),
            "inherit takes the parent's value"
        );
        let font = fx.engine.lookup(&fx.store, kid, PropertyId::FONT).unwrap().unwrap();
        assert!(!font.relative, "inherited font is absolute");
    }

    #[test]
    fn shorthand_and_components_combine() {
        let mut fx = Fixture::new("leaf { padding: 1px 2px } .side { padding-left: 7px }", 1);
        let kid = fx.kids[0];
        fx.store.add_style_class(kid, "side");
        fx.pass();
        assert_eq!(
            fx.value(kid, PropertyId::PADDING),
            Some(ComputedValue::Insets(Insets::new(7.0, 1.0, 2.0, 1.0))),
            "stronger component overrides its side"
        );
        assert_eq!(
            fx.value(kid, PropertyId::PADDING_TOP),
            Some(ComputedValue::Number(1.0)),
            "component read from the shorthand"
        );
        assert_eq!(
            fx.value(kid, PropertyId::PADDING_LEFT),
            Some(ComputedValue::Number(7.0)),
            "own component wins"
        );
    }

    #[test]
    fn font_shorthand_and_weight() {
        let mut fx = Fixture::new("leaf { font: italic 16px Serif } .bold { font-weight: bold }", 1);
        let kid = fx.kids[0];
        fx.store.add_style_class(kid, "bold");
        fx.pass();
        let font = fx
            .value(kid, PropertyId::FONT)
            .and_then(|v| v.as_font().cloned())
            .unwrap();
        assert_eq!(font.size, 16.0, "size");
        assert_eq!(font.family, "Serif", "family");
        assert_eq!(font.weight, 700, "component outranks shorthand");
        assert_eq!(
            fx.value(kid, PropertyId::FONT_STYLE),
            Some(ComputedValue::Ident("italic".into())),
            "style extracted"
        );
    }

    #[test]
    fn closer_font_component_beats_farther_shorthand() {
        let mut fx = Fixture::new("container { font: 20px Serif } leaf { font-size: 10px }", 1);
        fx.pass();
        let font = fx
            .value(fx.kids[0], PropertyId::FONT)
            .and_then(|v| v.as_font().cloned())
            .unwrap();
        assert_eq!(font.size, 10.0, "own font-size wins over the parent's shorthand");
        assert_eq!(font.family, "Serif", "family still inherited");
    }

    #[test]
    fn relative_font_sizes_do_not_compound() {
        let mut fx = Fixture::new(
            "container { font-size: 20px } leaf { font: 150% Serif; font-size: 150% }",
            1,
        );
        fx.pass();
        let kid = fx.kids[0];
        let font = fx
            .value(kid, PropertyId::FONT)
            .and_then(|v| v.as_font().cloned())
            .unwrap();
        assert_eq!(font.size, 30.0, "both resolve against the parent's 20px");
        assert_eq!(font.family, "Serif", "family from the shorthand");
        assert_eq!(
            fx.value(kid, PropertyId::FONT_SIZE),
            Some(ComputedValue::Number(30.0)),
            "component agrees"
        );
        let looked_up = fx.engine.lookup(&fx.store, kid, PropertyId::FONT).unwrap().unwrap();
        assert!(looked_up.relative, "percent sizes are font-relative");
    }

    #[test]
    fn invalid_value_keeps_previous() {
        let mut fx = Fixture::new("leaf { opacity: 0.5 } .bad { opacity: 3 }", 1);
        let kid = fx.kids[0];
        fx.pass();
        fx.store.add_style_class(kid, "bad");
        fx.pass();
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.5)),
            "rejected value leaves the old one"
        );
        assert_eq!(fx.engine.stats().failures, 1, "one rejection");
    }

    #[test]
    fn dropped_cache_triggers_reapply() {
        let mut fx = Fixture::new("leaf { opacity: 0.5 }", 1);
        let kid = fx.kids[0];
        fx.pass();
        fx.engine.clear();
        fx.store.mark_css(kid.idx, CssFlag::Update);
        assert_eq!(fx.pass(), 0, "stale node skipped");
        assert_eq!(fx.engine.stats().stale, 1, "staleness counted");
        assert_eq!(fx.store.css_flag(kid), CssFlag::Reapply, "reapply scheduled");
        assert!(fx.store.pulse_requested(), "another pulse wanted");
        assert_eq!(fx.pass(), 1, "recovered on the next pass");
        assert_eq!(
            fx.value(kid, PropertyId::OPACITY),
            Some(ComputedValue::Number(0.5)),
            "value intact"
        );
    }

    #[test]
    fn sheet_change_prunes_and_restyles() {
        let mut fx = Fixture::new("leaf { opacity: 0.5 }", 1);
        fx.pass();
        let caches = fx.engine.cache_count();
        fx.manager.add_stylesheet(
            Stylesheet::parse(StyleOrigin::Author, "leaf { opacity: 0.75 }").unwrap(),
        );
        assert!(fx.engine.prune(&fx.manager) >= 1, "stale caches dropped");
        assert!(fx.engine.cache_count() < caches, "fewer caches");
        fx.store.request_css_reapply(fx.root);
        fx.pass();
        assert_eq!(
            fx.value(fx.kids[0], PropertyId::OPACITY),
            Some(ComputedValue::Number(0.75)),
            "later sheet wins"
        );
    }
}
