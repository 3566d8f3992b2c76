// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stylesheet registry and style map construction.
//!
//! The style engine does not read stylesheets. It asks a [`StyleSource`] for
//! the [`StyleMap`] of each node it restyles and whether a map it holds is
//! still valid. [`StyleManager`] is the stock source: it keeps user-agent,
//! author, and subtree-scoped stylesheets, matches selectors statically
//! against a node's ancestor chain, and interns the result so that nodes
//! with the same shape share one map.
//!
//! A map stays current until a stylesheet it was built from is removed, or
//! until a global sheet is added or removed.

use std::sync::Arc;

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::property::StyleOrigin;
use super::selector::{SelectorSubject, Specificity, StateRequirement};
use super::style_map::{CascadingStyle, SheetId, StyleMap, StyleMapId};
use super::stylesheet::{Declaration, Stylesheet, parse_declarations};
use crate::node::{INVALID, NodeId, NodeStore};

/// Supplies style maps to the style engine.
pub trait StyleSource {
    /// Returns the map for `node` given its current ancestry, classes, and
    /// inline style, or `None` if nothing can apply.
    fn style_map(&mut self, store: &NodeStore, node: NodeId) -> Option<Arc<StyleMap>>;

    /// Whether `map` may still be used.
    fn is_current(&self, map: &StyleMap) -> bool;
}

#[derive(Clone, Debug)]
struct SheetEntry {
    id: SheetId,
    sheet: Arc<Stylesheet>,
}

/// Identity of an interned map.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MapKey {
    /// `(sheet, rule index, requirement)` for every matched rule, in
    /// cascade order.
    matched: Vec<(SheetId, u32, StateRequirement)>,
    inline: Option<SmolStr>,
}

/// The stock [`StyleSource`].
#[derive(Debug, Default)]
pub struct StyleManager {
    user_agent: Vec<SheetEntry>,
    author: Vec<SheetEntry>,
    scoped: FxHashMap<NodeId, Vec<SheetEntry>>,
    maps: FxHashMap<MapKey, Arc<StyleMap>>,
    live: FxHashSet<StyleMapId>,
    inline: FxHashMap<SmolStr, Arc<[Declaration]>>,
    next_sheet: u32,
    next_map: u32,
}

impl StyleManager {
    /// Creates a manager with no stylesheets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stylesheet that applies to every node.
    ///
    /// User-agent sheets are consulted before all others. Every map built so
    /// far stops being current.
    pub fn add_stylesheet(&mut self, sheet: Stylesheet) -> SheetId {
        let id = self.next_sheet_id();
        let entry = SheetEntry {
            id,
            sheet: Arc::new(sheet),
        };
        if entry.sheet.origin == StyleOrigin::UserAgent {
            self.user_agent.push(entry);
        } else {
            self.author.push(entry);
        }
        self.invalidate_all();
        id
    }

    /// Adds a stylesheet that applies to `scope` and its descendants,
    /// including nodes embedded below it through sub-scenes.
    ///
    /// Existing maps stay current; the caller should request a reapply of
    /// the subtree.
    pub fn add_scoped_stylesheet(&mut self, scope: NodeId, sheet: Stylesheet) -> SheetId {
        let id = self.next_sheet_id();
        self.scoped.entry(scope).or_default().push(SheetEntry {
            id,
            sheet: Arc::new(sheet),
        });
        id
    }

    /// Removes a stylesheet. Returns whether it was registered.
    pub fn remove_stylesheet(&mut self, id: SheetId) -> bool {
        let global = [&mut self.user_agent, &mut self.author]
            .into_iter()
            .any(|list| remove_entry(list, id));
        if global {
            self.invalidate_all();
            return true;
        }
        let mut found = false;
        self.scoped.retain(|_, list| {
            found |= remove_entry(list, id);
            !list.is_empty()
        });
        if found {
            self.invalidate_sheet(id);
        }
        found
    }

    /// Drops every stylesheet scoped to `scope`, e.g. when the node is
    /// destroyed. Returns whether any was registered.
    pub fn forget(&mut self, scope: NodeId) -> bool {
        let Some(list) = self.scoped.remove(&scope) else {
            return false;
        };
        for entry in list {
            self.invalidate_sheet(entry.id);
        }
        true
    }

    /// Number of interned, current maps.
    #[must_use]
    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    fn next_sheet_id(&mut self) -> SheetId {
        let id = SheetId(self.next_sheet);
        self.next_sheet += 1;
        id
    }

    fn invalidate_all(&mut self) {
        debug!("dropping {} style maps", self.maps.len());
        self.maps.clear();
        self.live.clear();
    }

    fn invalidate_sheet(&mut self, sheet: SheetId) {
        let live = &mut self.live;
        self.maps.retain(|_, map| {
            let keep = !map.sheets().contains(&sheet);
            if !keep {
                live.remove(&map.id());
            }
            keep
        });
    }

    fn inline_declarations(&mut self, text: &SmolStr) -> Arc<[Declaration]> {
        if let Some(decls) = self.inline.get(text) {
            return decls.clone();
        }
        let decls: Arc<[Declaration]> = match parse_declarations(text) {
            Ok(decls) => decls.into(),
            Err(e) => {
                warn!("ignoring inline style {text:?}: {e}");
                Arc::from([])
            }
        };
        self.inline.insert(text.clone(), decls.clone());
        decls
    }
}

fn remove_entry(list: &mut Vec<SheetEntry>, id: SheetId) -> bool {
    let before = list.len();
    list.retain(|e| e.id != id);
    list.len() != before
}

impl StyleSource for StyleManager {
    fn style_map(&mut self, store: &NodeStore, node: NodeId) -> Option<Arc<StyleMap>> {
        store.validate(node);
        let mut subjects: SmallVec<[SelectorSubject; 8]> = SmallVec::new();
        let mut cur = node.idx;
        while cur != INVALID {
            let i = cur as usize;
            subjects.push(SelectorSubject {
                type_name: store.style_type[i].clone(),
                id: store.style_id[i].clone(),
                classes: store.style_classes[i].clone(),
            });
            cur = store.parent[i];
        }

        let mut scopes: SmallVec<[u32; 8]> = store.ancestors_inclusive(node.idx).collect();
        scopes.reverse();
        let scoped = scopes
            .iter()
            .filter_map(|&a| self.scoped.get(&store.handle(a)))
            .flatten();

        let mut matched = Vec::new();
        let mut rules = Vec::new();
        for entry in self.user_agent.iter().chain(&self.author).chain(scoped) {
            for (r, rule) in entry.sheet.rules.iter().enumerate() {
                if let Some(req) = rule.selector.match_chain(&subjects) {
                    let r = u32::try_from(r).unwrap_or(u32::MAX);
                    matched.push((entry.id, r, req));
                    rules.push((entry.sheet.origin, rule.clone()));
                }
            }
        }
        let inline = store.inline_style[node.idx as usize].clone();
        if matched.is_empty() && inline.is_none() {
            return None;
        }

        let key = MapKey { matched, inline };
        if let Some(map) = self.maps.get(&key) {
            return Some(map.clone());
        }

        let mut candidates = Vec::new();
        let mut sheets: SmallVec<[SheetId; 4]> = SmallVec::new();
        let mut ordinal = 0_u32;
        for ((sheet, _, req), (origin, rule)) in key.matched.iter().zip(rules) {
            if !sheets.contains(sheet) {
                sheets.push(*sheet);
            }
            let requirement = Arc::new(req.clone());
            for decl in rule.declarations.iter() {
                candidates.push((
                    decl.property.clone(),
                    CascadingStyle {
                        value: decl.value.clone(),
                        origin,
                        specificity: rule.selector.specificity(),
                        important: decl.important,
                        ordinal,
                        requirement: requirement.clone(),
                    },
                ));
            }
            ordinal += 1;
        }
        if let Some(text) = &key.inline {
            let always = Arc::new(StateRequirement::always());
            for decl in self.inline_declarations(text).iter() {
                candidates.push((
                    decl.property.clone(),
                    CascadingStyle {
                        value: decl.value.clone(),
                        origin: StyleOrigin::Inline,
                        specificity: Specificity::INLINE,
                        important: decl.important,
                        ordinal,
                        requirement: always.clone(),
                    },
                ));
            }
        }

        let id = StyleMapId(self.next_map);
        self.next_map += 1;
        let map = Arc::new(StyleMap::new(id, candidates, sheets));
        debug!("built style map {id:?} for {node:?}");
        self.live.insert(id);
        self.maps.insert(key, map.clone());
        Some(map)
    }

    fn is_current(&self, map: &StyleMap) -> bool {
        self.live.contains(&map.id())
    }
}
