// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node style attachment.

use std::sync::Arc;

use smallvec::SmallVec;

use super::pseudo::PseudoClassSet;
use super::style_map::{StyleMap, StyleMapId};
use super::value::Font;

/// Style map ids along a node's cascade chain, as `(position, id)` pairs.
///
/// Position 0 is the node itself; only positions with a map appear.
pub(crate) type CacheKey = SmallVec<[(u16, StyleMapId); 4]>;

/// What the style engine remembers about one node between passes.
///
/// Every node the CSS pass visits gets a helper, even without a style map,
/// so that descendants can record the pseudo-classes that affect them here.
/// Ancestors are referenced by position in the parent chain, never by
/// pointer; the chain is re-read from the tree on every resolution.
#[derive(Clone, Debug, Default)]
pub(crate) struct StyleHelper {
    /// The node's own style map.
    pub(crate) map: Option<Arc<StyleMap>>,
    /// Shared cache key: own map id (if any) followed by `parent_ids`.
    pub(crate) key: CacheKey,
    /// Map ids of styled ancestors when the helper was built.
    pub(crate) parent_ids: CacheKey,
    /// Pseudo-classes of this node that some selector (its own or a
    /// descendant's) depends on.
    pub(crate) triggers: PseudoClassSet,
    /// The node's effective font after its last styling.
    pub(crate) font: Font,
}

impl StyleHelper {
    pub(crate) fn new(map: Option<Arc<StyleMap>>, parent_ids: CacheKey) -> Self {
        let mut key = CacheKey::new();
        let mut triggers = PseudoClassSet::new();
        if let Some(map) = &map {
            key.push((0, map.id()));
            if let Some(own) = map.triggers().first() {
                triggers.union_with(own);
            }
        }
        key.extend(parent_ids.iter().copied());
        Self {
            map,
            key,
            parent_ids,
            triggers,
            font: Font::default(),
        }
    }

    /// Whether this helper can be kept for a node whose map and ancestor ids
    /// are `map` and `parent_ids`.
    pub(crate) fn matches(&self, map: Option<&Arc<StyleMap>>, parent_ids: &CacheKey) -> bool {
        let same_map = match (&self.map, map) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_map && self.parent_ids == *parent_ids
    }
}
