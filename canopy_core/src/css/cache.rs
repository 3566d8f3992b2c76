// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared resolution results.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::property::{PropertyId, StyleOrigin};
use super::pseudo::PseudoClassSet;
use super::style_map::StyleMap;
use super::value::{ComputedValue, FontKey};

/// A resolved property value with the facts needed to apply it.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculatedValue {
    /// The converted value.
    pub value: ComputedValue,
    /// Origin of the winning declaration (the strongest, for composed
    /// values).
    pub origin: StyleOrigin,
    /// Whether a font-relative unit was involved.
    pub relative: bool,
}

/// What a resolution decided for one property.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Resolved {
    Value(CalculatedValue),
    /// No declaration applies; a style-set value is cleared.
    Unset,
    /// Resolution or validation failed; the property is left alone.
    Skip,
}

/// Resolved values for every registered property, in registry order.
pub(crate) type CacheEntry = Vec<(PropertyId, Resolved)>;

/// Per-state key into a [`StyleCache`].
///
/// `states[k]` is the state of the node at chain position `k`, reduced to the
/// pseudo-classes that can affect a selector there.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct EntryKey {
    pub(crate) states: SmallVec<[PseudoClassSet; 4]>,
    pub(crate) font: FontKey,
}

/// Entries shared by every node with the same chain of style maps.
#[derive(Debug)]
pub(crate) struct StyleCache {
    /// The maps named by the cache key, for validity checks.
    pub(crate) maps: SmallVec<[Arc<StyleMap>; 4]>,
    pub(crate) entries: FxHashMap<EntryKey, CacheEntry>,
}

impl StyleCache {
    pub(crate) fn new(maps: SmallVec<[Arc<StyleMap>; 4]>) -> Self {
        Self {
            maps,
            entries: FxHashMap::default(),
        }
    }
}

/// Counters kept by the style engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleStats {
    /// Value converter invocations.
    pub converter_calls: u64,
    /// Nodes resolved from a shared cache entry.
    pub cache_hits: u64,
    /// Nodes resolved from scratch.
    pub cache_misses: u64,
    /// Helpers created.
    pub helpers_built: u64,
    /// Helpers kept across a reapply.
    pub helpers_reused: u64,
    /// Nodes whose styles were applied.
    pub nodes_styled: u64,
    /// Properties skipped after a failed resolution or validation.
    pub failures: u64,
    /// Nodes whose cached state was found stale.
    pub stale: u64,
}
