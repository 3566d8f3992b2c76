// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cascade lookup along a node's parent chain.
//!
//! A [`Chain`] snapshots, for a node and each of its ancestors up to the
//! scene root, the pseudo-class state, the style map, and the effective
//! font. Position 0 is the node. A [`Resolver`] answers "which declaration
//! wins for this property, and what does it convert to" against a chain:
//!
//! - A property declared at position 0 wins outright.
//! - An inherited property, or a declaration of `inherit`, continues the
//!   search one position up.
//! - `var(--name)` is replaced by the value of `--name` found by the same
//!   search, starting at the position of the referencing declaration.
//! - Font-relative units convert against the font of the position the
//!   declaration was found at.

use std::sync::Arc;

use log::warn;
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::cache::{CacheEntry, CalculatedValue, Resolved};
use super::helper::CacheKey;
use super::property::{PropertyDef, PropertyId, PropertyRegistry, StyleOrigin};
use super::pseudo::PseudoClassSet;
use super::shorthand::{compose, extract};
use super::style_map::{CascadingStyle, StyleMap};
use super::value::{ComputedValue, Font, ParsedValue};
use crate::error::StyleError;
use crate::node::{INVALID, NodeId, NodeStore};

/// A node's cascade context, node first.
#[derive(Clone, Debug, Default)]
pub(crate) struct Chain {
    pub(crate) nodes: SmallVec<[u32; 8]>,
    pub(crate) states: SmallVec<[PseudoClassSet; 8]>,
    pub(crate) maps: SmallVec<[Option<Arc<StyleMap>>; 8]>,
    pub(crate) fonts: SmallVec<[Font; 8]>,
}

impl Chain {
    /// Reads the chain of `idx` from the store, taking maps and fonts from
    /// the helpers currently attached.
    pub(crate) fn build(store: &NodeStore, idx: u32) -> Self {
        let mut chain = Self::default();
        let mut cur = idx;
        while cur != INVALID {
            let i = cur as usize;
            let helper = store.helper[i].as_ref();
            chain.nodes.push(cur);
            chain.states.push(store.pseudo[i].clone());
            chain.maps.push(helper.and_then(|h| h.map.clone()));
            chain
                .fonts
                .push(helper.map(|h| h.font.clone()).unwrap_or_default());
            cur = store.parent[i];
        }
        chain
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Replaces the node's own map.
    pub(crate) fn set_own(&mut self, map: Option<Arc<StyleMap>>) {
        self.maps[0] = map;
    }

    /// Map ids of positions 1 and up.
    pub(crate) fn parent_ids(&self) -> CacheKey {
        self.maps
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(k, m)| {
                let k = u16::try_from(k).ok()?;
                m.as_ref().map(|m| (k, m.id()))
            })
            .collect()
    }

    /// Every map on the chain, in cache key order.
    pub(crate) fn key_maps(&self) -> SmallVec<[Arc<StyleMap>; 4]> {
        self.maps.iter().flatten().cloned().collect()
    }

    /// The parent's effective font, or the default font for a root.
    pub(crate) fn parent_font(&self) -> Font {
        self.fonts.get(1).cloned().unwrap_or_default()
    }

    /// The strongest declaration of `name` at position `p` whose state
    /// requirement holds.
    pub(crate) fn find(&self, p: usize, name: &str) -> Option<&CascadingStyle> {
        self.maps.get(p)?.as_ref()?.find(name, &self.states[p..])
    }

    /// Searches for `name` from position `start` upward.
    ///
    /// `inherit` declarations are skipped. Without `inherits`, the search
    /// ends at the first position that declares nothing.
    pub(crate) fn cascade(
        &self,
        name: &str,
        start: usize,
        inherits: bool,
    ) -> Option<(usize, &CascadingStyle)> {
        for p in start..self.len() {
            match self.find(p, name) {
                Some(s) if s.value == ParsedValue::Inherit => {}
                Some(s) => return Some((p, s)),
                None if !inherits => return None,
                None => {}
            }
        }
        None
    }
}

/// Resolves properties for the node at position 0 of a chain.
#[derive(Debug)]
pub(crate) struct Resolver<'a> {
    registry: &'a PropertyRegistry,
    chain: &'a Chain,
    own_font: Font,
    font: Option<Result<Option<CalculatedValue>, StyleError>>,
    pub(crate) converter_calls: u64,
    pub(crate) failures: u64,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(registry: &'a PropertyRegistry, chain: &'a Chain) -> Self {
        Self {
            registry,
            chain,
            own_font: chain.parent_font(),
            font: None,
            converter_calls: 0,
            failures: 0,
        }
    }

    /// The node's font, once [`resolve_own_font`](Self::resolve_own_font)
    /// has run.
    pub(crate) fn own_font(&self) -> &Font {
        &self.own_font
    }

    /// Resolves `font` and makes it the font that relative units at
    /// position 0 convert against.
    pub(crate) fn resolve_own_font(&mut self) -> Result<Option<CalculatedValue>, StyleError> {
        let font = self.resolve_font();
        self.own_font = match &font {
            Ok(Some(cv)) => cv
                .value
                .as_font()
                .cloned()
                .unwrap_or_else(|| self.chain.parent_font()),
            _ => self.chain.parent_font(),
        };
        font
    }

    /// Resolves every registered property for `node`.
    ///
    /// Failures are logged and become [`Resolved::Skip`].
    pub(crate) fn resolve_all(&mut self, node: NodeId) -> CacheEntry {
        let font = self.resolve_own_font();
        let registry = self.registry;
        let mut entry = CacheEntry::with_capacity(registry.len());
        for (id, def) in registry.iter() {
            let result = if id == PropertyId::FONT {
                font.clone()
            } else {
                self.resolve(id)
            };
            let resolved = match result {
                Ok(Some(cv)) => Resolved::Value(cv),
                Ok(None) => Resolved::Unset,
                Err(e) => {
                    warn!("{node:?}: skipping {}: {e}", def.name);
                    self.failures += 1;
                    Resolved::Skip
                }
            };
            entry.push((id, resolved));
        }
        entry
    }

    /// Resolves one property. `Ok(None)` means no declaration applies.
    pub(crate) fn resolve(&mut self, id: PropertyId) -> Result<Option<CalculatedValue>, StyleError> {
        let registry = self.registry;
        let def = registry.def(id);
        if id == PropertyId::FONT {
            return self.resolve_font();
        }
        if def.shorthand == Some(PropertyId::FONT) {
            return self.resolve_font_part(id);
        }
        if !def.sub_properties.is_empty() {
            return self.resolve_shorthand(def);
        }
        if let Some(whole) = def.shorthand {
            return self.resolve_component(id, whole);
        }
        let chain = self.chain;
        let Some((p, style)) = chain.cascade(&def.name, 0, def.inherits) else {
            return Ok(None);
        };
        let font = self.font_at(p);
        let (value, relative) = self.convert(def, p, &style.value, &font)?;
        Ok(Some(CalculatedValue {
            value,
            origin: style.origin,
            relative,
        }))
    }

    fn font_at(&self, p: usize) -> Font {
        if p == 0 {
            self.own_font.clone()
        } else {
            self.chain.fonts.get(p).cloned().unwrap_or_default()
        }
    }

    /// Substitutes references in `value` (declared at position `p`) and
    /// converts it. Returns the value and whether it was font-relative.
    fn convert(
        &mut self,
        def: &PropertyDef,
        p: usize,
        value: &ParsedValue,
        font: &Font,
    ) -> Result<(ComputedValue, bool), StyleError> {
        let mut visiting = Vec::new();
        let value = self.substitute(value, p, &mut visiting)?;
        self.converter_calls += 1;
        let converted = def
            .converter
            .convert(&value, font)
            .map_err(|reason| StyleError::Conversion {
                property: def.name.clone(),
                reason,
            })?;
        Ok((converted, value.is_relative()))
    }

    fn substitute(
        &self,
        value: &ParsedValue,
        p: usize,
        visiting: &mut Vec<SmolStr>,
    ) -> Result<ParsedValue, StyleError> {
        match value {
            ParsedValue::Lookup(name) => {
                if visiting.contains(name) {
                    let mut chain = visiting.clone();
                    chain.push(name.clone());
                    return Err(StyleError::ReferenceCycle { chain });
                }
                let chain = self.chain;
                let Some((q, found)) = chain.cascade(name, p, true) else {
                    return Err(StyleError::UnresolvedReference(name.clone()));
                };
                visiting.push(name.clone());
                let out = self.substitute(&found.value, q, visiting);
                visiting.pop();
                out
            }
            ParsedValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match self.substitute(item, p, visiting)? {
                        ParsedValue::List(inner) => out.extend(inner),
                        single => out.push(single),
                    }
                }
                Ok(ParsedValue::List(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// A shorthand such as `padding`: the shorthand declaration (or the
    /// initial value) overlaid with any component declaration that outranks
    /// it.
    fn resolve_shorthand(
        &mut self,
        def: &PropertyDef,
    ) -> Result<Option<CalculatedValue>, StyleError> {
        let chain = self.chain;
        let registry = self.registry;
        let whole = chain.cascade(&def.name, 0, def.inherits);
        let mut origin: Option<StyleOrigin> = None;
        let mut relative = false;
        let mut value = match whole {
            Some((p, style)) => {
                let font = self.font_at(p);
                let (v, rel) = self.convert(def, p, &style.value, &font)?;
                origin = Some(style.origin);
                relative = rel;
                v
            }
            None => def.initial.clone(),
        };
        for (k, &sub) in def.sub_properties.iter().enumerate() {
            let sub_def = registry.def(sub);
            let Some((q, style)) = chain.cascade(&sub_def.name, 0, sub_def.inherits) else {
                continue;
            };
            if !beats(q, style, whole) {
                continue;
            }
            let font = self.font_at(q);
            let (part, rel) = self.convert(sub_def, q, &style.value, &font)?;
            if !compose(&mut value, k, &part) {
                return Err(mismatch(sub_def, &part));
            }
            origin = origin.max(Some(style.origin));
            relative |= rel;
        }
        Ok(origin.map(|origin| CalculatedValue {
            value,
            origin,
            relative,
        }))
    }

    /// A component such as `padding-top`: its own declaration if it
    /// outranks the shorthand's, else the matching part of the shorthand.
    fn resolve_component(
        &mut self,
        id: PropertyId,
        whole_id: PropertyId,
    ) -> Result<Option<CalculatedValue>, StyleError> {
        let chain = self.chain;
        let registry = self.registry;
        let def = registry.def(id);
        let whole_def = registry.def(whole_id);
        let own = chain.cascade(&def.name, 0, def.inherits);
        let whole = chain.cascade(&whole_def.name, 0, whole_def.inherits);
        if let Some((q, style)) = own
            && beats(q, style, whole)
        {
            let font = self.font_at(q);
            let (value, relative) = self.convert(def, q, &style.value, &font)?;
            return Ok(Some(CalculatedValue {
                value,
                origin: style.origin,
                relative,
            }));
        }
        let Some((p, style)) = whole else {
            return Ok(None);
        };
        let font = self.font_at(p);
        let (value, relative) = self.convert(whole_def, p, &style.value, &font)?;
        let index = component_index(whole_def, id);
        let part = extract(&value, index).ok_or_else(|| mismatch(whole_def, &value))?;
        Ok(Some(CalculatedValue {
            value: part,
            origin: style.origin,
            relative,
        }))
    }

    fn resolve_font(&mut self) -> Result<Option<CalculatedValue>, StyleError> {
        if let Some(done) = &self.font {
            return done.clone();
        }
        let font = self.compute_font();
        self.font = Some(font.clone());
        font
    }

    /// `font` and its components, declared at position 0, convert against
    /// the parent font. Declarations further up are already part of the
    /// parent font.
    fn compute_font(&mut self) -> Result<Option<CalculatedValue>, StyleError> {
        let chain = self.chain;
        let registry = self.registry;
        let def = registry.def(PropertyId::FONT);
        let parent = chain.parent_font();
        let own = |name: &str| chain.find(0, name).filter(|s| s.value != ParsedValue::Inherit);
        let whole = own(&def.name);
        let parts: SmallVec<[Option<&CascadingStyle>; 4]> = def
            .sub_properties
            .iter()
            .map(|&sub| own(&registry.def(sub).name))
            .collect();

        if whole.is_none() && parts.iter().all(Option::is_none) {
            let names = core::iter::once(def.name.as_str())
                .chain(def.sub_properties.iter().map(|&s| registry.def(s).name.as_str()));
            let mut origin = None;
            for p in 1..chain.len() {
                for name in names.clone() {
                    if let Some(style) = chain.find(p, name) {
                        origin = origin.max(Some(style.origin));
                    }
                }
                if origin.is_some() {
                    break;
                }
            }
            return Ok(origin.map(|origin| CalculatedValue {
                value: ComputedValue::Font(parent),
                origin,
                relative: false,
            }));
        }

        let mut value = ComputedValue::Font(parent.clone());
        let mut origin = None;
        let mut relative = false;
        if let Some(style) = whole {
            let (v, rel) = self.convert(def, 0, &style.value, &parent)?;
            value = v;
            origin = Some(style.origin);
            relative = rel;
        }
        for (k, part) in parts.iter().enumerate() {
            let Some(style) = part else {
                continue;
            };
            if whole.is_some_and(|w| !style.outranks(w)) {
                continue;
            }
            let sub_def = registry.def(def.sub_properties[k]);
            let (v, rel) = self.convert(sub_def, 0, &style.value, &parent)?;
            if !compose(&mut value, k, &v) {
                return Err(mismatch(sub_def, &v));
            }
            origin = origin.max(Some(style.origin));
            relative |= rel;
        }
        Ok(origin.map(|origin| CalculatedValue {
            value,
            origin,
            relative,
        }))
    }

    /// A font component is read back from the resolved font.
    fn resolve_font_part(&mut self, id: PropertyId) -> Result<Option<CalculatedValue>, StyleError> {
        let Some(font) = self.resolve_font()? else {
            return Ok(None);
        };
        let whole_def = self.registry.def(PropertyId::FONT);
        let index = component_index(whole_def, id);
        let part = extract(&font.value, index).ok_or_else(|| mismatch(whole_def, &font.value))?;
        Ok(Some(CalculatedValue {
            value: part,
            ..font
        }))
    }
}

/// Whether a component found at `q` beats the shorthand candidate: it is
/// closer, or equally close and stronger.
fn beats(q: usize, part: &CascadingStyle, whole: Option<(usize, &CascadingStyle)>) -> bool {
    match whole {
        None => true,
        Some((p, w)) => q < p || (q == p && part.outranks(w)),
    }
}

fn component_index(whole: &PropertyDef, id: PropertyId) -> usize {
    whole
        .sub_properties
        .iter()
        .position(|&s| s == id)
        .unwrap_or(usize::MAX)
}

fn mismatch(def: &PropertyDef, value: &ComputedValue) -> StyleError {
    StyleError::Conversion {
        property: def.name.clone(),
        reason: format!("{} does not fit", value.kind_name()),
    }
}
