// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Styleable property definitions, converters, and per-node value slots.

use core::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use kurbo::Insets;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;

use super::value::{Color, ComputedValue, Font, FontPosture, ParsedValue};
use crate::error::PropertyError;

/// Where a property's current value came from.
///
/// Variants are ordered by precedence, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleOrigin {
    /// A platform default stylesheet.
    UserAgent,
    /// Set by application code at runtime.
    User,
    /// An application stylesheet.
    Author,
    /// A node's inline style.
    Inline,
}

impl StyleOrigin {
    /// Whether a value of this origin was written by style resolution (as
    /// opposed to application code).
    #[must_use]
    pub const fn is_style(self) -> bool {
        !matches!(self, Self::User)
    }
}

/// Index of a property in a [`PropertyRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub(crate) u16);

impl PropertyId {
    /// `opacity`: number in `0..=1`.
    pub const OPACITY: Self = Self(0);
    /// `visibility`: `visible` or `hidden`.
    pub const VISIBILITY: Self = Self(1);
    /// `fill`: color.
    pub const FILL: Self = Self(2);
    /// `text-fill`: inherited color.
    pub const TEXT_FILL: Self = Self(3);
    /// `cursor`: inherited keyword.
    pub const CURSOR: Self = Self(4);
    /// `pref-width`: length, negative means computed by layout.
    pub const PREF_WIDTH: Self = Self(5);
    /// `pref-height`: length, negative means computed by layout.
    pub const PREF_HEIGHT: Self = Self(6);
    /// `padding`: shorthand for the four sides.
    pub const PADDING: Self = Self(7);
    /// `padding-top`.
    pub const PADDING_TOP: Self = Self(8);
    /// `padding-right`.
    pub const PADDING_RIGHT: Self = Self(9);
    /// `padding-bottom`.
    pub const PADDING_BOTTOM: Self = Self(10);
    /// `padding-left`.
    pub const PADDING_LEFT: Self = Self(11);
    /// `font`: inherited shorthand.
    pub const FONT: Self = Self(12);
    /// `font-family`.
    pub const FONT_FAMILY: Self = Self(13);
    /// `font-size`.
    pub const FONT_SIZE: Self = Self(14);
    /// `font-weight`.
    pub const FONT_WEIGHT: Self = Self(15);
    /// `font-style`.
    pub const FONT_STYLE: Self = Self(16);

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}

bitflags! {
    /// What else must happen when a property's value changes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PropertyEffects: u8 {
        /// The node's preferred size may change: relayout it and its parent.
        const LAYOUT = 1 << 0;
        /// The render peer must receive the new value.
        const PAINT = 1 << 1;
        /// The node's visibility flag follows the value.
        const VISIBILITY = 1 << 2;
        /// Descendants resolve relative sizes against this value.
        const FONT = 1 << 3;
    }
}

/// Converts a declared value into a property value.
///
/// `font` is the font relative units resolve against. Returning `Err`
/// carries a human-readable reason.
pub trait StyleConverter: fmt::Debug + Send + Sync {
    /// Performs the conversion.
    fn convert(&self, value: &ParsedValue, font: &Font) -> Result<ComputedValue, String>;
}

/// Lengths and numbers to pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumberConverter;

impl StyleConverter for NumberConverter {
    fn convert(&self, value: &ParsedValue, font: &Font) -> Result<ComputedValue, String> {
        value
            .as_px(font.size)
            .map(ComputedValue::Number)
            .ok_or_else(|| format!("expected a number, found {value:?}"))
    }
}

/// Color literals and keywords.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColorConverter;

impl StyleConverter for ColorConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        match value {
            ParsedValue::Color(c) => Ok(ComputedValue::Color(*c)),
            _ => Err(format!("expected a color, found {value:?}")),
        }
    }
}

/// Any single keyword.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentConverter;

impl StyleConverter for IdentConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        match value {
            ParsedValue::Ident(s) | ParsedValue::Str(s) => Ok(ComputedValue::Ident(s.clone())),
            _ => Err(format!("expected a keyword, found {value:?}")),
        }
    }
}

/// `visible`/`hidden` (or `true`/`false`) to a boolean.
#[derive(Clone, Copy, Debug, Default)]
pub struct VisibilityConverter;

impl StyleConverter for VisibilityConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        match value {
            ParsedValue::Ident(s) => match s.as_str() {
                "visible" | "true" => Ok(ComputedValue::Bool(true)),
                "hidden" | "false" => Ok(ComputedValue::Bool(false)),
                other => Err(format!("unknown visibility {other}")),
            },
            _ => Err(format!("expected visible or hidden, found {value:?}")),
        }
    }
}

/// One to four lengths in top, right, bottom, left order.
#[derive(Clone, Copy, Debug, Default)]
pub struct InsetsConverter;

impl StyleConverter for InsetsConverter {
    fn convert(&self, value: &ParsedValue, font: &Font) -> Result<ComputedValue, String> {
        let items: SmallVec<[f64; 4]> = match value {
            ParsedValue::List(items) => items
                .iter()
                .map(|v| v.as_px(font.size))
                .collect::<Option<_>>()
                .ok_or_else(|| format!("expected lengths, found {value:?}"))?,
            single => {
                let v = single
                    .as_px(font.size)
                    .ok_or_else(|| format!("expected a length, found {value:?}"))?;
                SmallVec::from_slice(&[v])
            }
        };
        let (top, right, bottom, left) = match items.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(format!("expected one to four lengths, found {}", items.len())),
        };
        Ok(ComputedValue::Insets(Insets::new(left, top, right, bottom)))
    }
}

/// `font-size`: percent and `em` resolve against the parent font.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontSizeConverter;

impl StyleConverter for FontSizeConverter {
    fn convert(&self, value: &ParsedValue, font: &Font) -> Result<ComputedValue, String> {
        let size = value
            .as_px(font.size)
            .ok_or_else(|| format!("expected a font size, found {value:?}"))?;
        if size <= 0.0 {
            return Err(format!("font size must be positive, got {size}"));
        }
        Ok(ComputedValue::Number(size))
    }
}

/// `font-weight`: `normal`, `bold`, or a number.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontWeightConverter;

impl FontWeightConverter {
    fn weight(value: &ParsedValue) -> Option<u16> {
        match value {
            ParsedValue::Ident(s) => match s.as_str() {
                "normal" => Some(400),
                "bold" => Some(700),
                "lighter" => Some(300),
                "bolder" => Some(800),
                _ => None,
            },
            ParsedValue::Number(n) if (1.0..=1000.0).contains(n) => Some(weight_from_number(*n)),
            _ => None,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "callers check the value is within 1..=1000"
)]
pub(crate) fn weight_from_number(n: f64) -> u16 {
    n.round() as u16
}

impl StyleConverter for FontWeightConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        Self::weight(value)
            .map(|w| ComputedValue::Number(f64::from(w)))
            .ok_or_else(|| format!("expected a font weight, found {value:?}"))
    }
}

/// `font-style`: `normal` or `italic`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontStyleConverter;

impl FontStyleConverter {
    fn posture(value: &ParsedValue) -> Option<FontPosture> {
        match value {
            ParsedValue::Ident(s) => match s.as_str() {
                "normal" | "regular" => Some(FontPosture::Regular),
                "italic" | "oblique" => Some(FontPosture::Italic),
                _ => None,
            },
            _ => None,
        }
    }
}

impl StyleConverter for FontStyleConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        Self::posture(value)
            .map(|p| ComputedValue::Ident(SmolStr::new_static(posture_name(p))))
            .ok_or_else(|| format!("expected a font style, found {value:?}"))
    }
}

pub(crate) const fn posture_name(p: FontPosture) -> &'static str {
    match p {
        FontPosture::Regular => "normal",
        FontPosture::Italic => "italic",
    }
}

/// `font-family`: a keyword or quoted name.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontFamilyConverter;

impl StyleConverter for FontFamilyConverter {
    fn convert(&self, value: &ParsedValue, _font: &Font) -> Result<ComputedValue, String> {
        match value {
            ParsedValue::Ident(s) | ParsedValue::Str(s) => Ok(ComputedValue::Ident(s.clone())),
            ParsedValue::List(items) => {
                let mut name = String::new();
                for item in items {
                    let (ParsedValue::Ident(s) | ParsedValue::Str(s)) = item else {
                        return Err(format!("expected a family name, found {item:?}"));
                    };
                    if !name.is_empty() {
                        name.push(' ');
                    }
                    name.push_str(s);
                }
                Ok(ComputedValue::Ident(SmolStr::new(name)))
            }
            _ => Err(format!("expected a family name, found {value:?}")),
        }
    }
}

/// The `font` shorthand: `[style] [weight] size family`.
///
/// `font` is the parent font; a relative size resolves against it.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontConverter;

impl StyleConverter for FontConverter {
    fn convert(&self, value: &ParsedValue, font: &Font) -> Result<ComputedValue, String> {
        let items: &[ParsedValue] = match value {
            ParsedValue::List(items) => items,
            single => core::slice::from_ref(single),
        };
        let mut out = font.clone();
        let mut size_at = None;
        for (i, item) in items.iter().enumerate() {
            if let ParsedValue::Length(l) = item {
                out.size = l.to_px(font.size);
                size_at = Some(i);
                break;
            }
        }
        let Some(size_at) = size_at else {
            return Err(format!("font shorthand needs a size, found {value:?}"));
        };
        for item in &items[..size_at] {
            if let Some(p) = FontStyleConverter::posture(item) {
                out.posture = p;
            } else if let Some(w) = FontWeightConverter::weight(item) {
                out.weight = w;
            } else {
                return Err(format!("unexpected {item:?} before font size"));
            }
        }
        let family = &items[size_at + 1..];
        if !family.is_empty() {
            let list = ParsedValue::List(family.to_vec());
            let ComputedValue::Ident(name) = FontFamilyConverter.convert(&list, font)? else {
                return Err("bad family".into());
            };
            out.family = name;
        }
        Ok(ComputedValue::Font(out))
    }
}

/// Extra validation a property applies to every write.
pub type Constraint = fn(&ComputedValue) -> Result<(), String>;

fn unit_interval(value: &ComputedValue) -> Result<(), String> {
    match value.as_number() {
        Some(n) if (0.0..=1.0).contains(&n) => Ok(()),
        Some(n) => Err(format!("{n} is outside 0..=1")),
        None => Ok(()),
    }
}

/// The static description of one styleable property.
#[derive(Clone, Debug)]
pub struct PropertyDef {
    /// CSS name, e.g. `padding-top`.
    pub name: SmolStr,
    /// Whether an unstyled node takes the value from its ancestors.
    pub inherits: bool,
    /// Value of an unset property.
    pub initial: ComputedValue,
    /// Declared value converter.
    pub converter: Arc<dyn StyleConverter>,
    /// Components of a shorthand, in order.
    pub sub_properties: SmallVec<[PropertyId; 4]>,
    /// The shorthand this property is a component of.
    pub shorthand: Option<PropertyId>,
    /// Side effects of a value change.
    pub effects: PropertyEffects,
    /// Extra write validation.
    pub constraint: Option<Constraint>,
}

impl PropertyDef {
    /// Creates a non-inheriting property with no side effects.
    pub fn new(
        name: impl Into<SmolStr>,
        initial: ComputedValue,
        converter: Arc<dyn StyleConverter>,
    ) -> Self {
        Self {
            name: name.into(),
            inherits: false,
            initial,
            converter,
            sub_properties: SmallVec::new(),
            shorthand: None,
            effects: PropertyEffects::empty(),
            constraint: None,
        }
    }

    /// Marks the property as inherited.
    #[must_use]
    pub fn inherited(mut self) -> Self {
        self.inherits = true;
        self
    }

    /// Sets the side effects.
    #[must_use]
    pub fn with_effects(mut self, effects: PropertyEffects) -> Self {
        self.effects = effects;
        self
    }

    /// Adds a write constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Checks that `value` may be stored in this property.
    pub fn validate(&self, value: &ComputedValue) -> Result<(), PropertyError> {
        if core::mem::discriminant(value) != core::mem::discriminant(&self.initial) {
            return Err(PropertyError::TypeMismatch {
                property: self.name.clone(),
                expected: self.initial.kind_name(),
            });
        }
        if let Some(check) = self.constraint {
            check(value).map_err(|reason| PropertyError::Rejected {
                property: self.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

/// All properties known to a style engine.
#[derive(Debug)]
pub struct PropertyRegistry {
    defs: Vec<PropertyDef>,
    by_name: FxHashMap<SmolStr, PropertyId>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PropertyRegistry {
    /// Creates a registry holding the standard properties, at the indices of
    /// the [`PropertyId`] constants.
    #[must_use]
    pub fn standard() -> Self {
        let mut reg = Self {
            defs: Vec::new(),
            by_name: FxHashMap::default(),
        };
        let number: Arc<dyn StyleConverter> = Arc::new(NumberConverter);
        let color: Arc<dyn StyleConverter> = Arc::new(ColorConverter);
        let paint = PropertyEffects::PAINT;
        let layout = PropertyEffects::LAYOUT | PropertyEffects::PAINT;

        reg.insert(
            PropertyId::OPACITY,
            PropertyDef::new("opacity", ComputedValue::Number(1.0), number.clone())
                .with_effects(paint)
                .with_constraint(unit_interval),
        );
        reg.insert(
            PropertyId::VISIBILITY,
            PropertyDef::new(
                "visibility",
                ComputedValue::Bool(true),
                Arc::new(VisibilityConverter),
            )
            .with_effects(PropertyEffects::VISIBILITY),
        );
        reg.insert(
            PropertyId::FILL,
            PropertyDef::new(
                "fill",
                ComputedValue::Color(Color::TRANSPARENT),
                color.clone(),
            )
            .with_effects(paint),
        );
        reg.insert(
            PropertyId::TEXT_FILL,
            PropertyDef::new("text-fill", ComputedValue::Color(Color::BLACK), color)
                .inherited()
                .with_effects(paint),
        );
        reg.insert(
            PropertyId::CURSOR,
            PropertyDef::new(
                "cursor",
                ComputedValue::Ident(SmolStr::new_static("default")),
                Arc::new(IdentConverter),
            )
            .inherited(),
        );
        reg.insert(
            PropertyId::PREF_WIDTH,
            PropertyDef::new("pref-width", ComputedValue::Number(-1.0), number.clone())
                .with_effects(layout),
        );
        reg.insert(
            PropertyId::PREF_HEIGHT,
            PropertyDef::new("pref-height", ComputedValue::Number(-1.0), number.clone())
                .with_effects(layout),
        );
        reg.insert(
            PropertyId::PADDING,
            PropertyDef::new(
                "padding",
                ComputedValue::Insets(Insets::ZERO),
                Arc::new(InsetsConverter),
            )
            .with_effects(layout),
        );
        let sides = [
            (PropertyId::PADDING_TOP, "padding-top"),
            (PropertyId::PADDING_RIGHT, "padding-right"),
            (PropertyId::PADDING_BOTTOM, "padding-bottom"),
            (PropertyId::PADDING_LEFT, "padding-left"),
        ];
        for (id, side) in sides {
            reg.insert(
                id,
                PropertyDef::new(side, ComputedValue::Number(0.0), number.clone())
                    .with_effects(layout),
            );
            reg.link(PropertyId::PADDING, id);
        }
        reg.insert(
            PropertyId::FONT,
            PropertyDef::new(
                "font",
                ComputedValue::Font(Font::default()),
                Arc::new(FontConverter),
            )
            .inherited()
            .with_effects(PropertyEffects::FONT | layout),
        );
        let subs: [(PropertyId, &str, ComputedValue, Arc<dyn StyleConverter>); 4] = [
            (
                PropertyId::FONT_FAMILY,
                "font-family",
                ComputedValue::Ident(Font::default().family),
                Arc::new(FontFamilyConverter),
            ),
            (
                PropertyId::FONT_SIZE,
                "font-size",
                ComputedValue::Number(13.0),
                Arc::new(FontSizeConverter),
            ),
            (
                PropertyId::FONT_WEIGHT,
                "font-weight",
                ComputedValue::Number(400.0),
                Arc::new(FontWeightConverter),
            ),
            (
                PropertyId::FONT_STYLE,
                "font-style",
                ComputedValue::Ident(SmolStr::new_static("normal")),
                Arc::new(FontStyleConverter),
            ),
        ];
        for (id, name, initial, converter) in subs {
            reg.insert(
                id,
                PropertyDef::new(name, initial, converter)
                    .inherited()
                    .with_effects(PropertyEffects::FONT | layout),
            );
            reg.link(PropertyId::FONT, id);
        }
        reg
    }

    fn insert(&mut self, id: PropertyId, def: PropertyDef) {
        debug_assert_eq!(usize::from(id.0), self.defs.len(), "{} out of order", def.name);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
    }

    fn link(&mut self, whole: PropertyId, part: PropertyId) {
        self.defs[usize::from(part.0)].shorthand = Some(whole);
        self.defs[usize::from(whole.0)].sub_properties.push(part);
    }

    /// Registers a property and returns its id.
    ///
    /// Registering a name twice replaces the earlier definition in place.
    /// Fails once every id is taken.
    pub fn register(&mut self, def: PropertyDef) -> Result<PropertyId, PropertyError> {
        if let Some(&id) = self.by_name.get(&def.name) {
            self.defs[usize::from(id.0)] = def;
            return Ok(id);
        }
        let id = u16::try_from(self.defs.len())
            .map(PropertyId)
            .map_err(|_| PropertyError::RegistryFull(def.name.clone()))?;
        self.insert(id, def);
        Ok(id)
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<PropertyId> {
        self.by_name.get(name).copied()
    }

    /// Returns a property definition.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn def(&self, id: PropertyId) -> &PropertyDef {
        &self.defs[usize::from(id.0)]
    }

    /// Iterates all properties in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyDef)> {
        self.defs.iter().enumerate().map(|(i, def)| {
            (
                PropertyId(u16::try_from(i).unwrap_or(u16::MAX)),
                def,
            )
        })
    }

    /// Number of registered properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// A property's current value and where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    /// Current value.
    pub value: ComputedValue,
    /// Origin of the value.
    pub origin: StyleOrigin,
}

/// The explicitly set properties of one node.
///
/// Properties without a slot hold their registry initial value.
#[derive(Clone, Debug, Default)]
pub struct PropertyValues {
    slots: FxHashMap<PropertyId, Slot>,
}

impl PropertyValues {
    /// Returns the slot for `id`, if set.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    /// Stores a value, returning whether the value changed.
    pub fn set(&mut self, id: PropertyId, value: ComputedValue, origin: StyleOrigin) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                let changed = slot.value != value;
                slot.value = value;
                slot.origin = origin;
                changed
            }
            None => {
                self.slots.insert(id, Slot { value, origin });
                true
            }
        }
    }

    /// Clears a slot, returning the removed slot.
    pub fn reset(&mut self, id: PropertyId) -> Option<Slot> {
        self.slots.remove(&id)
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterates the set slots in property order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &Slot)> {
        let mut ids: SmallVec<[PropertyId; 16]> = self.slots.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.slots.get(&id).map(|slot| (id, slot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ids_match_constants() {
        let reg = PropertyRegistry::standard();
        assert_eq!(reg.id("opacity"), Some(PropertyId::OPACITY));
        assert_eq!(reg.id("padding-left"), Some(PropertyId::PADDING_LEFT));
        assert_eq!(reg.id("font"), Some(PropertyId::FONT));
        assert_eq!(reg.id("font-size"), Some(PropertyId::FONT_SIZE));
        assert_eq!(
            reg.def(PropertyId::FONT).sub_properties.as_slice(),
            &[
                PropertyId::FONT_FAMILY,
                PropertyId::FONT_SIZE,
                PropertyId::FONT_WEIGHT,
                PropertyId::FONT_STYLE
            ]
        );
        assert_eq!(
            reg.def(PropertyId::PADDING_TOP).shorthand,
            Some(PropertyId::PADDING)
        );
    }

    #[test]
    fn register_replaces_by_name_and_fails_when_full() {
        let mut reg = PropertyRegistry::standard();
        let number: Arc<dyn StyleConverter> = Arc::new(NumberConverter);
        let custom = reg
            .register(PropertyDef::new("gap", ComputedValue::Number(0.0), number.clone()))
            .unwrap();
        assert_eq!(usize::from(custom.index()), reg.len() - 1, "appended");
        let again = reg
            .register(
                PropertyDef::new("gap", ComputedValue::Number(4.0), number.clone()).inherited(),
            )
            .unwrap();
        assert_eq!(again, custom, "same id on replace");
        assert!(reg.def(custom).inherits, "definition replaced");

        while reg.len() <= usize::from(u16::MAX) {
            let name = format!("x-{}", reg.len());
            reg.register(PropertyDef::new(name, ComputedValue::Number(0.0), number.clone()))
                .unwrap();
        }
        assert_eq!(
            reg.register(PropertyDef::new("one-too-many", ComputedValue::Number(0.0), number)),
            Err(PropertyError::RegistryFull("one-too-many".into()))
        );
        assert_eq!(reg.len(), usize::from(u16::MAX) + 1, "nothing aliased");
    }

    #[test]
    fn origin_precedence() {
        assert!(StyleOrigin::UserAgent < StyleOrigin::User);
        assert!(StyleOrigin::User < StyleOrigin::Author);
        assert!(StyleOrigin::Author < StyleOrigin::Inline);
        assert!(!StyleOrigin::User.is_style());
    }

    #[test]
    fn opacity_constraint_rejects_out_of_range() {
        let reg = PropertyRegistry::standard();
        let def = reg.def(PropertyId::OPACITY);
        assert!(def.validate(&ComputedValue::Number(0.5)).is_ok());
        assert!(matches!(
            def.validate(&ComputedValue::Number(2.0)),
            Err(PropertyError::Rejected { .. })
        ));
        assert!(matches!(
            def.validate(&ComputedValue::Bool(true)),
            Err(PropertyError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn insets_follow_css_order() {
        let font = Font::default();
        let v = InsetsConverter
            .convert(&ParsedValue::parse("1px 2px 3px 4px"), &font)
            .unwrap();
        assert_eq!(v, ComputedValue::Insets(Insets::new(4.0, 1.0, 2.0, 3.0)));
        let v = InsetsConverter
            .convert(&ParsedValue::parse("5px"), &font)
            .unwrap();
        assert_eq!(v, ComputedValue::Insets(Insets::uniform(5.0)));
    }

    #[test]
    fn font_shorthand_resolves_relative_size_against_parent() {
        let parent = Font {
            size: 20.0,
            ..Font::default()
        };
        let v = FontConverter
            .convert(&ParsedValue::parse("italic bold 150% \"Fira Sans\""), &parent)
            .unwrap();
        let ComputedValue::Font(f) = v else {
            panic!("expected a font");
        };
        assert_eq!(f.size, 30.0);
        assert_eq!(f.weight, 700);
        assert_eq!(f.posture, FontPosture::Italic);
        assert_eq!(f.family, "Fira Sans");
    }

    #[test]
    fn slot_set_reports_change() {
        let mut values = PropertyValues::default();
        assert!(values.set(PropertyId::OPACITY, ComputedValue::Number(0.5), StyleOrigin::User));
        assert!(!values.set(PropertyId::OPACITY, ComputedValue::Number(0.5), StyleOrigin::Author));
        assert_eq!(
            values.get(PropertyId::OPACITY).map(|s| s.origin),
            Some(StyleOrigin::Author)
        );
    }
}
