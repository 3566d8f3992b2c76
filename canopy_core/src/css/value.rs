// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declared and computed style values.
//!
//! A [`ParsedValue`] is what a stylesheet declares; it may be relative to a
//! font size or refer to another named value. A [`ComputedValue`] is what a
//! node's property actually holds after conversion.

use core::fmt;

use kurbo::Insets;
use smol_str::SmolStr;

/// Length units understood by the converters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Absolute pixels.
    Px,
    /// Multiples of the current font size.
    Em,
    /// Percent of the current font size.
    Percent,
}

/// A number with a unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Length {
    /// Magnitude.
    pub value: f64,
    /// Unit.
    pub unit: Unit,
}

impl Length {
    /// Creates a pixel length.
    #[must_use]
    pub const fn px(value: f64) -> Self {
        Self {
            value,
            unit: Unit::Px,
        }
    }

    /// Whether the length depends on a font size.
    #[must_use]
    pub const fn is_relative(&self) -> bool {
        !matches!(self.unit, Unit::Px)
    }

    /// Resolves to pixels against `font_size`.
    #[must_use]
    pub fn to_px(&self, font_size: f64) -> f64 {
        match self.unit {
            Unit::Px => self.value,
            Unit::Em => self.value * font_size,
            Unit::Percent => self.value / 100.0 * font_size,
        }
    }
}

/// An 8-bit RGBA color.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rrggbb`, `#rrggbbaa`, or a basic color keyword.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            let digit = |i: usize| u8::from_str_radix(hex.get(i..=i)?, 16).ok();
            let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                3 => Some(Self::rgb(
                    digit(0)? * 17,
                    digit(1)? * 17,
                    digit(2)? * 17,
                )),
                6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
                8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
                _ => None,
            };
        }
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "yellow" => Self::rgb(255, 255, 0),
            "orange" => Self::rgb(255, 165, 0),
            _ => return None,
        };
        Some(named)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// Font slant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontPosture {
    /// Upright.
    #[default]
    Regular,
    /// Slanted.
    Italic,
}

/// A resolved font description.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    /// Family name.
    pub family: SmolStr,
    /// Size in pixels.
    pub size: f64,
    /// Weight, 100 to 900.
    pub weight: u16,
    /// Slant.
    pub posture: FontPosture,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: SmolStr::new_inline("System"),
            size: 13.0,
            weight: 400,
            posture: FontPosture::Regular,
        }
    }
}

impl Font {
    /// Returns a hashable snapshot of this font.
    #[must_use]
    pub fn key(&self) -> FontKey {
        FontKey {
            family: self.family.clone(),
            size_bits: self.size.to_bits(),
            weight: self.weight,
            posture: self.posture,
        }
    }
}

/// Hashable identity of a [`Font`], used in style cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontKey {
    family: SmolStr,
    size_bits: u64,
    weight: u16,
    posture: FontPosture,
}

/// A value as written in a declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
    /// A length such as `4px`, `1.5em` or `150%`.
    Length(Length),
    /// A bare number.
    Number(f64),
    /// A color literal or keyword.
    Color(Color),
    /// Any other keyword.
    Ident(SmolStr),
    /// A quoted string.
    Str(SmolStr),
    /// Whitespace-separated values.
    List(Vec<ParsedValue>),
    /// A reference to another named value, written `var(--name)`.
    Lookup(SmolStr),
    /// The `inherit` keyword.
    Inherit,
}

impl ParsedValue {
    /// Whether resolving this value depends on a font size.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        match self {
            Self::Length(l) => l.is_relative(),
            Self::List(items) => items.iter().any(Self::is_relative),
            _ => false,
        }
    }

    /// Whether this value contains a named-value reference.
    #[must_use]
    pub fn has_lookup(&self) -> bool {
        match self {
            Self::Lookup(_) => true,
            Self::List(items) => items.iter().any(Self::has_lookup),
            _ => false,
        }
    }

    /// Reads the value as pixels, resolving font-relative units.
    #[must_use]
    pub fn as_px(&self, font_size: f64) -> Option<f64> {
        match self {
            Self::Length(l) => Some(l.to_px(font_size)),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Parses one value token (no whitespace).
    #[must_use]
    pub fn parse_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("inherit") {
            return Self::Inherit;
        }
        if let Some(inner) = token
            .strip_prefix("var(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::Lookup(SmolStr::new(inner.trim()));
        }
        if let Some(s) = token
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return Self::Str(SmolStr::new(s));
        }
        for (suffix, unit) in [("px", Unit::Px), ("em", Unit::Em), ("%", Unit::Percent)] {
            if let Some(num) = token.strip_suffix(suffix)
                && let Ok(value) = num.parse::<f64>()
            {
                return Self::Length(Length { value, unit });
            }
        }
        if let Ok(n) = token.parse::<f64>() {
            return Self::Number(n);
        }
        if let Some(c) = Color::parse(token) {
            return Self::Color(c);
        }
        Self::Ident(SmolStr::new(token))
    }

    /// Parses a whole declaration value.
    ///
    /// Several whitespace-separated tokens become a [`List`](Self::List).
    /// Quoted strings may contain spaces.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut items = Vec::new();
        let mut rest = text.trim();
        while !rest.is_empty() {
            let end = if rest.starts_with('"') {
                rest[1..].find('"').map_or(rest.len(), |i| i + 2)
            } else {
                rest.find(char::is_whitespace).unwrap_or(rest.len())
            };
            items.push(Self::parse_token(&rest[..end]));
            rest = rest[end..].trim_start();
        }
        match items.len() {
            0 => Self::Ident(SmolStr::default()),
            1 => items.remove(0),
            _ => Self::List(items),
        }
    }
}

/// A converted value held by a node property.
#[derive(Clone, Debug, PartialEq)]
pub enum ComputedValue {
    /// A plain number (lengths are resolved to pixels).
    Number(f64),
    /// A color.
    Color(Color),
    /// A keyword.
    Ident(SmolStr),
    /// A boolean flag.
    Bool(bool),
    /// Four side lengths.
    Insets(Insets),
    /// A font.
    Font(Font),
}

impl ComputedValue {
    /// Short name of the value kind, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Color(_) => "color",
            Self::Ident(_) => "keyword",
            Self::Bool(_) => "boolean",
            Self::Insets(_) => "insets",
            Self::Font(_) => "font",
        }
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the color, if this is one.
    #[must_use]
    pub const fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the insets, if this is one.
    #[must_use]
    pub const fn as_insets(&self) -> Option<Insets> {
        match self {
            Self::Insets(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the font, if this is one.
    #[must_use]
    pub const fn as_font(&self) -> Option<&Font> {
        match self {
            Self::Font(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the keyword, if this is one.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(s) => Some(s),
            _ => None,
        }
    }
}
