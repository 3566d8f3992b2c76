// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cascading styles.
//!
//! Stylesheets are parsed into [`Rule`]s. A [`StyleSource`] (normally a
//! [`StyleManager`]) turns the rules that can match a node into a shared,
//! immutable [`StyleMap`]. The [`StyleEngine`] runs the CSS pass: for each
//! node flagged by [`CssFlag`](crate::node::CssFlag) it resolves every
//! registered property against the node's map and its ancestors' maps and
//! writes the winners into the node's property slots.
//!
//! Precedence, weakest first: user-agent sheets, values set by application
//! code, author sheets, inline styles. `!important` lifts a declaration
//! above every non-important one; within a tier, higher selector
//! specificity and then later rules win.

mod cache;
mod engine;
mod helper;
mod lookup;
mod manager;
mod property;
mod pseudo;
mod selector;
mod shorthand;
mod style_map;
mod stylesheet;
mod value;

pub use cache::{CalculatedValue, StyleStats};
pub use engine::StyleEngine;
pub(crate) use helper::StyleHelper;
pub use manager::{StyleManager, StyleSource};
pub use property::{
    ColorConverter, Constraint, FontConverter, FontFamilyConverter, FontSizeConverter,
    FontStyleConverter, FontWeightConverter, IdentConverter, InsetsConverter, NumberConverter,
    PropertyDef, PropertyEffects, PropertyId, PropertyRegistry, PropertyValues, Slot,
    StyleConverter, StyleOrigin, VisibilityConverter,
};
pub use pseudo::{PseudoClass, PseudoClassSet};
pub use selector::{
    Combinator, Selector, SelectorSubject, SimpleSelector, Specificity, StateRequirement,
};
pub(crate) use shorthand::{compose, extract};
pub use style_map::{CascadingStyle, SheetId, StyleMap, StyleMapId};
pub use stylesheet::{Declaration, Rule, Stylesheet, parse_declarations};
pub use value::{Color, ComputedValue, Font, FontKey, FontPosture, Length, ParsedValue, Unit};
