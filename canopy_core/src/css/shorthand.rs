// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Splitting shorthand values into components and back.
//!
//! Component order follows the shorthand's `sub_properties`: `padding` is
//! top, right, bottom, left; `font` is family, size, weight, style.

use smol_str::SmolStr;

use super::property::{posture_name, weight_from_number};
use super::value::{ComputedValue, FontPosture};

/// Reads component `index` out of a shorthand value.
pub(crate) fn extract(whole: &ComputedValue, index: usize) -> Option<ComputedValue> {
    match whole {
        ComputedValue::Insets(i) => {
            let side = match index {
                0 => i.y0,
                1 => i.x1,
                2 => i.y1,
                3 => i.x0,
                _ => return None,
            };
            Some(ComputedValue::Number(side))
        }
        ComputedValue::Font(f) => match index {
            0 => Some(ComputedValue::Ident(f.family.clone())),
            1 => Some(ComputedValue::Number(f.size)),
            2 => Some(ComputedValue::Number(f64::from(f.weight))),
            3 => Some(ComputedValue::Ident(SmolStr::new_static(posture_name(
                f.posture,
            )))),
            _ => None,
        },
        _ => None,
    }
}

/// Writes component `index` of a shorthand value. Returns `false` if the
/// part does not fit.
pub(crate) fn compose(whole: &mut ComputedValue, index: usize, part: &ComputedValue) -> bool {
    match (whole, part) {
        (ComputedValue::Insets(i), ComputedValue::Number(n)) => {
            match index {
                0 => i.y0 = *n,
                1 => i.x1 = *n,
                2 => i.y1 = *n,
                3 => i.x0 = *n,
                _ => return false,
            }
            true
        }
        (ComputedValue::Font(f), ComputedValue::Ident(s)) if index == 0 => {
            f.family = s.clone();
            true
        }
        (ComputedValue::Font(f), ComputedValue::Number(n)) if index == 1 => {
            f.size = *n;
            true
        }
        (ComputedValue::Font(f), ComputedValue::Number(n))
            if index == 2 && (1.0..=1000.0).contains(n) =>
        {
            f.weight = weight_from_number(*n);
            true
        }
        (ComputedValue::Font(f), ComputedValue::Ident(s)) if index == 3 => {
            f.posture = if s == "italic" {
                FontPosture::Italic
            } else {
                FontPosture::Regular
            };
            true
        }
        _ => false,
    }
}
