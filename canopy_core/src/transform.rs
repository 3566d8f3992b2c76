// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 node transform.
//!
//! Nodes position their children with a local-to-parent transform. The bounds
//! cache only needs to know whether a transform is a pure translation (cached
//! bounds can then be offset) or something more general (every child must be
//! transformed and unioned again), so this type keeps to that subset:
//! construction, composition, point mapping, and classification.

use core::ops::Mul;

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the translation component `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn translation(self) -> [f64; 3] {
        [self.cols[3][0], self.cols[3][1], self.cols[3][2]]
    }

    /// Whether this transform is the identity or a pure translation.
    ///
    /// Cached child bounds stay valid under such transforms; they only need
    /// to be offset.
    #[must_use]
    pub fn is_translation(&self) -> bool {
        let c = &self.cols;
        c[0] == [1.0, 0.0, 0.0, 0.0]
            && c[1] == [0.0, 1.0, 0.0, 0.0]
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][3] == 1.0
    }

    /// Maps a point through this transform, including the perspective divide.
    #[must_use]
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let c = &self.cols;
        let x = c[0][0] * p[0] + c[1][0] * p[1] + c[2][0] * p[2] + c[3][0];
        let y = c[0][1] * p[0] + c[1][1] * p[1] + c[2][1] * p[2] + c[3][1];
        let z = c[0][2] * p[0] + c[1][2] * p[1] + c[2][2] * p[2] + c[3][2];
        let w = c[0][3] * p[0] + c[1][3] * p[1] + c[2][3] * p[2] + c[3][3];
        if w == 1.0 || w == 0.0 {
            [x, y, z]
        } else {
            [x / w, y / w, z / w]
        }
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, cell) in col.iter_mut().enumerate() {
                *cell =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
        assert!(Transform3d::IDENTITY.is_translation());
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        let c = a * b;
        assert!(c.is_translation(), "translations compose to a translation");
        assert_eq!(c.translation(), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn scale_is_not_translation() {
        assert!(!Transform3d::from_scale(2.0, 1.0, 1.0).is_translation());
        assert!(!Transform3d::from_rotation_z(0.3).is_translation());
    }

    #[test]
    fn scale_then_translate_maps_points() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(combined.transform_point([1.0, 1.0, 0.0]), [5.0, 6.0, 0.0]);
    }

    #[test]
    fn rotation_z_ninety_degrees() {
        let r = Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2);
        let p = r.transform_point([1.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-12, "x should be ~0, got {}", p[0]);
        assert!((p[1] - 1.0).abs() < 1e-12, "y should be ~1, got {}", p[1]);
    }

    #[test]
    fn finite_detection() {
        assert!(Transform3d::IDENTITY.is_finite());
        assert!(!Transform3d::from_translation(f64::NAN, 0.0, 0.0).is_finite());
    }
}
