// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned bounding volumes and the per-container bounds cache entry.
//!
//! The algorithms that maintain [`BoundsCache`] live on
//! [`NodeStore`](crate::node::NodeStore) (see `node::geometry`); this module
//! only holds the value types so that both the store and backends can use
//! them.

use kurbo::Rect;

use crate::node::INVALID;
use crate::transform::Transform3d;

/// An axis-aligned box in three dimensions.
///
/// The empty box has every `min` component greater than the matching `max`
/// component, so that a union with it is the identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds3d {
    /// Minimum corner `(x, y, z)`.
    pub min: [f64; 3],
    /// Maximum corner `(x, y, z)`.
    pub max: [f64; 3],
}

impl Default for Bounds3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds3d {
    /// The empty box.
    pub const EMPTY: Self = Self {
        min: [f64::INFINITY; 3],
        max: [f64::NEG_INFINITY; 3],
    };

    /// Creates a box from two corners.
    #[must_use]
    pub const fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Creates a flat box at `z = 0` from an origin and size.
    #[must_use]
    pub const fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min: [x, y, 0.0],
            max: [x + width, y + height, 0.0],
        }
    }

    /// Whether this box contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1] || self.min[2] > self.max[2]
    }

    /// Returns the smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    /// Returns the overlap of `self` and `other`, or [`EMPTY`](Self::EMPTY).
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let out = Self {
            min: [
                self.min[0].max(other.min[0]),
                self.min[1].max(other.min[1]),
                self.min[2].max(other.min[2]),
            ],
            max: [
                self.max[0].min(other.max[0]),
                self.max[1].min(other.max[1]),
                self.max[2].min(other.max[2]),
            ],
        };
        if out.is_empty() { Self::EMPTY } else { out }
    }

    /// Offsets the box by `(dx, dy, dz)`. The empty box stays empty.
    #[must_use]
    pub fn translate(self, d: [f64; 3]) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            min: [self.min[0] + d[0], self.min[1] + d[1], self.min[2] + d[2]],
            max: [self.max[0] + d[0], self.max[1] + d[1], self.max[2] + d[2]],
        }
    }

    /// Maps all eight corners through `tx` and returns their bounding box.
    #[must_use]
    pub fn transform(self, tx: &Transform3d) -> Self {
        if self.is_empty() {
            return self;
        }
        if tx.is_translation() {
            return self.translate(tx.translation());
        }
        let mut out = Self::EMPTY;
        for corner in 0..8_u8 {
            let p = [
                if corner & 1 == 0 { self.min[0] } else { self.max[0] },
                if corner & 2 == 0 { self.min[1] } else { self.max[1] },
                if corner & 4 == 0 { self.min[2] } else { self.max[2] },
            ];
            let q = tx.transform_point(p);
            out = out.union(Self { min: q, max: q });
        }
        out
    }

    /// Whether every component of `self` is within `eps` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() == other.is_empty();
        }
        (0..3).all(|a| {
            (self.min[a] - other.min[a]).abs() <= eps && (self.max[a] - other.max[a]).abs() <= eps
        })
    }

    /// Projects the box onto the XY plane.
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        Rect::new(self.min[0], self.min[1], self.max[0], self.max[1])
    }
}

/// Index of each edge slot in [`BoundsCache::edges`].
pub(crate) const MIN_X: usize = 0;
pub(crate) const MAX_X: usize = 3;

/// Cached union of a container's visible children, in the container's local
/// coordinates.
///
/// `edges[a]` for `a < 3` holds the child currently defining `min[a]`, and
/// `edges[3 + a]` the child defining `max[a]`. An [`INVALID`] edge is vacant.
#[derive(Clone, Debug)]
pub(crate) struct BoundsCache {
    pub(crate) bounds: Bounds3d,
    pub(crate) edges: [u32; 6],
    /// Cleared by structural changes that remove an edge owner.
    pub(crate) valid: bool,
    /// Number of children whose `bounds_changed` flag is set.
    pub(crate) changed_count: u32,
    /// Explicit list of flagged children, kept only for large child lists.
    pub(crate) changed: Option<Vec<u32>>,
}

impl Default for BoundsCache {
    fn default() -> Self {
        Self {
            bounds: Bounds3d::EMPTY,
            edges: [INVALID; 6],
            valid: false,
            changed_count: 0,
            changed: None,
        }
    }
}

impl BoundsCache {
    /// Whether `idx` currently owns any edge.
    pub(crate) fn is_edge(&self, idx: u32) -> bool {
        self.edges.contains(&idx)
    }

    /// Vacates every edge owned by `idx`.
    pub(crate) fn vacate(&mut self, idx: u32) {
        for e in &mut self.edges {
            if *e == idx {
                *e = INVALID;
            }
        }
    }

    /// Extends the cached box with `b`, taking over edges it reaches.
    ///
    /// Ties go to `idx`, so an unchanged edge owner reclaims its edge.
    pub(crate) fn extend(&mut self, idx: u32, b: &Bounds3d) {
        for a in 0..3 {
            if b.min[a] <= self.bounds.min[a] {
                self.bounds.min[a] = b.min[a];
                self.edges[MIN_X + a] = idx;
            }
            if b.max[a] >= self.bounds.max[a] {
                self.bounds.max[a] = b.max[a];
                self.edges[MAX_X + a] = idx;
            }
        }
    }

    /// Whether any edge is vacant.
    pub(crate) fn has_vacancy(&self) -> bool {
        self.edges.contains(&INVALID)
    }
}

/// Counters describing how cached container bounds were refreshed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundsStats {
    /// Refreshes that only visited changed children.
    pub incremental: u64,
    /// Refreshes that fell back to scanning every child.
    pub full: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_with_empty_is_identity() {
        let b = Bounds3d::from_origin_size(1.0, 2.0, 3.0, 4.0);
        assert_eq!(b.union(Bounds3d::EMPTY), b);
        assert_eq!(Bounds3d::EMPTY.union(b), b);
        assert!(Bounds3d::EMPTY.is_empty());
    }

    #[test]
    fn translate_keeps_empty() {
        assert!(Bounds3d::EMPTY.translate([5.0, 5.0, 0.0]).is_empty());
        let b = Bounds3d::from_origin_size(0.0, 0.0, 1.0, 1.0).translate([2.0, 3.0, 0.0]);
        assert_eq!(b, Bounds3d::from_origin_size(2.0, 3.0, 1.0, 1.0));
    }

    #[test]
    fn rotated_box_grows() {
        let b = Bounds3d::from_origin_size(0.0, 0.0, 10.0, 10.0);
        let r = b.transform(&Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_4));
        assert!(r.max[1] > 14.0, "rotated diagonal should reach ~14.14");
        assert!(r.min[0] < -7.0, "rotated box should extend left of origin");
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Bounds3d::from_origin_size(0.0, 0.0, 1.0, 1.0);
        let b = Bounds3d::from_origin_size(5.0, 5.0, 1.0, 1.0);
        assert!(a.intersect(b).is_empty());
        let c = Bounds3d::from_origin_size(0.5, 0.5, 1.0, 1.0);
        assert_eq!(a.intersect(c), Bounds3d::new([0.5, 0.5, 0.0], [1.0, 1.0, 0.0]));
    }

    #[test]
    fn extend_claims_ties() {
        let mut cache = BoundsCache {
            bounds: Bounds3d::from_origin_size(0.0, 0.0, 10.0, 10.0),
            edges: [1; 6],
            valid: true,
            ..BoundsCache::default()
        };
        cache.vacate(1);
        assert!(cache.has_vacancy());
        cache.extend(1, &Bounds3d::from_origin_size(0.0, 0.0, 10.0, 10.0));
        assert!(!cache.has_vacancy(), "same box reclaims all edges");
        assert!(cache.is_edge(1));
    }

    #[test]
    fn rect_projection() {
        let b = Bounds3d::new([1.0, 2.0, -3.0], [4.0, 6.0, 3.0]);
        assert_eq!(b.to_rect(), Rect::new(1.0, 2.0, 4.0, 6.0));
        assert_eq!(Bounds3d::EMPTY.to_rect(), Rect::ZERO);
    }
}
