// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout policies and the top-down layout pass.
//!
//! Each container carries a [`LayoutFlag`](crate::node::LayoutFlag):
//!
//! - `Clean`: nothing below needs layout.
//! - `DirtyBranch`: some descendant needs layout; this container's own
//!   policy does not have to run.
//! - `NeedsLayout`: the container's [`LayoutPolicy`] must position and size
//!   its children.
//!
//! [`request_layout`](crate::node::NodeStore::request_layout) sets
//! `NeedsLayout` on a node and `DirtyBranch` on its ancestors up to the
//! nearest *layout root* (an unmanaged node or a node without a parent),
//! which is registered for the next pass. The pass visits dirty branches
//! top-down and leaves every visited container `Clean`.
//!
//! Preferred, minimum, and maximum sizes are memoized per container and
//! cleared whenever a layout request passes through it.

mod context;
mod driver;
mod policy;

use kurbo::{Point, Size};

pub use context::LayoutContext;
pub(crate) use driver::SizeCache;
pub use policy::{DefaultLayout, LayoutPolicy, StackLayout};

/// A layout direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right.
    #[default]
    Horizontal,
    /// Top to bottom.
    Vertical,
}

impl Axis {
    /// The extent of `size` along this axis.
    #[inline]
    #[must_use]
    pub const fn main(self, size: Size) -> f64 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    /// The extent of `size` across this axis.
    #[inline]
    #[must_use]
    pub const fn cross(self, size: Size) -> f64 {
        match self {
            Self::Horizontal => size.height,
            Self::Vertical => size.width,
        }
    }

    /// Builds a size from main and cross extents.
    #[inline]
    #[must_use]
    pub const fn size(self, main: f64, cross: f64) -> Size {
        match self {
            Self::Horizontal => Size::new(main, cross),
            Self::Vertical => Size::new(cross, main),
        }
    }

    /// Builds a point from main and cross coordinates.
    #[inline]
    #[must_use]
    pub const fn point(self, main: f64, cross: f64) -> Point {
        match self {
            Self::Horizontal => Point::new(main, cross),
            Self::Vertical => Point::new(cross, main),
        }
    }
}
