// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout policy trait and built-in policies.

use core::fmt;

use kurbo::Size;

use super::Axis;
use super::context::LayoutContext;

/// Positions and sizes a container's children.
///
/// All methods have defaults, so an empty `impl` autosizes children and
/// reports a preferred size summed along the horizontal axis.
///
/// Sizes returned by the size methods exclude the container's padding; the
/// driver adds it.
pub trait LayoutPolicy: fmt::Debug + Send + Sync {
    /// Lays out the children. Runs only when the container needs layout.
    ///
    /// The default resizes every managed, resizable child to its preferred
    /// size and leaves positions alone.
    fn layout_children(&self, cx: &mut LayoutContext<'_>) {
        cx.autosize_children();
    }

    /// The content size the container would like.
    fn pref_size(&self, cx: &mut LayoutContext<'_>) -> Size {
        sum_along(Axis::Horizontal, 0.0, cx)
    }

    /// The smallest content size the container accepts.
    fn min_size(&self, cx: &mut LayoutContext<'_>) -> Size {
        _ = cx;
        Size::ZERO
    }

    /// The largest content size the container accepts.
    fn max_size(&self, cx: &mut LayoutContext<'_>) -> Size {
        _ = cx;
        Size::new(f64::INFINITY, f64::INFINITY)
    }
}

/// Sums managed children's preferred sizes along `axis` with `spacing`
/// between them, taking the maximum across it.
fn sum_along(axis: Axis, spacing: f64, cx: &mut LayoutContext<'_>) -> Size {
    let children = cx.managed_children();
    let mut main = 0.0;
    let mut cross = 0.0_f64;
    for (i, child) in children.iter().enumerate() {
        let pref = cx.pref_size(*child);
        if i > 0 {
            main += spacing;
        }
        main += axis.main(pref);
        cross = cross.max(axis.cross(pref));
    }
    axis.size(main, cross)
}

/// Autosizes children without moving them.
///
/// The preferred size sums the children along `axis`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultLayout {
    /// Axis along which preferred sizes add up.
    pub axis: Axis,
}

impl DefaultLayout {
    /// Creates a policy summing along `axis`.
    #[must_use]
    pub const fn new(axis: Axis) -> Self {
        Self { axis }
    }
}

impl LayoutPolicy for DefaultLayout {
    fn pref_size(&self, cx: &mut LayoutContext<'_>) -> Size {
        sum_along(self.axis, 0.0, cx)
    }
}

/// Places children one after another along an axis.
///
/// Each managed child gets its clamped preferred size and is positioned
/// after the previous one, `spacing` apart, inside the container's padding.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StackLayout {
    /// Stacking direction.
    pub axis: Axis,
    /// Gap between consecutive children.
    pub spacing: f64,
}

impl StackLayout {
    /// Creates a stack along `axis`.
    #[must_use]
    pub const fn new(axis: Axis, spacing: f64) -> Self {
        Self { axis, spacing }
    }
}

impl LayoutPolicy for StackLayout {
    fn layout_children(&self, cx: &mut LayoutContext<'_>) {
        let padding = cx.padding();
        let (mut main, cross) = match self.axis {
            Axis::Horizontal => (padding.x0, padding.y0),
            Axis::Vertical => (padding.y0, padding.x0),
        };
        for child in cx.managed_children() {
            let size = cx.clamped_pref_size(child);
            cx.resize(child, size);
            cx.relocate(child, self.axis.point(main, cross));
            main += self.axis.main(cx.store().size(child)) + self.spacing;
        }
    }

    fn pref_size(&self, cx: &mut LayoutContext<'_>) -> Size {
        sum_along(self.axis, self.spacing, cx)
    }
}
