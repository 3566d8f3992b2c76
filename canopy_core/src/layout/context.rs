// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view of the tree a layout policy works through.

use kurbo::{Insets, Point, Size};

use crate::node::{NodeId, NodeStore};

/// Access to one container and its children during layout or a size query.
///
/// Size queries on children are memoized. Resizing a child through the
/// context does not request another layout; a resized container child is
/// laid out later in the same pass.
#[derive(Debug)]
pub struct LayoutContext<'a> {
    store: &'a mut NodeStore,
    node: u32,
}

impl<'a> LayoutContext<'a> {
    pub(crate) fn new(store: &'a mut NodeStore, node: u32) -> Self {
        Self { store, node }
    }

    /// The container being laid out.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.store.handle(self.node)
    }

    /// Read access to the whole store.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        self.store
    }

    /// The container's current size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.store.size[self.node as usize]
    }

    /// The container's resolved padding.
    #[must_use]
    pub fn padding(&self) -> Insets {
        self.store.padding_at(self.node)
    }

    /// Children the policy is responsible for, in list order.
    #[must_use]
    pub fn managed_children(&self) -> Vec<NodeId> {
        self.store.children[self.node as usize]
            .iter()
            .copied()
            .filter(|&c| self.store.managed[c as usize])
            .map(|c| self.store.handle(c))
            .collect()
    }

    /// A child's preferred size.
    pub fn pref_size(&mut self, child: NodeId) -> Size {
        self.store.validate(child);
        self.store.pref_size_at(child.idx)
    }

    /// A child's minimum size.
    pub fn min_size(&mut self, child: NodeId) -> Size {
        self.store.validate(child);
        self.store.min_size_at(child.idx)
    }

    /// A child's maximum size.
    pub fn max_size(&mut self, child: NodeId) -> Size {
        self.store.validate(child);
        self.store.max_size_at(child.idx)
    }

    /// The child's preferred size clamped to its minimum and maximum.
    pub fn clamped_pref_size(&mut self, child: NodeId) -> Size {
        let pref = self.pref_size(child);
        let min = self.min_size(child);
        let max = self.max_size(child);
        Size::new(
            pref.width.min(max.width).max(min.width),
            pref.height.min(max.height).max(min.height),
        )
    }

    /// Resizes a child, if it is resizable.
    pub fn resize(&mut self, child: NodeId, size: Size) {
        self.store.validate(child);
        if self.store.resizable[child.idx as usize] {
            self.store.resize_at(child.idx, size);
        }
    }

    /// Moves a child.
    pub fn relocate(&mut self, child: NodeId, position: Point) {
        self.store.validate(child);
        self.store.set_position_at(child.idx, position);
    }

    /// Lays out a node right away. A node whose layout is already running
    /// is left alone.
    pub fn layout(&mut self, id: NodeId) {
        self.store.validate(id);
        self.store.layout_at(id.idx);
    }

    /// Resizes every managed, resizable child to its clamped preferred size,
    /// without moving it.
    pub fn autosize_children(&mut self) {
        for child in self.managed_children() {
            if self.store.resizable[child.idx as usize] {
                let size = self.clamped_pref_size(child);
                self.store.resize_at(child.idx, size);
            }
        }
    }
}
