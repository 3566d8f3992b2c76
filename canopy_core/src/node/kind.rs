// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed set of node kinds.

/// What a node is, structurally.
///
/// Tree walks (CSS, layout, bounds, sync) match on this instead of asking a
/// node what it can do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A node with no children. Its bounds are its own geometry.
    Leaf,
    /// A node owning an ordered, duplicate-free list of children.
    Container,
    /// A node embedding a separately rooted subtree.
    ///
    /// The embedded root is not a child: it has no parent, is styled in its
    /// own scope, and is laid out as its own layout root. The sub-scene's
    /// bounds are its own width and height.
    SubScene,
}

impl NodeKind {
    /// Whether nodes of this kind can hold children.
    #[inline]
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Container)
    }

    /// Short lowercase name, used as the default CSS type selector.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Container => "container",
            Self::SubScene => "subscene",
        }
    }
}
