// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal iterators.

use super::id::{INVALID, NodeId};
use super::store::NodeStore;

/// Iterator over the children of a node, in list order.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    store: &'a NodeStore,
    iter: core::slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a NodeStore, list: &'a [u32]) -> Self {
        Self {
            store,
            iter: list.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.iter.next().map(|&idx| self.store.handle(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<NodeId> {
        self.iter.next_back().map(|&idx| self.store.handle(idx))
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Pre-order iterator over a subtree.
///
/// Children are visited in list order. Embedded sub-scene roots are visited
/// right after their host when the walk was created with
/// [`NodeStore::scene_pre_order`]; clip nodes are never visited.
#[derive(Clone, Debug)]
pub struct PreOrder<'a> {
    store: &'a NodeStore,
    stack: Vec<u32>,
    cross_sub_scenes: bool,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let idx = self.stack.pop()?;
        let i = idx as usize;
        self.stack
            .extend(self.store.children[i].iter().rev().copied());
        if self.cross_sub_scenes && self.store.sub_root[i] != INVALID {
            self.stack.push(self.store.sub_root[i]);
        }
        Some(self.store.handle(idx))
    }
}

impl NodeStore {
    /// Walks `root` and its descendants in pre-order.
    #[must_use]
    pub fn pre_order(&self, root: NodeId) -> PreOrder<'_> {
        self.validate(root);
        PreOrder {
            store: self,
            stack: vec![root.idx],
            cross_sub_scenes: false,
        }
    }

    /// Like [`pre_order`](Self::pre_order), also descending into embedded
    /// sub-scene roots.
    #[must_use]
    pub fn scene_pre_order(&self, root: NodeId) -> PreOrder<'_> {
        self.validate(root);
        PreOrder {
            store: self,
            stack: vec![root.idx],
            cross_sub_scenes: true,
        }
    }

    /// Returns the ancestors of a node, nearest first, crossing from
    /// embedded roots into their hosts.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        self.ancestors_inclusive(id.idx)
            .skip(1)
            .map(|a| self.handle(a))
            .collect()
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.validate(ancestor);
        self.validate(id);
        self.ancestors_inclusive(id.idx).any(|a| a == ancestor.idx)
    }
}
