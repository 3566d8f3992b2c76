// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collecting per-node peer updates.
//!
//! Sync follows a drain-merge pattern: each dirty channel is drained once,
//! the drained indices are folded into one [`SyncFlags`] value per node, and
//! entries for nodes that died or left the scene since they were marked are
//! dropped. The result is sorted by slot index so presenters see a stable
//! order.
//!
//! The very first sync of a scene has no peers to update, so it walks the
//! whole scene instead and reports every node with all flags set.
//!
//! [`SyncChanges`] uses raw slot indices (`u32`) rather than [`NodeId`]
//! handles, matching the index-based accessors presenters read through.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use super::id::NodeId;
use super::store::NodeStore;
use crate::dirty;

bitflags! {
    /// Which aspects of a node's render peer need updating.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SyncFlags: u8 {
        /// Transform, position, size, or bounds.
        const GEOMETRY = 1 << 0;
        /// Paint properties.
        const PROPERTIES = 1 << 1;
        /// Child list, view order, or removed children.
        const CHILDREN = 1 << 2;
        /// Own visibility.
        const VISIBILITY = 1 << 3;
        /// Clip assignment.
        const CLIP = 1 << 4;
    }
}

/// Peer work gathered by one [`NodeStore::collect_sync`] call.
#[derive(Clone, Debug, Default)]
pub struct SyncChanges {
    /// Nodes to update, by ascending slot index, with what changed.
    pub updates: Vec<(u32, SyncFlags)>,
    /// Slots whose nodes were destroyed while holding a peer.
    pub released: Vec<u32>,
    /// Whether this was a full walk of the scene.
    pub full: bool,
}

impl SyncChanges {
    /// Whether there is nothing to send to the presenter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.released.is_empty()
    }
}

const CHANNEL_FLAGS: [SyncFlags; 5] = [
    SyncFlags::GEOMETRY,
    SyncFlags::PROPERTIES,
    SyncFlags::CHILDREN,
    SyncFlags::VISIBILITY,
    SyncFlags::CLIP,
];

impl NodeStore {
    /// Drains the sync channels and returns the peer work for the scene
    /// rooted at `root`.
    ///
    /// With `full`, every node reachable from `root` (sub-scenes included)
    /// is reported with all flags and the channels are discarded. Without a
    /// root, only released peers are reported.
    pub fn collect_sync(&mut self, root: Option<NodeId>, full: bool) -> SyncChanges {
        if let Some(root) = root {
            self.validate(root);
        }
        let mut changes = SyncChanges {
            full,
            ..SyncChanges::default()
        };

        let mut merged: FxHashMap<u32, SyncFlags> = FxHashMap::default();
        for (ch, flag) in dirty::ALL.into_iter().zip(CHANNEL_FLAGS) {
            let drained: Vec<u32> = self.dirty.drain(ch).deterministic().run().collect();
            if full || root.is_none() {
                continue;
            }
            for idx in drained {
                *merged.entry(idx).or_default() |= flag;
            }
        }

        if full {
            if let Some(root) = root {
                changes.updates = self
                    .scene_pre_order(root)
                    .map(|id| (id.idx, SyncFlags::all()))
                    .collect();
            }
        } else {
            changes.updates = merged
                .into_iter()
                .filter(|&(idx, _)| self.alive[idx as usize] && self.in_scene[idx as usize])
                .collect();
            changes.updates.sort_unstable_by_key(|&(idx, _)| idx);
        }

        changes.released = core::mem::take(&mut self.pending_released);
        self.sync_pending = false;
        changes
    }

    /// Takes the removed-children record of a container, returning whether
    /// it overflowed.
    pub(crate) fn take_removed(&mut self, idx: u32) -> (Vec<u32>, bool) {
        let i = idx as usize;
        let overflow = core::mem::replace(&mut self.removed_overflow[i], false);
        (core::mem::take(&mut self.removed[i]), overflow)
    }

    /// Records that a render peer now exists for a slot.
    pub(crate) fn set_has_peer(&mut self, idx: u32) {
        self.has_peer[idx as usize] = true;
    }

    /// Whether a render peer exists for the node.
    #[must_use]
    pub fn has_peer(&self, id: NodeId) -> bool {
        self.validate(id);
        self.has_peer[id.idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::node::NodeKind;

    fn scene() -> (NodeStore, NodeId, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Container);
        let a = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        store.set_children(root, &[a, b]).unwrap();
        store.mark_scene_root(root.idx);
        (store, root, a, b)
    }

    #[test]
    fn first_sync_walks_everything() {
        let (mut store, root, a, b) = scene();
        let changes = store.collect_sync(Some(root), true);
        assert!(changes.full);
        let nodes: Vec<u32> = changes.updates.iter().map(|&(i, _)| i).collect();
        assert_eq!(nodes, vec![root.idx, a.idx, b.idx]);
        assert!(changes.updates.iter().all(|&(_, f)| f == SyncFlags::all()));

        let again = store.collect_sync(Some(root), false);
        assert!(again.is_empty(), "full sync discards pending marks");
    }

    #[test]
    fn marks_merge_per_node() {
        let (mut store, root, a, b) = scene();
        store.collect_sync(Some(root), true);

        store.set_size(a, Size::new(5.0, 5.0));
        store.set_visible(a, false);
        store.set_view_order(b, 1.0);
        let changes = store.collect_sync(Some(root), false);
        let flags: FxHashMap<u32, SyncFlags> = changes.updates.iter().copied().collect();
        assert_eq!(
            flags.get(&a.idx).copied(),
            Some(SyncFlags::GEOMETRY | SyncFlags::VISIBILITY)
        );
        assert!(flags.contains_key(&root.idx), "view order marks the parent");
        assert!(!store.sync_pending);
    }

    #[test]
    fn detached_nodes_are_skipped() {
        let (mut store, root, a, _) = scene();
        store.collect_sync(Some(root), true);

        store.set_size(a, Size::new(3.0, 3.0));
        store.remove_child(root, a).unwrap();
        let changes = store.collect_sync(Some(root), false);
        assert!(changes.updates.iter().all(|&(i, _)| i != a.idx));
        assert_eq!(store.take_removed(root.idx), (vec![a.idx], false));
    }

    #[test]
    fn destroyed_peers_are_released_once() {
        let (mut store, root, a, _) = scene();
        store.set_has_peer(a.idx);
        store.remove_child(root, a).unwrap();
        store.destroy_node(a).unwrap();
        let changes = store.collect_sync(Some(root), false);
        assert_eq!(changes.released, vec![a.idx]);
        assert!(store.collect_sync(Some(root), false).released.is_empty());
    }
}
