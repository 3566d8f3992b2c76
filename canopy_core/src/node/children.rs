// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child-list mutation.
//!
//! Every change to a container's child list funnels through
//! [`NodeStore::commit_children`], which validates the proposed list against
//! the tree invariants before anything is written:
//!
//! - no stale handles,
//! - no node that is already some node's clip,
//! - no scene roots,
//! - no cycles (the container may not be a descendant of a new child),
//! - no duplicates.
//!
//! The identity set mirroring the list is rebuilt while validating and
//! restored from the untouched list on failure, so a rejected call leaves
//! the tree exactly as it was. Pure permutations skip validation.

use log::warn;

use super::id::{INVALID, NodeId};
use super::kind::NodeKind;
use super::store::NodeStore;
use crate::dirty;
use crate::error::TreeError;
use crate::node::CssFlag;

impl NodeStore {
    // -- Child list API --

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent.
    ///
    /// A child already in the list is rejected; use [`to_front`](Self::to_front)
    /// to move it to the end.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let p = self.container(parent)?;
        let c = self.check(child)?;
        if self.child_set[p as usize].contains(&c) {
            return Err(TreeError::Duplicate { parent, child });
        }
        let mut list = self.children[p as usize].clone();
        list.push(c);
        self.commit_children(p, list, false)
    }

    /// Inserts `child` at `index` in `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        let p = self.container(parent)?;
        let c = self.check(child)?;
        let mut list = self.children[p as usize].clone();
        if index > list.len() {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: list.len(),
            });
        }
        list.insert(index, c);
        self.commit_children(p, list, false)
    }

    /// Removes `child` from `parent`'s children.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let p = self.container(parent)?;
        let c = self.check(child)?;
        if !self.child_set[p as usize].contains(&c) {
            return Err(TreeError::NotAChild { parent, child });
        }
        let mut list = self.children[p as usize].clone();
        list.retain(|&x| x != c);
        self.commit_children(p, list, false)
    }

    /// Removes and returns the child at `index`.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let p = self.container(parent)?;
        let mut list = self.children[p as usize].clone();
        if index >= list.len() {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: list.len(),
            });
        }
        let c = list.remove(index);
        let removed = self.handle(c);
        self.commit_children(p, list, false)?;
        Ok(removed)
    }

    /// Replaces the whole child list.
    pub fn set_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), TreeError> {
        let p = self.container(parent)?;
        let list = children
            .iter()
            .map(|&c| self.check(c))
            .collect::<Result<Vec<_>, _>>()?;
        self.commit_children(p, list, false)
    }

    /// Removes every child.
    pub fn clear_children(&mut self, parent: NodeId) -> Result<(), TreeError> {
        let p = self.container(parent)?;
        self.commit_children(p, Vec::new(), false)
    }

    /// Moves a node to the end of its parent's child list.
    pub fn to_front(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.permute(id, true)
    }

    /// Moves a node to the start of its parent's child list.
    pub fn to_back(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.permute(id, false)
    }

    fn permute(&mut self, id: NodeId, front: bool) -> Result<(), TreeError> {
        let c = self.check(id)?;
        let p = self.parent[c as usize];
        if p == INVALID {
            return Ok(());
        }
        let mut list = self.children[p as usize].clone();
        list.retain(|&x| x != c);
        if front {
            list.push(c);
        } else {
            list.insert(0, c);
        }
        if list == self.children[p as usize] {
            return Ok(());
        }
        self.commit_children(p, list, true)
    }

    // -- Clip and sub-scene links --

    /// Sets or clears the node whose bounds clip `id`.
    ///
    /// The clip node must be detached: it cannot be a child, a scene root,
    /// another node's clip, or `id` itself or one of its ancestors.
    pub fn set_clip(&mut self, id: NodeId, clip: Option<NodeId>) -> Result<(), TreeError> {
        let n = self.check(id)?;
        let new = match clip {
            Some(c) => {
                let ci = self.check(c)?;
                let owner = self.clip_owner[ci as usize];
                if owner != INVALID && owner != n {
                    return Err(TreeError::ClipConflict {
                        child: c,
                        owner: self.handle(owner),
                    });
                }
                if self.parent[ci as usize] != INVALID {
                    return Err(TreeError::ClipConflict { child: c, owner: id });
                }
                if self.scene_root[ci as usize] || self.host[ci as usize] != INVALID {
                    return Err(TreeError::SceneRoot(c));
                }
                if self.ancestors_inclusive(n).any(|a| a == ci) {
                    return Err(TreeError::Cycle {
                        parent: id,
                        child: c,
                    });
                }
                ci
            }
            None => INVALID,
        };
        let old = self.clip[n as usize];
        if old == new {
            return Ok(());
        }
        if old != INVALID {
            self.clip_owner[old as usize] = INVALID;
            self.set_subtree_in_scene(old, false);
        }
        self.clip[n as usize] = new;
        if new != INVALID {
            self.clip_owner[new as usize] = n;
            let in_scene = self.in_scene[n as usize];
            self.set_subtree_in_scene(new, in_scene);
        }
        self.mark_sync(n, dirty::CLIP);
        self.mark_bounds_changed(n);
        Ok(())
    }

    /// Embeds `root` in the sub-scene node `sub_scene`, replacing any
    /// previous embedded root.
    pub fn set_sub_scene_root(
        &mut self,
        sub_scene: NodeId,
        root: Option<NodeId>,
    ) -> Result<(), TreeError> {
        let s = self.check(sub_scene)?;
        if self.kind[s as usize] != NodeKind::SubScene {
            return Err(TreeError::NotAContainer(sub_scene));
        }
        let new = match root {
            Some(r) => {
                let ri = self.check(r)?;
                if self.parent[ri as usize] != INVALID || self.clip_owner[ri as usize] != INVALID {
                    return Err(TreeError::StillLinked(r));
                }
                if self.host[ri as usize] != s
                    && (self.scene_root[ri as usize] || self.host[ri as usize] != INVALID)
                {
                    return Err(TreeError::SceneRoot(r));
                }
                if self.ancestors_inclusive(s).any(|a| a == ri) {
                    return Err(TreeError::Cycle {
                        parent: sub_scene,
                        child: r,
                    });
                }
                ri
            }
            None => INVALID,
        };
        let old = self.sub_root[s as usize];
        if old == new {
            return Ok(());
        }
        if old != INVALID {
            self.host[old as usize] = INVALID;
            self.scene_root[old as usize] = false;
            self.set_subtree_in_scene(old, false);
        }
        self.sub_root[s as usize] = new;
        if new != INVALID {
            self.host[new as usize] = s;
            self.scene_root[new as usize] = true;
            let in_scene = self.in_scene[s as usize];
            self.set_subtree_in_scene(new, in_scene);
            self.bounds_changed[new as usize] = false;
            self.mark_bounds_changed(new);
            self.mark_css(new, CssFlag::Reapply);
            if self.resizable[new as usize] {
                let size = self.size[s as usize];
                self.resize_at(new, size);
            }
            self.request_layout_at(new);
        }
        self.mark_sync(s, dirty::CHILDREN);
        Ok(())
    }

    /// Makes a parentless node the root of a scene.
    pub(crate) fn mark_scene_root(&mut self, idx: u32) {
        self.scene_root[idx as usize] = true;
        self.set_subtree_in_scene(idx, true);
        self.mark_css(idx, CssFlag::Reapply);
        self.request_layout_at(idx);
        self.bounds_changed[idx as usize] = false;
        self.mark_bounds_changed(idx);
    }

    /// Detaches a scene root from its scene.
    pub(crate) fn unmark_scene_root(&mut self, idx: u32) {
        self.scene_root[idx as usize] = false;
        self.set_subtree_in_scene(idx, false);
    }

    // -- Commit --

    /// Validates and installs a new child list for container `p`.
    ///
    /// With `permutation` set, the caller guarantees `new_list` has the same
    /// members as the current list.
    pub(crate) fn commit_children(
        &mut self,
        p: u32,
        new_list: Vec<u32>,
        permutation: bool,
    ) -> Result<(), TreeError> {
        let pi = p as usize;
        if permutation {
            debug_assert_eq!(
                new_list.len(),
                self.children[pi].len(),
                "permutation changed the child count"
            );
            self.children[pi] = new_list;
            self.mark_sync(p, dirty::CHILDREN);
            self.request_layout_at(p);
            return Ok(());
        }

        let mut set = core::mem::take(&mut self.child_set[pi]);
        set.clear();
        for &c in &new_list {
            if let Err(e) = self.check_new_child(p, c) {
                set.clear();
                set.extend(self.children[pi].iter().copied());
                self.child_set[pi] = set;
                return Err(e);
            }
            if !set.insert(c) {
                set.clear();
                set.extend(self.children[pi].iter().copied());
                self.child_set[pi] = set;
                return Err(TreeError::Duplicate {
                    parent: self.handle(p),
                    child: self.handle(c),
                });
            }
        }
        self.child_set[pi] = set;

        let old = core::mem::replace(&mut self.children[pi], new_list);
        for &c in &old {
            if !self.child_set[pi].contains(&c) {
                self.child_removed(p, c);
            }
        }
        let added: Vec<u32> = self.children[pi]
            .iter()
            .copied()
            .filter(|&c| self.parent[c as usize] != p)
            .collect();
        for &c in &added {
            self.child_added(p, c);
        }
        // Flags are cleared for every newcomer before any is counted.
        for &c in &added {
            self.mark_bounds_changed(c);
        }

        self.mark_sync(p, dirty::CHILDREN);
        self.request_layout_at(p);
        self.request_parent_layout_at(p);
        Ok(())
    }

    fn check_new_child(&self, p: u32, c: u32) -> Result<(), TreeError> {
        let ci = c as usize;
        if !self.alive[ci] {
            return Err(TreeError::StaleNode(self.handle(c)));
        }
        let owner = self.clip_owner[ci];
        if owner != INVALID {
            return Err(TreeError::ClipConflict {
                child: self.handle(c),
                owner: self.handle(owner),
            });
        }
        if self.scene_root[ci] || self.host[ci] != INVALID {
            return Err(TreeError::SceneRoot(self.handle(c)));
        }
        if self.ancestors_inclusive(p).any(|a| a == c) {
            return Err(TreeError::Cycle {
                parent: self.handle(p),
                child: self.handle(c),
            });
        }
        Ok(())
    }

    /// Bookkeeping for a child that left `p`'s list.
    fn child_removed(&mut self, p: u32, c: u32) {
        let (pi, ci) = (p as usize, c as usize);
        self.parent[ci] = INVALID;
        if self.in_scene[ci] {
            self.set_subtree_in_scene(c, false);
        }

        if self.removed[pi].len() < self.config.removed_children_threshold {
            self.removed[pi].push(c);
        } else {
            self.removed_overflow[pi] = true;
        }

        let cache = &mut self.bounds[pi];
        if self.bounds_changed[ci] {
            cache.changed_count = cache.changed_count.saturating_sub(1);
            if let Some(list) = &mut cache.changed {
                list.retain(|&x| x != c);
            }
            self.bounds_changed[ci] = false;
        }
        if cache.is_edge(c) {
            cache.valid = false;
            cache.vacate(c);
            self.mark_bounds_changed(p);
        }
    }

    /// Bookkeeping for a child that joined `p`'s list.
    fn child_added(&mut self, p: u32, c: u32) {
        let ci = c as usize;
        let q = self.parent[ci];
        if q != INVALID {
            if self.config.warn_on_reparent {
                warn!(
                    "{:?} moved from {:?} to {:?} without being removed first",
                    self.handle(c),
                    self.handle(q),
                    self.handle(p)
                );
            }
            self.detach(q, c);
        }

        self.parent[ci] = p;
        let in_scene = self.in_scene[p as usize];
        self.set_subtree_in_scene(c, in_scene);

        self.bounds_changed[ci] = false;
        self.mark_css(c, CssFlag::Reapply);
        if self.kind[ci] != NodeKind::Leaf {
            self.layout_flag[ci] = crate::node::LayoutFlag::NeedsLayout;
        }
    }

    /// Silently removes `c` from a previous parent `q`.
    fn detach(&mut self, q: u32, c: u32) {
        let qi = q as usize;
        self.children[qi].retain(|&x| x != c);
        self.child_set[qi].remove(&c);
        self.child_removed(q, c);
        self.mark_sync(q, dirty::CHILDREN);
        self.request_layout_at(q);
        self.request_parent_layout_at(q);
    }

    /// Sets the scene membership of a subtree (children, clips, and embedded
    /// roots). Nodes entering a scene are marked on every sync channel.
    pub(crate) fn set_subtree_in_scene(&mut self, root: u32, in_scene: bool) {
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let i = idx as usize;
            self.in_scene[i] = in_scene;
            if in_scene {
                for ch in dirty::ALL {
                    self.mark_sync(idx, ch);
                }
            }
            stack.extend(self.children[i].iter().copied());
            if self.clip[i] != INVALID {
                stack.push(self.clip[i]);
            }
            if self.sub_root[i] != INVALID {
                stack.push(self.sub_root[i]);
            }
        }
    }

    /// Returns the slot index of a live container.
    fn container(&self, id: NodeId) -> Result<u32, TreeError> {
        let idx = self.check(id)?;
        if self.kind[idx as usize].is_container() {
            Ok(idx)
        } else {
            Err(TreeError::NotAContainer(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks the structural invariants of every live container.
    fn assert_consistent(store: &NodeStore) {
        for idx in 0..store.len {
            if !store.alive[idx as usize] {
                continue;
            }
            let kids = &store.children[idx as usize];
            let set = &store.child_set[idx as usize];
            assert_eq!(kids.len(), set.len(), "duplicate in child list of {idx}");
            for &c in kids {
                assert!(set.contains(&c), "identity set out of sync for {idx}");
                assert_eq!(store.parent[c as usize], idx, "bad back-reference for {c}");
            }
        }
    }

    fn tree() -> (NodeStore, NodeId, NodeId, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Container);
        let mid = store.create_node(NodeKind::Container);
        let leaf = store.create_node(NodeKind::Leaf);
        let other = store.create_node(NodeKind::Leaf);
        store.add_child(root, mid).unwrap();
        store.add_child(mid, leaf).unwrap();
        (store, root, mid, leaf, other)
    }

    #[test]
    fn add_insert_remove() {
        let (mut store, root, mid, leaf, other) = tree();
        store.insert_child(root, 0, other).unwrap();
        assert_eq!(store.children(root).collect::<Vec<_>>(), vec![other, mid]);
        assert_eq!(store.parent(leaf), Some(mid));

        store.remove_child(root, other).unwrap();
        assert_eq!(store.parent(other), None);
        assert_eq!(
            store.remove_child(root, other),
            Err(TreeError::NotAChild {
                parent: root,
                child: other
            })
        );
        assert_eq!(store.remove_child_at(root, 0), Ok(mid));
        assert_eq!(store.child_count(root), 0);
        assert!(matches!(
            store.insert_child(root, 3, other),
            Err(TreeError::IndexOutOfBounds { index: 3, len: 0 })
        ));
        assert_consistent(&store);
    }

    #[test]
    fn leaf_is_not_a_container() {
        let (mut store, _, _, leaf, other) = tree();
        assert_eq!(store.add_child(leaf, other), Err(TreeError::NotAContainer(leaf)));
    }

    #[test]
    fn cycle_is_rejected_and_tree_unchanged() {
        let (mut store, root, mid, leaf, other) = tree();
        store.add_child(mid, other).unwrap();
        let before: Vec<_> = store.children(mid).collect();

        assert_eq!(
            store.add_child(mid, root),
            Err(TreeError::Cycle {
                parent: mid,
                child: root
            })
        );
        assert_eq!(
            store.add_child(mid, mid),
            Err(TreeError::Cycle {
                parent: mid,
                child: mid
            })
        );
        // A cycle anywhere in a batch rejects the whole batch.
        assert!(store.set_children(mid, &[other, leaf, root]).is_err());

        assert_eq!(store.children(mid).collect::<Vec<_>>(), before);
        assert_eq!(store.parent(root), None);
        assert_consistent(&store);
    }

    #[test]
    fn duplicates_are_rejected_atomically() {
        let (mut store, root, mid, _, other) = tree();
        assert_eq!(
            store.set_children(root, &[mid, other, mid]),
            Err(TreeError::Duplicate {
                parent: root,
                child: mid
            })
        );
        assert_eq!(store.children(root).collect::<Vec<_>>(), vec![mid]);
        assert_eq!(store.parent(other), None);
        assert_consistent(&store);
    }

    #[test]
    fn re_adding_a_child_is_rejected() {
        let mut store = NodeStore::new();
        let p = store.create_node(NodeKind::Container);
        let a = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        store.set_children(p, &[a, b]).unwrap();
        assert_eq!(
            store.add_child(p, a),
            Err(TreeError::Duplicate {
                parent: p,
                child: a
            })
        );
        assert_eq!(
            store.children(p).collect::<Vec<_>>(),
            vec![a, b],
            "order unchanged"
        );
        assert!(store.removed_children(p).0.is_empty(), "nothing removed");
        assert_consistent(&store);
    }

    #[test]
    fn stale_child_is_rejected() {
        let (mut store, root, _, _, other) = tree();
        store.destroy_node(other).unwrap();
        assert_eq!(store.add_child(root, other), Err(TreeError::StaleNode(other)));
    }

    #[test]
    fn clip_and_child_are_exclusive() {
        let (mut store, root, mid, leaf, other) = tree();
        store.set_clip(mid, Some(other)).unwrap();
        assert_eq!(store.clip(mid), Some(other));
        assert_eq!(
            store.add_child(root, other),
            Err(TreeError::ClipConflict {
                child: other,
                owner: mid
            })
        );
        assert!(matches!(
            store.set_clip(root, Some(leaf)),
            Err(TreeError::ClipConflict { .. })
        ));
        assert!(matches!(
            store.set_clip(leaf, Some(root)),
            Err(TreeError::ClipConflict { .. }) | Err(TreeError::Cycle { .. })
        ));
        store.set_clip(mid, None).unwrap();
        store.add_child(root, other).unwrap();
        assert_consistent(&store);
    }

    #[test]
    fn scene_root_cannot_be_a_child() {
        let (mut store, root, mid, _, _) = tree();
        store.mark_scene_root(root.idx);
        assert_eq!(store.add_child(mid, root), Err(TreeError::SceneRoot(root)));
    }

    #[test]
    fn adding_detaches_from_previous_parent() {
        let (mut store, root, mid, leaf, _) = tree();
        store.add_child(root, leaf).unwrap();
        assert_eq!(store.parent(leaf), Some(root));
        assert_eq!(store.child_count(mid), 0);
        assert_eq!(store.removed_children(mid).0, &[leaf.idx]);
        assert_consistent(&store);
    }

    #[test]
    fn removed_list_overflows_past_threshold() {
        let mut store = NodeStore::new();
        let p = store.create_node(NodeKind::Container);
        let kids: Vec<_> = (0..25).map(|_| store.create_node(NodeKind::Leaf)).collect();
        store.set_children(p, &kids).unwrap();
        store.clear_children(p).unwrap();
        let (removed, overflow) = store.removed_children(p);
        assert_eq!(removed.len(), 20);
        assert!(overflow, "threshold exceeded");
    }

    #[test]
    fn permutations_reorder_only() {
        let mut store = NodeStore::new();
        let p = store.create_node(NodeKind::Container);
        let a = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        let c = store.create_node(NodeKind::Leaf);
        store.set_children(p, &[a, b, c]).unwrap();
        store.to_front(a).unwrap();
        assert_eq!(store.children(p).collect::<Vec<_>>(), vec![b, c, a]);
        store.to_back(c).unwrap();
        assert_eq!(store.children(p).collect::<Vec<_>>(), vec![c, b, a]);
        assert!(store.removed_children(p).0.is_empty());
        assert_consistent(&store);
    }

    #[test]
    fn random_mutations_keep_invariants() {
        let mut store = NodeStore::new();
        let containers: Vec<_> = (0..4).map(|_| store.create_node(NodeKind::Container)).collect();
        let leaves: Vec<_> = (0..12).map(|_| store.create_node(NodeKind::Leaf)).collect();
        let mut seed = 0x2545_f491_u64;
        let mut next = |n: usize| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (seed >> 33) as usize % n
        };
        for _ in 0..500 {
            let p = containers[next(containers.len())];
            let all: Vec<_> = containers.iter().chain(&leaves).copied().collect();
            let c = all[next(all.len())];
            match next(3) {
                0 => {
                    let already = store.parent(c) == Some(p);
                    let result = store.add_child(p, c);
                    if already {
                        assert_eq!(
                            result,
                            Err(TreeError::Duplicate {
                                parent: p,
                                child: c
                            }),
                            "re-adding must fail"
                        );
                    }
                }
                1 => {
                    let len = store.child_count(p);
                    let _ = store.insert_child(p, next(len + 1), c);
                }
                _ => {
                    let _ = store.remove_child(p, c);
                }
            }
            assert_consistent(&store);
        }
    }
}
