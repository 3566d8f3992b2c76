// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds maintenance.
//!
//! Every container caches the union of its visible children's bounds, in its
//! own coordinates, together with the six children that currently define the
//! box's faces (its *edges*). A child whose bounds may have changed is
//! flagged and counted on its parent, and the flag propagates upward until it
//! reaches an already-flagged ancestor or a parentless node.
//!
//! Refreshing walks only the flagged branches, bottom-up:
//!
//! - no flagged children and a valid cache: nothing to do;
//! - zero or one child: direct;
//! - otherwise the flagged children give up the edges they owned, and each
//!   flagged child extends the box (ties reclaim the edge). If an edge is
//!   still vacant afterwards, a former edge owner shrank, and the box is
//!   recomputed from every child.
//!
//! Large child lists keep an explicit list of flagged children so refreshes
//! never scan the whole list.

use super::id::{INVALID, NodeId};
use super::kind::NodeKind;
use super::store::NodeStore;
use crate::bounds::{Bounds3d, BoundsCache};
use crate::dirty;
use crate::transform::Transform3d;

impl NodeStore {
    // -- Queries --

    /// Returns the bounds of a node in its own coordinates, as of the last
    /// refresh.
    ///
    /// Leaves and sub-scenes cover `(0, 0)` to their size; containers cover
    /// their visible children. An invisible node has empty bounds.
    #[must_use]
    pub fn local_bounds(&self, id: NodeId) -> Bounds3d {
        self.validate(id);
        self.local_bounds_at(id.idx)
    }

    /// Returns the bounds of a node in its parent's coordinates, as of the
    /// last refresh.
    #[must_use]
    pub fn bounds_in_parent(&self, id: NodeId) -> Bounds3d {
        self.validate(id);
        self.bounds_in_parent_at(id.idx)
    }

    /// Refreshes the node's cached bounds and returns them mapped through
    /// `tx`.
    ///
    /// For translations the cached box is offset. Any other transform maps
    /// each child's box separately, since a transformed union is generally
    /// looser than the union of transformed boxes.
    pub fn compute_bounds(&mut self, id: NodeId, tx: &Transform3d) -> Bounds3d {
        self.validate(id);
        self.refresh_bounds(id.idx);
        self.transformed_bounds_at(id.idx, tx)
    }

    /// Refreshes every flagged branch under a parentless node in the scene.
    ///
    /// Returns the number of roots refreshed.
    pub fn update_bounds(&mut self) -> usize {
        let roots = core::mem::take(&mut self.bounds_roots);
        for &root in &roots {
            if self.alive[root as usize] {
                self.refresh_bounds(root);
                self.bounds_changed[root as usize] = false;
            }
        }
        roots.len()
    }

    // -- Marking --

    /// Flags a node whose bounds (as seen by its parent) may have changed.
    pub(crate) fn mark_bounds_changed(&mut self, idx: u32) {
        let mut idx = idx;
        loop {
            let i = idx as usize;
            let owner = self.clip_owner[i];
            if owner != INVALID {
                idx = owner;
                continue;
            }
            if self.bounds_changed[i] {
                return;
            }
            self.bounds_changed[i] = true;

            let p = self.parent[i];
            if p == INVALID {
                if self.in_scene[i] && !self.bounds_roots.contains(&idx) {
                    self.bounds_roots.push(idx);
                    self.request_pulse();
                }
                return;
            }

            let pi = p as usize;
            let materialize = self.bounds[pi].changed.is_none()
                && self.children[pi].len() > self.config.dirty_children_threshold;
            let flagged: Option<Vec<u32>> = materialize.then(|| {
                self.children[pi]
                    .iter()
                    .copied()
                    .filter(|&c| self.bounds_changed[c as usize])
                    .collect()
            });
            let cache = &mut self.bounds[pi];
            cache.changed_count += 1;
            if let Some(list) = flagged {
                cache.changed = Some(list);
            } else if let Some(list) = &mut cache.changed {
                list.push(idx);
            }
            idx = p;
        }
    }

    // -- Refresh --

    /// Refreshes the cached bounds of `idx` and every flagged descendant.
    pub(crate) fn refresh_bounds(&mut self, idx: u32) {
        let i = idx as usize;
        let clip = self.clip[i];
        if clip != INVALID {
            self.refresh_bounds(clip);
        }
        if self.kind[i] != NodeKind::Container {
            return;
        }

        let cache = &self.bounds[i];
        let flagged: Vec<u32> = if cache.changed_count == 0 {
            Vec::new()
        } else if let Some(list) = &cache.changed {
            list.clone()
        } else {
            self.children[i]
                .iter()
                .copied()
                .filter(|&c| self.bounds_changed[c as usize])
                .collect()
        };
        for &c in &flagged {
            self.refresh_bounds(c);
        }

        let before = self.bounds[i].bounds;
        self.recompute(idx, &flagged);
        for &c in &flagged {
            self.bounds_changed[c as usize] = false;
        }
        let keep_list = self.children[i].len() > self.config.dirty_children_threshold;
        let cache = &mut self.bounds[i];
        cache.changed_count = 0;
        cache.changed = keep_list.then(Vec::new);
        cache.valid = true;

        if !before.approx_eq(&self.bounds[i].bounds, 0.0) {
            self.mark_sync(idx, dirty::GEOMETRY);
        }
    }

    fn recompute(&mut self, idx: u32, flagged: &[u32]) {
        let i = idx as usize;
        match self.children[i].len() {
            0 => {
                self.bounds[i] = BoundsCache {
                    valid: true,
                    ..BoundsCache::default()
                };
                return;
            }
            1 => {
                let c = self.children[i][0];
                let b = self.bounds_in_parent_at(c);
                let cache = &mut self.bounds[i];
                cache.bounds = b;
                cache.edges = [c; 6];
                return;
            }
            _ => {}
        }

        let cache = &self.bounds[i];
        if cache.valid && flagged.is_empty() {
            return;
        }
        if !cache.valid || cache.bounds.is_empty() || cache.has_vacancy() {
            self.recompute_full(idx);
            return;
        }

        let boxes: Vec<(u32, Bounds3d)> = flagged
            .iter()
            .map(|&c| (c, self.bounds_in_parent_at(c)))
            .collect();
        let cache = &mut self.bounds[i];
        for &(c, _) in &boxes {
            cache.vacate(c);
        }
        for (c, b) in &boxes {
            if !b.is_empty() {
                cache.extend(*c, b);
            }
        }
        if cache.has_vacancy() {
            self.recompute_full(idx);
        } else {
            self.bounds_stats.incremental += 1;
        }
    }

    fn recompute_full(&mut self, idx: u32) {
        let i = idx as usize;
        let mut cache = BoundsCache {
            valid: true,
            ..BoundsCache::default()
        };
        for &c in &self.children[i] {
            let b = self.bounds_in_parent_at(c);
            if !b.is_empty() {
                cache.extend(c, &b);
            }
        }
        let old = &self.bounds[i];
        cache.changed_count = old.changed_count;
        cache.changed = old.changed.clone();
        self.bounds[i] = cache;
        self.bounds_stats.full += 1;
    }

    // -- Raw-index geometry --

    pub(crate) fn local_bounds_at(&self, idx: u32) -> Bounds3d {
        let i = idx as usize;
        if !self.visible[i] {
            return Bounds3d::EMPTY;
        }
        let own = match self.kind[i] {
            NodeKind::Leaf | NodeKind::SubScene => {
                let s = self.size[i];
                Bounds3d::from_origin_size(0.0, 0.0, s.width, s.height)
            }
            NodeKind::Container => self.bounds[i].bounds,
        };
        self.clipped(idx, own)
    }

    fn clipped(&self, idx: u32, own: Bounds3d) -> Bounds3d {
        let clip = self.clip[idx as usize];
        if clip == INVALID {
            own
        } else {
            own.intersect(self.bounds_in_parent_at(clip))
        }
    }

    /// The transform from a node's coordinates to its parent's.
    pub(crate) fn parent_transform_at(&self, idx: u32) -> Transform3d {
        let i = idx as usize;
        let p = self.position[i];
        Transform3d::from_translation(p.x, p.y, 0.0) * self.transform[i]
    }

    pub(crate) fn bounds_in_parent_at(&self, idx: u32) -> Bounds3d {
        let tx = self.parent_transform_at(idx);
        self.transformed_bounds_at(idx, &tx)
    }

    fn transformed_bounds_at(&self, idx: u32, tx: &Transform3d) -> Bounds3d {
        let i = idx as usize;
        if !self.visible[i] {
            return Bounds3d::EMPTY;
        }
        if tx.is_translation() || self.kind[i] != NodeKind::Container {
            return self.local_bounds_at(idx).transform(tx);
        }
        let mut out = Bounds3d::EMPTY;
        for &c in &self.children[i] {
            let child_tx = *tx * self.parent_transform_at(c);
            out = out.union(self.transformed_bounds_at(c, &child_tx));
        }
        let clip = self.clip[i];
        if clip != INVALID {
            let clip_tx = *tx * self.parent_transform_at(clip);
            out = out.intersect(self.transformed_bounds_at(clip, &clip_tx));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Size};

    use super::*;
    use crate::bounds::BoundsStats;

    fn scene_with_children(n: usize) -> (NodeStore, NodeId, Vec<NodeId>) {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Container);
        store.mark_scene_root(root.idx);
        let mut kids = Vec::new();
        for k in 0..n {
            let c = store.create_node(NodeKind::Leaf);
            store.set_size(c, Size::new(10.0, 10.0));
            store.relocate(c, Point::new(20.0 * k as f64, 0.0));
            kids.push(c);
        }
        store.set_children(root, &kids).unwrap();
        store.update_bounds();
        (store, root, kids)
    }

    fn full_bounds(store: &mut NodeStore, root: NodeId) -> Bounds3d {
        store.bounds[root.idx as usize].valid = false;
        store.mark_bounds_changed(root.idx);
        store.update_bounds();
        store.local_bounds(root)
    }

    #[test]
    fn empty_and_single_child() {
        let (mut store, root, _) = scene_with_children(0);
        assert!(store.local_bounds(root).is_empty());
        let c = store.create_node(NodeKind::Leaf);
        store.set_size(c, Size::new(4.0, 5.0));
        store.relocate(c, Point::new(1.0, 1.0));
        store.add_child(root, c).unwrap();
        store.update_bounds();
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(1.0, 1.0, 4.0, 5.0)
        );
        store.set_visible(c, false);
        store.update_bounds();
        assert!(store.local_bounds(root).is_empty(), "only child hidden");
    }

    #[test]
    fn interior_move_is_incremental() {
        let (mut store, root, kids) = scene_with_children(5);
        let before = store.bounds_stats();
        store.relocate(kids[2], Point::new(41.0, 3.0));
        store.update_bounds();
        let after = store.bounds_stats();
        assert_eq!(after.incremental, before.incremental + 1);
        assert_eq!(after.full, before.full);
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(0.0, 0.0, 90.0, 13.0)
        );
    }

    #[test]
    fn shrinking_edge_falls_back_to_full() {
        let (mut store, root, kids) = scene_with_children(3);
        let before = store.bounds_stats();
        store.relocate(kids[2], Point::new(5.0, 0.0));
        store.update_bounds();
        assert_eq!(store.bounds_stats().full, before.full + 1);
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(0.0, 0.0, 30.0, 10.0)
        );
    }

    #[test]
    fn growing_edge_stays_incremental() {
        let (mut store, root, kids) = scene_with_children(3);
        let before = store.bounds_stats();
        store.relocate(kids[2], Point::new(100.0, 0.0));
        store.update_bounds();
        assert_eq!(store.bounds_stats().full, before.full);
        assert_eq!(store.local_bounds(root).max[0], 110.0);
    }

    #[test]
    fn removing_middle_child_matches_fresh_container() {
        let (mut store, root, kids) = scene_with_children(3);
        store.remove_child(root, kids[1]).unwrap();
        store.update_bounds();
        let incremental = store.local_bounds(root);

        let (mut fresh, fresh_root, _) = scene_with_children(0);
        let mut remaining = Vec::new();
        for k in [0, 2] {
            let c = fresh.create_node(NodeKind::Leaf);
            fresh.set_size(c, Size::new(10.0, 10.0));
            fresh.relocate(c, Point::new(20.0 * k as f64, 0.0));
            remaining.push(c);
        }
        fresh.set_children(fresh_root, &remaining).unwrap();
        fresh.update_bounds();

        assert!(incremental.approx_eq(&fresh.local_bounds(fresh_root), 1e-9));
        assert!(full_bounds(&mut store, root).approx_eq(&incremental, 1e-9));
    }

    #[test]
    fn removing_edge_child_shrinks() {
        let (mut store, root, kids) = scene_with_children(3);
        store.remove_child(root, kids[2]).unwrap();
        store.update_bounds();
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(0.0, 0.0, 30.0, 10.0)
        );
    }

    #[test]
    fn nested_changes_propagate() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Container);
        store.mark_scene_root(root.idx);
        let mid = store.create_node(NodeKind::Container);
        let leaf = store.create_node(NodeKind::Leaf);
        store.add_child(root, mid).unwrap();
        store.add_child(mid, leaf).unwrap();
        store.relocate(mid, Point::new(100.0, 100.0));
        store.set_size(leaf, Size::new(5.0, 5.0));
        store.update_bounds();
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(100.0, 100.0, 5.0, 5.0)
        );
        store.relocate(leaf, Point::new(-5.0, 0.0));
        store.update_bounds();
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(95.0, 100.0, 5.0, 5.0)
        );
    }

    #[test]
    fn clip_limits_bounds() {
        let (mut store, root, _) = scene_with_children(3);
        let clip = store.create_node(NodeKind::Leaf);
        store.set_size(clip, Size::new(15.0, 5.0));
        store.set_clip(root, Some(clip)).unwrap();
        store.update_bounds();
        assert_eq!(
            store.local_bounds(root),
            Bounds3d::from_origin_size(0.0, 0.0, 15.0, 5.0)
        );
        store.set_size(clip, Size::new(25.0, 5.0));
        store.update_bounds();
        assert_eq!(store.local_bounds(root).max[0], 25.0);
    }

    #[test]
    fn rotated_bounds_map_each_child() {
        let (mut store, root, _) = scene_with_children(2);
        let rot = Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2);
        let b = store.compute_bounds(root, &rot);
        // x in [0, 30], y in [0, 10] rotates to x in [-10, 0], y in [0, 30].
        assert!(b.approx_eq(&Bounds3d::new([-10.0, 0.0, 0.0], [0.0, 30.0, 0.0]), 1e-9));
        let moved = store.compute_bounds(root, &Transform3d::from_translation(1.0, 2.0, 0.0));
        assert_eq!(moved, Bounds3d::from_origin_size(1.0, 2.0, 30.0, 10.0));
    }

    #[test]
    fn large_containers_track_flagged_children() {
        let (mut store, root, kids) = scene_with_children(12);
        store.relocate(kids[3], Point::new(61.0, 0.0));
        assert_eq!(
            store.bounds[root.idx as usize].changed.as_deref(),
            Some(&[kids[3].idx][..])
        );
        store.update_bounds();
        assert_eq!(store.bounds[root.idx as usize].changed_count, 0);
    }

    #[test]
    fn random_moves_match_full_recompute() {
        let (mut store, root, kids) = scene_with_children(16);
        let mut seed = 7_u64;
        let mut next = || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (seed >> 40) as f64 / f64::from(1_u32 << 24)
        };
        for round in 0..200 {
            for _ in 0..3 {
                let k = (next() * kids.len() as f64) as usize % kids.len();
                store.relocate(kids[k], Point::new(next() * 300.0, next() * 300.0));
                if round % 17 == 0 {
                    store.set_visible(kids[k], next() > 0.3);
                }
            }
            store.update_bounds();
            let incremental = store.local_bounds(root);
            let full = full_bounds(&mut store, root);
            assert!(
                incremental.approx_eq(&full, 1e-9),
                "round {round}: {incremental:?} != {full:?}"
            );
        }
        let BoundsStats { incremental, full } = store.bounds_stats();
        assert!(incremental > 0 && full > 0, "both paths exercised");
    }
}
