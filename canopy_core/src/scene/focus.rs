// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus ownership and repair.

use super::Scene;
use crate::css::{PseudoClass, StyleSource};
use crate::error::SceneError;
use crate::node::NodeId;

impl<S: StyleSource> Scene<S> {
    /// The node holding focus, if any.
    #[must_use]
    pub fn focus_owner(&self) -> Option<NodeId> {
        self.focus
    }

    /// Moves focus to `node`. Returns `false`, leaving focus unchanged, if
    /// the node cannot hold focus.
    pub fn request_focus(&mut self, node: NodeId) -> Result<bool, SceneError> {
        self.check_thread()?;
        self.store.check(node)?;
        if !self.store.can_focus(node) {
            return Ok(false);
        }
        self.set_focus(Some(node));
        Ok(true)
    }

    /// Clears the focus owner.
    pub fn clear_focus(&mut self) -> Result<(), SceneError> {
        self.check_thread()?;
        self.set_focus(None);
        Ok(())
    }

    /// Sets the node that takes focus when the owner becomes ineligible and
    /// nothing near it can.
    pub fn set_initial_focus(&mut self, node: Option<NodeId>) -> Result<(), SceneError> {
        self.check_thread()?;
        if let Some(node) = node {
            self.store.check(node)?;
        }
        self.initial_focus = node;
        self.focus_dirty = true;
        self.store.request_pulse();
        Ok(())
    }

    fn set_focus(&mut self, node: Option<NodeId>) {
        if self.focus == node {
            return;
        }
        if let Some(old) = self.focus
            && self.store.is_alive(old)
        {
            self.store.set_pseudo_class(old, PseudoClass::FOCUSED, false);
        }
        self.focus = node;
        self.focus_path = match node {
            Some(n) => {
                self.store.set_pseudo_class(n, PseudoClass::FOCUSED, true);
                self.store.ancestors(n)
            }
            None => Vec::new(),
        };
        self.focus_dirty = false;
        self.store.request_pulse();
    }

    /// Redirects focus away from an owner that can no longer hold it.
    /// Returns whether the owner changed.
    ///
    /// Candidates, in order: the first focusable node under the owner's
    /// nearest surviving ancestor (as recorded when focus was taken), the
    /// initial focus node, then the first focusable node in the scene.
    pub(crate) fn repair_focus(&mut self) -> bool {
        let before = self.focus;
        let owner_ok = self.focus.is_some_and(|f| self.store.can_focus(f));
        if owner_ok {
            if self.focus_dirty
                && let Some(owner) = self.focus
            {
                self.focus_path = self.store.ancestors(owner);
            }
            self.focus_dirty = false;
            return false;
        }
        if self.focus.is_none() && !self.focus_dirty {
            return false;
        }

        let next = self
            .nearest_focusable()
            .or_else(|| self.initial_focus.filter(|&n| self.store.can_focus(n)))
            .or_else(|| {
                self.root
                    .filter(|&r| self.store.is_alive(r))
                    .and_then(|r| self.first_focusable(r))
            });
        if self.focus.is_some() || next.is_some() {
            self.set_focus(next);
        }
        self.focus_dirty = false;
        before != self.focus
    }

    fn nearest_focusable(&self) -> Option<NodeId> {
        self.focus?;
        self.focus_path
            .iter()
            .filter(|&&a| self.store.is_alive(a) && self.store.is_in_scene(a))
            .find_map(|&a| self.first_focusable(a))
    }

    fn first_focusable(&self, under: NodeId) -> Option<NodeId> {
        self.store
            .scene_pre_order(under)
            .find(|&n| self.store.can_focus(n))
    }
}

#[cfg(test)]
mod tests {
    use crate::css::PseudoClass;
    use crate::node::{NodeId, NodeKind};
    use crate::scene::{Scene, SceneConfig};

    struct Fixture {
        scene: Scene,
        panel: NodeId,
        a: NodeId,
        b: NodeId,
        other: NodeId,
    }

    // root
    // ├── panel
    // │   ├── a
    // │   └── b
    // └── other
    fn fixture() -> Fixture {
        let mut scene = Scene::new(SceneConfig::headless());
        let tree = scene.tree_mut().unwrap();
        let root = tree.create_node(NodeKind::Container);
        let panel = tree.create_node(NodeKind::Container);
        let a = tree.create_node(NodeKind::Leaf);
        let b = tree.create_node(NodeKind::Leaf);
        let other = tree.create_node(NodeKind::Leaf);
        tree.set_children(root, &[panel, other]).unwrap();
        tree.set_children(panel, &[a, b]).unwrap();
        for n in [a, b, other] {
            tree.set_focus_traversable(n, true);
        }
        scene.set_root(Some(root)).unwrap();
        Fixture {
            scene,
            panel,
            a,
            b,
            other,
        }
    }

    #[test]
    fn focus_sets_pseudo_class() {
        let mut f = fixture();
        assert!(f.scene.request_focus(f.a).unwrap());
        let focused = PseudoClass::new(PseudoClass::FOCUSED);
        assert!(f.scene.tree().pseudo_classes(f.a).contains(&focused));
        assert!(f.scene.request_focus(f.b).unwrap());
        assert!(!f.scene.tree().pseudo_classes(f.a).contains(&focused));
        assert_eq!(f.scene.focus_owner(), Some(f.b));

        f.scene.tree_mut().unwrap().set_disabled(f.other, true);
        assert!(!f.scene.request_focus(f.other).unwrap());
        assert_eq!(f.scene.focus_owner(), Some(f.b));
    }

    #[test]
    fn removed_owner_moves_to_a_neighbor() {
        let mut f = fixture();
        f.scene.request_focus(f.a).unwrap();
        f.scene.tree_mut().unwrap().remove_child(f.panel, f.a).unwrap();
        assert!(f.scene.repair_focus());
        assert_eq!(f.scene.focus_owner(), Some(f.b), "sibling under the same panel");
    }

    #[test]
    fn initial_focus_is_the_fallback() {
        let mut f = fixture();
        f.scene.set_initial_focus(Some(f.other)).unwrap();
        f.scene.request_focus(f.a).unwrap();
        let tree = f.scene.tree_mut().unwrap();
        tree.set_visible(f.panel, false);
        assert!(f.scene.repair_focus());
        assert_eq!(f.scene.focus_owner(), Some(f.other));
    }

    #[test]
    fn nothing_focusable_clears_focus() {
        let mut f = fixture();
        f.scene.request_focus(f.a).unwrap();
        let tree = f.scene.tree_mut().unwrap();
        for n in [f.a, f.b, f.other] {
            tree.set_focus_traversable(n, false);
        }
        assert!(f.scene.repair_focus());
        assert_eq!(f.scene.focus_owner(), None);
        assert!(!f.scene.repair_focus(), "stable once cleared");
    }
}
