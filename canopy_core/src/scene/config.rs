// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene configuration.

use crate::node::TreeConfig;

/// Tunables for a [`Scene`](super::Scene).
///
/// Use [`SceneConfig::new`] for an interactive scene attached to a surface,
/// or [`SceneConfig::headless`] for tests and offscreen work where any
/// thread may drive the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Removed children remembered per container between syncs. Past this,
    /// the container's peer is told to rebuild its child list.
    pub removed_children_threshold: usize,
    /// Child count above which a container tracks bounds-changed children
    /// in an explicit list.
    pub dirty_children_threshold: usize,
    /// Log a warning when a child is taken from another container.
    pub warn_on_reparent: bool,
    /// Reject mutation from other threads once the scene is attached.
    pub enforce_thread: bool,
}

impl SceneConfig {
    /// Defaults for an interactive scene.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            removed_children_threshold: 20,
            dirty_children_threshold: 10,
            warn_on_reparent: false,
            enforce_thread: true,
        }
    }

    /// Like [`new`](Self::new) but without the thread check.
    #[must_use]
    pub const fn headless() -> Self {
        Self {
            enforce_thread: false,
            ..Self::new()
        }
    }

    /// The node-store part of this configuration.
    #[must_use]
    pub const fn tree(&self) -> TreeConfig {
        TreeConfig {
            removed_children_threshold: self.removed_children_threshold,
            dirty_children_threshold: self.dirty_children_threshold,
            warn_on_reparent: self.warn_on_reparent,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}
