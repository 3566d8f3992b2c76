// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presenter contract for render integrations.
//!
//! Canopy keeps the scene graph on the application thread and mirrors it
//! into a *peer tree* owned by a renderer, usually on its own thread. A
//! renderer integration provides the following pieces:
//!
//! - **Presenter**: implements the [`Presenter`] trait. The pulse calls it
//!   during the sync phase only, between [`lock`](Presenter::lock) and
//!   [`unlock`](Presenter::unlock), to create, update, and release peers.
//!   The core never reads anything back from a peer.
//!
//! - **Pulse driver**: a frame callback that calls
//!   [`Scene::pulse`](crate::scene::Scene::pulse) once per frame while
//!   [`pulse_requested`](crate::node::NodeStore::pulse_requested) is set.
//!   The scene raises its pulse signal when the first change after a pulse
//!   arrives, so drivers can sleep in between.
//!
//! # Crate boundaries
//!
//! `canopy_core` owns the data model, style resolution, layout, the pulse,
//! and this contract module. Renderer crates depend on `canopy_core` and
//! provide the peer tree. Application code wires the two together in a frame
//! loop.

use crate::node::{NodeKind, NodeStore, SyncFlags};
use crate::scene::SceneUpdate;

/// One node's peer work in a sync.
#[derive(Clone, Copy, Debug)]
pub struct PeerUpdate<'a> {
    /// Slot index of the node.
    pub node: u32,
    /// Which aspects changed.
    pub changes: SyncFlags,
    /// Children removed from this node since its last sync.
    pub removed: &'a [u32],
    /// Set when more children were removed than the store remembers; the
    /// peer should rebuild its child list from scratch.
    pub full_repaint: bool,
}

/// Applies synchronized changes to a render-side peer tree.
///
/// Peers are addressed by node slot index. Indices are reused after a node
/// is destroyed, but the pulse always releases the old peer before creating
/// a new one for the same slot.
///
/// # Pulse pseudocode
///
/// A typical frame callback wires the pieces together like this:
///
/// ```rust,ignore
/// fn on_frame(scene: &mut Scene, presenter: &mut MyPresenter) {
///     if !scene.tree().pulse_requested() {
///         return;
///     }
///     // Focus, listeners, CSS, layout, bounds, then sync through the
///     // presenter while its lock is held.
///     let report = scene.pulse(presenter)?;
///     if !report.is_noop() {
///         presenter.request_repaint();
///     }
/// }
/// ```
pub trait Presenter {
    /// Called before any peer work of a pulse.
    fn lock(&mut self) {}

    /// Called after all peer work of a pulse.
    fn unlock(&mut self) {}

    /// Creates the peer for a node that has none yet.
    fn create_peer(&mut self, node: u32, kind: NodeKind);

    /// Drops the peer of a destroyed node.
    fn release_peer(&mut self, node: u32);

    /// Applies one node's changes, reading current values from `store`.
    fn update_peer(&mut self, store: &NodeStore, update: &PeerUpdate<'_>);

    /// Applies changed scene-level properties.
    fn update_scene(&mut self, update: &SceneUpdate<'_>) {
        _ = update;
    }
}
