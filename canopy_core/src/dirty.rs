// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sync channel constants.
//!
//! Each node carries per-channel dirty state in an
//! [`understory_dirty::DirtyTracker`] owned by the
//! [`NodeStore`](crate::node::NodeStore). Every channel is local-only: a mark
//! names exactly the node whose render peer needs the update. Structural and
//! inherited effects (a subtree joining the scene, a container's bounds
//! growing because a child moved) are expanded into explicit marks by the
//! store at mutation time.
//!
//! The pulse drains all channels once per frame and merges the results into
//! one update per node (see [`Scene::pulse`](crate::scene::Scene::pulse)). A
//! pulse that drains nothing does no sync work.

use understory_dirty::Channel;

/// Transform, layout position, size, or cached bounds changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// A styleable property value changed (opacity, fill, cursor, ...).
pub const PROPERTIES: Channel = Channel::new(1);

/// The child list or its view order changed.
pub const CHILDREN: Channel = Channel::new(2);

/// The node's own visibility flag changed.
pub const VISIBILITY: Channel = Channel::new(3);

/// The clip node assignment changed.
pub const CLIP: Channel = Channel::new(4);

/// All channels, in drain order.
pub const ALL: [Channel; 5] = [GEOMETRY, PROPERTIES, CHILDREN, VISIBILITY, CLIP];
