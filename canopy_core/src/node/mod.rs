// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is a member of a scene's visual tree. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - A [`NodeKind`]: a leaf, a container owning an ordered child list, or a
//!   sub-scene embedding a separately rooted tree.
//! - Geometry: a local transform, a layout position, a size, visibility, and
//!   for containers a cached union of the children's bounds (see
//!   [`local_bounds`](NodeStore::local_bounds)).
//! - Layout state: managed and resizable flags, an optional
//!   [`LayoutPolicy`](crate::layout::LayoutPolicy), and memoized size
//!   queries.
//! - Style state: a type name, style classes, an id, inline style text,
//!   pseudo-classes, and the resolved property values with their origins.
//!
//! Nodes live in struct-of-arrays storage with index-based handles.
//!
//! # Structural invariants
//!
//! Every child-list mutation is validated before it is committed (see
//! [`NodeStore::add_child`] and friends). A node has at most one parent, is
//! never its own ancestor, appears at most once in a child list, and is
//! never both a child and a clip. Violations are returned as
//! [`TreeError`](crate::error::TreeError)s and leave the tree untouched.
//!
//! # Dirty tracking
//!
//! Mutations mark what they invalidate: sync channels for the render peer
//! (see [`dirty`](crate::dirty)), a bounds flag that propagates to the
//! nearest flagged ancestor, a CSS flag with dirty-branch markers up to the
//! root, and a layout flag with dirty-branch markers up to the layout root.
//! Any mark also raises [`pulse_requested`](NodeStore::pulse_requested) and,
//! on the first request since the last pulse, calls the installed pulse
//! signal.

mod children;
mod flags;
mod geometry;
mod id;
mod kind;
mod store;
mod sync;
mod traverse;

pub use flags::{CssFlag, LayoutFlag, TreeConfig};
pub use id::{INVALID, NodeId};
pub use kind::NodeKind;
pub use store::NodeStore;
pub use sync::{SyncChanges, SyncFlags};
pub use traverse::{Children, PreOrder};
