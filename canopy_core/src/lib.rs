// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode scene graph core: node tree, cascading styles, layout, and
//! frame pulses.
//!
//! `canopy_core` keeps a tree of visual nodes on the application thread and
//! turns changes to it into incremental updates for a render-side peer tree.
//! Nodes live in struct-of-arrays storage with generational index handles.
//!
//! # Architecture
//!
//! All work happens in a *pulse*, normally once per frame:
//!
//! ```text
//!   mutations ──► dirty flags ──► pulse signal
//!                                      │
//!                 ┌────────────────────┘
//!                 ▼
//!   Scene::pulse(): focus ─► listeners ─► CSS ─► layout ─► listeners
//!                                                               │
//!                 ┌─────────────────────────────────────────────┘
//!                 ▼
//!   bounds ─► NodeStore::collect_sync() ─► Presenter (peer tree)
//! ```
//!
//! **[`node`]**: The node tree: identity, kinds, child lists with
//! validated structural mutation, geometry, and per-node pass state.
//!
//! **[`bounds`]**: Incrementally maintained container bounds that remember
//! which child defines each edge.
//!
//! **[`css`]**: Stylesheets, selectors, the property registry, and the
//! style engine with its shared per-map caches.
//!
//! **[`layout`]**: Layout policies and the top-down layout pass over dirty
//! branches.
//!
//! **[`scene`]**: [`Scene`](scene::Scene), a tree plus styles, focus,
//! scene-level properties, and the pulse itself.
//!
//! **[`dirty`]**: Sync channels for render peer updates via
//! `understory_dirty`.
//!
//! **[`backend`]**: The [`Presenter`](backend::Presenter) trait renderer
//! integrations implement.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! pulse instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! **[`error`]**: Error enums for structural, style, property, and
//! threading failures.
//!
//! **[`time`]** / **[`transform`]**: Timestamps for tracing and the 3D
//! affine transform type for node positioning.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   change events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod bounds;
pub mod css;
pub mod dirty;
pub mod error;
pub mod layout;
pub mod node;
pub mod scene;
pub mod time;
pub mod trace;
pub mod transform;
