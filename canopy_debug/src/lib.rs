// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export, and tree dumps for
//! canopy diagnostics.
//!
//! This crate provides [`TraceSink`](canopy_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! [`dump::dump_tree`] renders a node tree as indented text.

pub mod chrome;
pub mod dump;
pub mod pretty;
pub mod recorder;
