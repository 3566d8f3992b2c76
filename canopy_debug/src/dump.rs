// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dumps of a node tree.
//!
//! Each node is one line: kind and slot index, then its style id, classes,
//! and pseudo-classes in selector syntax, then its local bounds. Embedded
//! sub-scene roots are listed under their host with a `>` marker.
//!
//! ```text
//! container#0 .root [0,0 30,10]
//!   leaf#1 :focused [0,0 10,10]
//!   leaf#2 .wide [0,0 20,10] hidden
//! ```

use std::fmt::Write as _;

use canopy_core::node::{NodeId, NodeStore};

/// Renders the subtree under `root` as indented text.
#[must_use]
pub fn dump_tree(store: &NodeStore, root: NodeId) -> String {
    let mut out = String::new();
    write_node(store, root, 0, false, &mut out);
    out
}

fn write_node(store: &NodeStore, id: NodeId, depth: usize, embedded: bool, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    if embedded {
        out.push_str("> ");
    }
    let _ = write!(out, "{}#{}", store.kind(id).type_name(), id.index());
    if let Some(style_id) = store.style_id(id) {
        let _ = write!(out, " #{style_id}");
    }
    for class in store.style_classes(id) {
        let _ = write!(out, " .{class}");
    }
    for pc in store.pseudo_classes(id).iter() {
        let _ = write!(out, " :{}", pc.as_str());
    }
    let r = store.local_bounds(id).to_rect();
    let _ = write!(out, " [{},{} {},{}]", r.x0, r.y0, r.x1, r.y1);
    if !store.is_visible(id) {
        out.push_str(" hidden");
    }
    out.push('\n');

    for child in store.children(id) {
        write_node(store, child, depth + 1, false, out);
    }
    if let Some(inner) = store.sub_scene_root(id) {
        write_node(store, inner, depth + 1, true, out);
    }
}
