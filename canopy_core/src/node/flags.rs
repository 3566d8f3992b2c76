// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node pass state for the CSS and layout passes.

/// How much style work a node needs in the next CSS pass.
///
/// Variants are ordered by severity. A node visited by the pass hands
/// `max(own, parent)` down to its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CssFlag {
    /// Styles are current.
    #[default]
    Clean,
    /// Some descendant needs work; this node does not.
    DirtyBranch,
    /// Pseudo-class state changed: re-resolve values from the existing
    /// helper.
    Update,
    /// Selectors may match differently: rebuild the style helper.
    Reapply,
}

/// Layout state of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutFlag {
    /// Nothing to do.
    #[default]
    Clean,
    /// Some descendant needs layout; this node's children stay where they
    /// are.
    DirtyBranch,
    /// The node's layout policy must run.
    NeedsLayout,
}

/// Tree-wide thresholds and diagnostics switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Removed children remembered per container between syncs. Past this,
    /// the container reports a full repaint instead.
    pub removed_children_threshold: usize,
    /// Child count above which a container keeps an explicit list of
    /// children whose bounds changed.
    pub dirty_children_threshold: usize,
    /// Log a warning when a child is taken from another container.
    pub warn_on_reparent: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            removed_children_threshold: 20,
            dirty_children_threshold: 10,
            warn_on_reparent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_flags_order_by_severity() {
        assert!(CssFlag::Clean < CssFlag::DirtyBranch);
        assert!(CssFlag::DirtyBranch < CssFlag::Update);
        assert!(CssFlag::Update < CssFlag::Reapply);
        assert_eq!(CssFlag::Update.max(CssFlag::DirtyBranch), CssFlag::Update);
    }
}
