// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout requests, size queries, and the layout pass.

use std::sync::Arc;

use kurbo::{Insets, Size};

use super::context::LayoutContext;
use super::policy::{DefaultLayout, LayoutPolicy};
use super::Axis;
use crate::css::PropertyId;
use crate::node::{INVALID, LayoutFlag, NodeId, NodeKind, NodeStore};

static DEFAULT_LAYOUT: DefaultLayout = DefaultLayout::new(Axis::Horizontal);

/// Memoized size queries of one container.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SizeCache {
    pref: Option<Size>,
    min: Option<Size>,
    max: Option<Size>,
}

impl NodeStore {
    // -- Public API --

    /// Schedules layout for a node.
    pub fn request_layout(&mut self, id: NodeId) {
        self.validate(id);
        self.request_layout_at(id.idx);
    }

    /// Installs a layout policy on a container. `None` restores the default
    /// policy.
    pub fn set_layout_policy(&mut self, id: NodeId, policy: Option<Arc<dyn LayoutPolicy>>) {
        self.validate(id);
        self.layout_policy[id.idx as usize] = policy;
        self.request_layout_at(id.idx);
        self.request_parent_layout_at(id.idx);
    }

    /// Returns the layout state of a node.
    #[must_use]
    pub fn layout_flag(&self, id: NodeId) -> LayoutFlag {
        self.validate(id);
        self.layout_flag[id.idx as usize]
    }

    /// The node's preferred size.
    ///
    /// Explicit `pref-width` / `pref-height` values win. Otherwise a leaf
    /// prefers its current size, a sub-scene its own size, and a container
    /// what its policy computes plus its padding.
    pub fn pref_size(&mut self, id: NodeId) -> Size {
        self.validate(id);
        self.pref_size_at(id.idx)
    }

    /// The node's minimum size.
    pub fn min_size(&mut self, id: NodeId) -> Size {
        self.validate(id);
        self.min_size_at(id.idx)
    }

    /// The node's maximum size.
    pub fn max_size(&mut self, id: NodeId) -> Size {
        self.validate(id);
        self.max_size_at(id.idx)
    }

    /// Lays out a node's dirty branches.
    pub fn layout(&mut self, id: NodeId) {
        self.validate(id);
        self.layout_at(id.idx);
    }

    /// Lays out `root`, then every registered layout root still in a scene.
    ///
    /// Returns the number of roots that had layout work.
    pub fn layout_pass(&mut self, root: NodeId) -> usize {
        self.validate(root);
        let mut count = 0;
        if self.layout_flag[root.idx as usize] != LayoutFlag::Clean {
            self.layout_at(root.idx);
            count += 1;
        }
        let roots = core::mem::take(&mut self.layout_roots);
        for r in roots {
            let i = r as usize;
            if r != root.idx
                && self.alive[i]
                && self.in_scene[i]
                && self.layout_flag[i] != LayoutFlag::Clean
            {
                self.layout_at(r);
                count += 1;
            }
        }
        count
    }

    // -- Requests --

    pub(crate) fn request_layout_at(&mut self, idx: u32) {
        let i = idx as usize;
        self.size_cache[i] = SizeCache::default();
        if self.kind[i] == NodeKind::Leaf {
            return;
        }
        self.layout_flag[i] = LayoutFlag::NeedsLayout;
        let mut cur = idx;
        loop {
            let c = cur as usize;
            let p = self.parent[c];
            if p == INVALID || !self.managed[c] {
                if !self.layout_roots.contains(&cur) {
                    self.layout_roots.push(cur);
                }
                break;
            }
            let pi = p as usize;
            self.size_cache[pi] = SizeCache::default();
            if self.layout_flag[pi] == LayoutFlag::Clean {
                self.layout_flag[pi] = LayoutFlag::DirtyBranch;
            }
            cur = p;
        }
        self.request_pulse();
    }

    /// Requests layout of the parent, if the parent manages `idx`.
    pub(crate) fn request_parent_layout_at(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        if p != INVALID && self.managed[idx as usize] {
            self.request_layout_at(p);
        }
    }

    // -- Pass --

    pub(crate) fn layout_at(&mut self, idx: u32) {
        let i = idx as usize;
        if self.layout_flag[i] == LayoutFlag::Clean || self.performing_layout[i] {
            return;
        }
        self.performing_layout[i] = true;
        if self.layout_flag[i] == LayoutFlag::NeedsLayout && self.kind[i] == NodeKind::Container {
            let policy = self.layout_policy[i].clone();
            let policy: &dyn LayoutPolicy = policy.as_deref().unwrap_or(&DEFAULT_LAYOUT);
            policy.layout_children(&mut LayoutContext::new(self, idx));
        }
        let kids = self.children[i].clone();
        for c in kids {
            if self.kind[c as usize] != NodeKind::Leaf {
                self.layout_at(c);
            }
        }
        let sub = self.sub_root[i];
        if sub != INVALID {
            self.layout_at(sub);
        }
        self.layout_flag[i] = LayoutFlag::Clean;
        self.performing_layout[i] = false;
    }

    // -- Size queries --

    pub(crate) fn pref_size_at(&mut self, idx: u32) -> Size {
        let i = idx as usize;
        let explicit = (
            self.explicit(idx, PropertyId::PREF_WIDTH),
            self.explicit(idx, PropertyId::PREF_HEIGHT),
        );
        if let (Some(w), Some(h)) = explicit {
            return Size::new(w, h);
        }
        let computed = match self.kind[i] {
            NodeKind::Leaf | NodeKind::SubScene => self.size[i],
            NodeKind::Container => {
                if let Some(s) = self.size_cache[i].pref {
                    s
                } else {
                    let content = self.with_policy(idx, |p, cx| p.pref_size(cx));
                    let s = Self::pad(content, self.padding_at(idx));
                    self.size_cache[i].pref = Some(s);
                    s
                }
            }
        };
        Size::new(
            explicit.0.unwrap_or(computed.width),
            explicit.1.unwrap_or(computed.height),
        )
    }

    pub(crate) fn min_size_at(&mut self, idx: u32) -> Size {
        let i = idx as usize;
        match self.kind[i] {
            NodeKind::Container => {
                if let Some(s) = self.size_cache[i].min {
                    return s;
                }
                let content = self.with_policy(idx, |p, cx| p.min_size(cx));
                let s = Self::pad(content, self.padding_at(idx));
                self.size_cache[i].min = Some(s);
                s
            }
            _ if self.resizable[i] => Size::ZERO,
            _ => self.pref_size_at(idx),
        }
    }

    pub(crate) fn max_size_at(&mut self, idx: u32) -> Size {
        let i = idx as usize;
        match self.kind[i] {
            NodeKind::Container => {
                if let Some(s) = self.size_cache[i].max {
                    return s;
                }
                let content = self.with_policy(idx, |p, cx| p.max_size(cx));
                let s = Self::pad(content, self.padding_at(idx));
                self.size_cache[i].max = Some(s);
                s
            }
            _ if self.resizable[i] => Size::new(f64::INFINITY, f64::INFINITY),
            _ => self.pref_size_at(idx),
        }
    }

    /// The resolved `padding` of a node.
    pub(crate) fn padding_at(&self, idx: u32) -> Insets {
        self.props[idx as usize]
            .get(PropertyId::PADDING)
            .and_then(|slot| slot.value.as_insets())
            .unwrap_or(Insets::ZERO)
    }

    fn explicit(&self, idx: u32, prop: PropertyId) -> Option<f64> {
        self.props[idx as usize]
            .get(prop)
            .and_then(|slot| slot.value.as_number())
            .filter(|v| *v >= 0.0)
    }

    fn with_policy<R>(
        &mut self,
        idx: u32,
        f: impl FnOnce(&dyn LayoutPolicy, &mut LayoutContext<'_>) -> R,
    ) -> R {
        let policy = self.layout_policy[idx as usize].clone();
        let policy: &dyn LayoutPolicy = policy.as_deref().unwrap_or(&DEFAULT_LAYOUT);
        f(policy, &mut LayoutContext::new(self, idx))
    }

    fn pad(content: Size, padding: Insets) -> Size {
        Size::new(
            content.width + padding.x_value(),
            content.height + padding.y_value(),
        )
    }
}
