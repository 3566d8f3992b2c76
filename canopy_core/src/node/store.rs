// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, property, and style state.

use std::sync::Arc;

use kurbo::{Point, Size};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use smol_str::SmolStr;
use understory_dirty::{Channel, CycleHandling, DirtyTracker};

use super::flags::{CssFlag, LayoutFlag, TreeConfig};
use super::id::{INVALID, NodeId};
use super::kind::NodeKind;
use super::traverse::Children;
use crate::bounds::{BoundsCache, BoundsStats};
use crate::css::{
    ComputedValue, PropertyEffects, PropertyId, PropertyValues, PseudoClass, PseudoClassSet,
    Slot, StyleHelper, StyleOrigin,
};
use crate::dirty;
use crate::error::TreeError;
use crate::layout::{LayoutPolicy, SizeCache};
use crate::transform::Transform3d;

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Read accessors panic on a stale handle. Structural mutations report one
/// as [`TreeError::StaleNode`] instead, since a dead child handle is the
/// tree's rendition of a null child.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,
    pub(crate) child_set: Vec<FxHashSet<u32>>,
    /// For an embedded root, the sub-scene node hosting it.
    pub(crate) host: Vec<u32>,
    /// For a sub-scene node, the root it embeds.
    pub(crate) sub_root: Vec<u32>,
    pub(crate) in_scene: Vec<bool>,
    pub(crate) scene_root: Vec<bool>,
    pub(crate) clip: Vec<u32>,
    pub(crate) clip_owner: Vec<u32>,

    // -- Geometry --
    pub(crate) transform: Vec<Transform3d>,
    pub(crate) position: Vec<Point>,
    pub(crate) size: Vec<Size>,
    pub(crate) resizable: Vec<bool>,
    pub(crate) managed: Vec<bool>,
    pub(crate) visible: Vec<bool>,
    pub(crate) view_order: Vec<f64>,
    pub(crate) bounds: Vec<BoundsCache>,
    pub(crate) bounds_changed: Vec<bool>,
    pub(crate) bounds_stats: BoundsStats,
    /// Parentless nodes whose bounds are flagged; refreshed by the pulse.
    pub(crate) bounds_roots: Vec<u32>,
    pub(crate) removed: Vec<Vec<u32>>,
    pub(crate) removed_overflow: Vec<bool>,

    // -- Layout --
    pub(crate) layout_flag: Vec<LayoutFlag>,
    pub(crate) performing_layout: Vec<bool>,
    pub(crate) layout_policy: Vec<Option<Arc<dyn LayoutPolicy>>>,
    pub(crate) size_cache: Vec<SizeCache>,
    pub(crate) layout_roots: Vec<u32>,

    // -- Style --
    pub(crate) css_flag: Vec<CssFlag>,
    pub(crate) pseudo: Vec<PseudoClassSet>,
    pub(crate) style_classes: Vec<SmallVec<[SmolStr; 2]>>,
    pub(crate) style_id: Vec<Option<SmolStr>>,
    pub(crate) style_type: Vec<SmolStr>,
    pub(crate) inline_style: Vec<Option<SmolStr>>,
    pub(crate) helper: Vec<Option<StyleHelper>>,
    pub(crate) props: Vec<PropertyValues>,

    // -- Focus --
    pub(crate) focus_traversable: Vec<bool>,
    pub(crate) disabled: Vec<bool>,

    // -- Sync --
    pub(crate) has_peer: Vec<bool>,
    pub(crate) pending_released: Vec<u32>,
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) sync_pending: bool,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Scheduling --
    pub(crate) pulse_requested: bool,
    pub(crate) pulse_signal: Option<PulseSignal>,
    pub(crate) config: TreeConfig,
}

/// Callback raised when the store first needs a pulse.
pub(crate) struct PulseSignal(Box<dyn FnMut() + Send>);

impl core::fmt::Debug for PulseSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PulseSignal").finish_non_exhaustive()
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty store with the default [`TreeConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Creates an empty store.
    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            kind: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            child_set: Vec::new(),
            host: Vec::new(),
            sub_root: Vec::new(),
            in_scene: Vec::new(),
            scene_root: Vec::new(),
            clip: Vec::new(),
            clip_owner: Vec::new(),
            transform: Vec::new(),
            position: Vec::new(),
            size: Vec::new(),
            resizable: Vec::new(),
            managed: Vec::new(),
            visible: Vec::new(),
            view_order: Vec::new(),
            bounds: Vec::new(),
            bounds_changed: Vec::new(),
            bounds_stats: BoundsStats::default(),
            bounds_roots: Vec::new(),
            removed: Vec::new(),
            removed_overflow: Vec::new(),
            layout_flag: Vec::new(),
            performing_layout: Vec::new(),
            layout_policy: Vec::new(),
            size_cache: Vec::new(),
            layout_roots: Vec::new(),
            css_flag: Vec::new(),
            pseudo: Vec::new(),
            style_classes: Vec::new(),
            style_id: Vec::new(),
            style_type: Vec::new(),
            inline_style: Vec::new(),
            helper: Vec::new(),
            props: Vec::new(),
            focus_traversable: Vec::new(),
            disabled: Vec::new(),
            has_peer: Vec::new(),
            pending_released: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            sync_pending: false,
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            pulse_requested: false,
            pulse_signal: None,
            config,
        }
    }

    /// Returns the tree configuration.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // -- Allocation API --

    /// Creates a detached node of the given kind and returns its handle.
    ///
    /// The node starts visible, managed, resizable, with an identity
    /// transform, zero size, and no style state.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.kind[i] = kind;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.child_set[i].clear();
            self.host[i] = INVALID;
            self.sub_root[i] = INVALID;
            self.in_scene[i] = false;
            self.scene_root[i] = false;
            self.clip[i] = INVALID;
            self.clip_owner[i] = INVALID;
            self.transform[i] = Transform3d::IDENTITY;
            self.position[i] = Point::ZERO;
            self.size[i] = Size::ZERO;
            self.resizable[i] = true;
            self.managed[i] = true;
            self.visible[i] = true;
            self.view_order[i] = 0.0;
            self.bounds[i] = BoundsCache::default();
            self.bounds_changed[i] = false;
            self.removed[i].clear();
            self.removed_overflow[i] = false;
            self.layout_flag[i] = LayoutFlag::NeedsLayout;
            self.performing_layout[i] = false;
            self.layout_policy[i] = None;
            self.size_cache[i] = SizeCache::default();
            self.css_flag[i] = CssFlag::Reapply;
            self.pseudo[i] = PseudoClassSet::new();
            self.style_classes[i].clear();
            self.style_id[i] = None;
            self.style_type[i] = SmolStr::new_static(kind.type_name());
            self.inline_style[i] = None;
            self.helper[i] = None;
            self.props[i].clear();
            self.focus_traversable[i] = false;
            self.disabled[i] = false;
            self.has_peer[i] = false;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.kind.push(kind);
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.child_set.push(FxHashSet::default());
            self.host.push(INVALID);
            self.sub_root.push(INVALID);
            self.in_scene.push(false);
            self.scene_root.push(false);
            self.clip.push(INVALID);
            self.clip_owner.push(INVALID);
            self.transform.push(Transform3d::IDENTITY);
            self.position.push(Point::ZERO);
            self.size.push(Size::ZERO);
            self.resizable.push(true);
            self.managed.push(true);
            self.visible.push(true);
            self.view_order.push(0.0);
            self.bounds.push(BoundsCache::default());
            self.bounds_changed.push(false);
            self.removed.push(Vec::new());
            self.removed_overflow.push(false);
            self.layout_flag.push(LayoutFlag::NeedsLayout);
            self.performing_layout.push(false);
            self.layout_policy.push(None);
            self.size_cache.push(SizeCache::default());
            self.css_flag.push(CssFlag::Reapply);
            self.pseudo.push(PseudoClassSet::new());
            self.style_classes.push(SmallVec::new());
            self.style_id.push(None);
            self.style_type.push(SmolStr::new_static(kind.type_name()));
            self.inline_style.push(None);
            self.helper.push(None);
            self.props.push(PropertyValues::default());
            self.focus_traversable.push(false);
            self.disabled.push(false);
            self.has_peer.push(false);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a detached node, freeing its slot for reuse.
    ///
    /// The node must have no parent, no children, no clip relationship, and
    /// no sub-scene relationship. Its render peer, if any, is released by
    /// the next pulse.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        let idx = self.check(id)?;
        let i = idx as usize;
        if self.parent[i] != INVALID
            || !self.children[i].is_empty()
            || self.clip[i] != INVALID
            || self.clip_owner[i] != INVALID
            || self.host[i] != INVALID
            || self.sub_root[i] != INVALID
            || self.scene_root[i]
        {
            return Err(TreeError::StillLinked(id));
        }

        self.dirty.remove_key(idx);
        if self.has_peer[i] {
            self.pending_released.push(idx);
            self.has_peer[i] = false;
            self.request_pulse();
        }
        self.helper[i] = None;
        self.layout_policy[i] = None;
        self.layout_roots.retain(|&r| r != idx);
        self.bounds_roots.retain(|&r| r != idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;
        self.free_list.push(idx);
        Ok(())
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns the handle for a live slot index, if any.
    #[must_use]
    pub fn node_at(&self, idx: u32) -> Option<NodeId> {
        (idx < self.len && self.alive[idx as usize]).then(|| self.handle(idx))
    }

    // -- Topology getters --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_handle(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the children of a node, in list order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, &self.children[id.idx as usize])
    }

    /// Number of children of a node.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.validate(id);
        self.children[id.idx as usize].len()
    }

    /// Returns the children sorted by ascending view order. Ties keep list
    /// order.
    #[must_use]
    pub fn view_ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        let mut kids = self.children[id.idx as usize].clone();
        kids.sort_by(|a, b| {
            self.view_order[*a as usize].total_cmp(&self.view_order[*b as usize])
        });
        kids.into_iter().map(|c| self.handle(c)).collect()
    }

    /// Whether the node is part of a scene (a scene root or a descendant of
    /// one, including through sub-scenes).
    #[must_use]
    pub fn is_in_scene(&self, id: NodeId) -> bool {
        self.validate(id);
        self.in_scene[id.idx as usize]
    }

    /// Returns the node clipping `id`, if any.
    #[must_use]
    pub fn clip(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_handle(self.clip[id.idx as usize])
    }

    /// Returns the root embedded by a sub-scene node.
    #[must_use]
    pub fn sub_scene_root(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_handle(self.sub_root[id.idx as usize])
    }

    /// Returns the sub-scene node hosting an embedded root.
    #[must_use]
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_handle(self.host[id.idx as usize])
    }

    /// Children removed since the last sync, and whether the list
    /// overflowed.
    #[must_use]
    pub fn removed_children(&self, id: NodeId) -> (&[u32], bool) {
        self.validate(id);
        let i = id.idx as usize;
        (&self.removed[i], self.removed_overflow[i])
    }

    // -- Geometry getters --

    /// Returns the local transform.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Transform3d {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Returns the layout position within the parent.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Point {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the current size.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Size {
        self.validate(id);
        self.size[id.idx as usize]
    }

    /// Whether layout may resize the node.
    #[must_use]
    pub fn is_resizable(&self, id: NodeId) -> bool {
        self.validate(id);
        self.resizable[id.idx as usize]
    }

    /// Whether the parent's layout positions and sizes the node.
    #[must_use]
    pub fn is_managed(&self, id: NodeId) -> bool {
        self.validate(id);
        self.managed[id.idx as usize]
    }

    /// Whether the node is visible.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the view order override.
    #[must_use]
    pub fn view_order(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.view_order[id.idx as usize]
    }

    /// Returns the bounds refresh counters.
    #[must_use]
    pub fn bounds_stats(&self) -> BoundsStats {
        self.bounds_stats
    }

    // -- Geometry mutation --

    /// Sets the local transform.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform3d) {
        self.validate(id);
        let idx = id.idx;
        if self.transform[idx as usize] == transform {
            return;
        }
        self.transform[idx as usize] = transform;
        self.mark_sync(idx, dirty::GEOMETRY);
        self.mark_bounds_changed(idx);
    }

    /// Moves the node within its parent.
    pub fn relocate(&mut self, id: NodeId, position: Point) {
        self.validate(id);
        self.set_position_at(id.idx, position);
    }

    /// Resizes the node and requests layout where the new size matters.
    pub fn set_size(&mut self, id: NodeId, size: Size) {
        self.validate(id);
        let idx = id.idx;
        if self.resize_at(idx, size) {
            self.request_layout_at(idx);
            self.request_parent_layout_at(idx);
        }
    }

    /// Sets whether layout may resize the node.
    pub fn set_resizable(&mut self, id: NodeId, resizable: bool) {
        self.validate(id);
        if self.resizable[id.idx as usize] != resizable {
            self.resizable[id.idx as usize] = resizable;
            self.request_parent_layout_at(id.idx);
        }
    }

    /// Sets whether the parent's layout manages the node.
    ///
    /// An unmanaged node becomes its own layout root.
    pub fn set_managed(&mut self, id: NodeId, managed: bool) {
        self.validate(id);
        let idx = id.idx;
        if self.managed[idx as usize] == managed {
            return;
        }
        self.request_parent_layout_at(idx);
        self.managed[idx as usize] = managed;
        self.request_parent_layout_at(idx);
        if self.layout_flag[idx as usize] != LayoutFlag::Clean {
            self.request_layout_at(idx);
        }
    }

    /// Shows or hides the node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        self.set_visible_at(id.idx, visible);
    }

    /// Sets the view order override. Lower values are rendered first.
    pub fn set_view_order(&mut self, id: NodeId, order: f64) {
        self.validate(id);
        let idx = id.idx;
        if self.view_order[idx as usize] == order {
            return;
        }
        self.view_order[idx as usize] = order;
        let p = self.parent[idx as usize];
        if p != INVALID {
            self.mark_sync(p, dirty::CHILDREN);
        }
    }

    /// Sets the preferred size as a runtime property value.
    ///
    /// Negative components mean "computed by layout".
    pub fn set_pref_size(&mut self, id: NodeId, size: Size) {
        self.validate(id);
        let effects = PropertyEffects::LAYOUT | PropertyEffects::PAINT;
        self.set_property_at(
            id.idx,
            PropertyId::PREF_WIDTH,
            ComputedValue::Number(size.width),
            StyleOrigin::User,
            effects,
        );
        self.set_property_at(
            id.idx,
            PropertyId::PREF_HEIGHT,
            ComputedValue::Number(size.height),
            StyleOrigin::User,
            effects,
        );
    }

    // -- Style state --

    /// Returns the pseudo-class state of a node.
    #[must_use]
    pub fn pseudo_classes(&self, id: NodeId) -> &PseudoClassSet {
        self.validate(id);
        &self.pseudo[id.idx as usize]
    }

    /// Turns a pseudo-class on or off.
    ///
    /// The node is only scheduled for restyling if some selector that can
    /// match it or its descendants mentions the pseudo-class.
    pub fn set_pseudo_class(&mut self, id: NodeId, pc: impl Into<PseudoClass>, active: bool) {
        self.validate(id);
        let idx = id.idx;
        let pc = pc.into();
        let changed = if active {
            self.pseudo[idx as usize].insert(pc.clone())
        } else {
            self.pseudo[idx as usize].remove(&pc)
        };
        if !changed {
            return;
        }
        let triggered = self.helper[idx as usize]
            .as_ref()
            .is_some_and(|h| h.triggers.contains(&pc));
        if triggered {
            self.mark_css(idx, CssFlag::Update);
        }
    }

    /// Returns the style classes of a node.
    #[must_use]
    pub fn style_classes(&self, id: NodeId) -> &[SmolStr] {
        self.validate(id);
        &self.style_classes[id.idx as usize]
    }

    /// Replaces the style classes of a node.
    pub fn set_style_classes<I, S>(&mut self, id: NodeId, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.validate(id);
        let idx = id.idx;
        let classes: SmallVec<[SmolStr; 2]> = classes.into_iter().map(Into::into).collect();
        if self.style_classes[idx as usize] != classes {
            self.style_classes[idx as usize] = classes;
            self.mark_css(idx, CssFlag::Reapply);
        }
    }

    /// Adds one style class. Returns whether it was newly added.
    pub fn add_style_class(&mut self, id: NodeId, class: impl Into<SmolStr>) -> bool {
        self.validate(id);
        let idx = id.idx;
        let class = class.into();
        if self.style_classes[idx as usize].contains(&class) {
            return false;
        }
        self.style_classes[idx as usize].push(class);
        self.mark_css(idx, CssFlag::Reapply);
        true
    }

    /// Removes one style class. Returns whether it was present.
    pub fn remove_style_class(&mut self, id: NodeId, class: &str) -> bool {
        self.validate(id);
        let idx = id.idx;
        let list = &mut self.style_classes[idx as usize];
        let Some(pos) = list.iter().position(|c| c == class) else {
            return false;
        };
        list.remove(pos);
        self.mark_css(idx, CssFlag::Reapply);
        true
    }

    /// Returns the style id of a node.
    #[must_use]
    pub fn style_id(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.style_id[id.idx as usize].as_deref()
    }

    /// Sets the style id (`#id` selectors).
    pub fn set_style_id(&mut self, id: NodeId, style_id: Option<&str>) {
        self.validate(id);
        let idx = id.idx;
        let new = style_id.map(SmolStr::new);
        if self.style_id[idx as usize] != new {
            self.style_id[idx as usize] = new;
            self.mark_css(idx, CssFlag::Reapply);
        }
    }

    /// Returns the type selector name of a node.
    #[must_use]
    pub fn style_type(&self, id: NodeId) -> &str {
        self.validate(id);
        &self.style_type[id.idx as usize]
    }

    /// Overrides the type selector name, which defaults to the node kind's
    /// name.
    pub fn set_style_type(&mut self, id: NodeId, name: &str) {
        self.validate(id);
        let idx = id.idx;
        if self.style_type[idx as usize] != name {
            self.style_type[idx as usize] = SmolStr::new(name);
            self.mark_css(idx, CssFlag::Reapply);
        }
    }

    /// Returns the inline style text.
    #[must_use]
    pub fn inline_style(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.inline_style[id.idx as usize].as_deref()
    }

    /// Sets the inline style, e.g. `"fill: red; opacity: 0.5"`.
    pub fn set_inline_style(&mut self, id: NodeId, style: Option<&str>) {
        self.validate(id);
        let idx = id.idx;
        let new = style.map(SmolStr::new);
        if self.inline_style[idx as usize] != new {
            self.inline_style[idx as usize] = new;
            self.mark_css(idx, CssFlag::Reapply);
        }
    }

    /// Returns the current slot of a property, if one is set.
    #[must_use]
    pub fn property(&self, id: NodeId, prop: PropertyId) -> Option<&Slot> {
        self.validate(id);
        self.props[id.idx as usize].get(prop)
    }

    /// Returns the CSS pass state of a node.
    #[must_use]
    pub fn css_flag(&self, id: NodeId) -> CssFlag {
        self.validate(id);
        self.css_flag[id.idx as usize]
    }

    /// Schedules a style reapply for a node and its subtree.
    pub fn request_css_reapply(&mut self, id: NodeId) {
        self.validate(id);
        self.mark_css(id.idx, CssFlag::Reapply);
    }

    // -- Focus state --

    /// Whether the node can take focus by traversal.
    #[must_use]
    pub fn is_focus_traversable(&self, id: NodeId) -> bool {
        self.validate(id);
        self.focus_traversable[id.idx as usize]
    }

    /// Sets whether the node can take focus.
    pub fn set_focus_traversable(&mut self, id: NodeId, traversable: bool) {
        self.validate(id);
        self.focus_traversable[id.idx as usize] = traversable;
        self.request_pulse();
    }

    /// Whether the node is disabled.
    #[must_use]
    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.validate(id);
        self.disabled[id.idx as usize]
    }

    /// Disables or enables a node. Disabled nodes cannot hold focus.
    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        self.validate(id);
        if self.disabled[id.idx as usize] != disabled {
            self.disabled[id.idx as usize] = disabled;
            self.set_pseudo_class(id, "disabled", disabled);
            self.request_pulse();
        }
    }

    /// Whether a node can hold focus: alive, in a scene, visible along its
    /// ancestor chain, traversable, and not disabled.
    #[must_use]
    pub fn can_focus(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let i = id.idx as usize;
        if !self.in_scene[i] || !self.focus_traversable[i] || self.disabled[i] {
            return false;
        }
        self.ancestors_inclusive(id.idx)
            .all(|a| self.visible[a as usize])
    }

    // -- Pulse signalling --

    /// Whether some change since the last pulse wants another pulse.
    #[must_use]
    pub fn pulse_requested(&self) -> bool {
        self.pulse_requested
    }

    /// Installs the callback invoked when a change first requests a pulse.
    ///
    /// The callback runs once per idle-to-requested transition; further
    /// changes before the next pulse do not call it again.
    pub fn set_pulse_signal(&mut self, signal: Option<Box<dyn FnMut() + Send>>) {
        self.pulse_signal = signal.map(PulseSignal);
    }

    pub(crate) fn request_pulse(&mut self) {
        if self.pulse_requested {
            return;
        }
        self.pulse_requested = true;
        if let Some(signal) = &mut self.pulse_signal {
            (signal.0)();
        }
    }

    // -- Raw-index helpers --

    pub(crate) fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    pub(crate) fn opt_handle(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| self.handle(idx))
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Returns the slot index of a live handle.
    pub(crate) fn check(&self, id: NodeId) -> Result<u32, TreeError> {
        if self.is_alive(id) {
            Ok(id.idx)
        } else {
            Err(TreeError::StaleNode(id))
        }
    }

    /// Marks a sync channel for one node.
    pub(crate) fn mark_sync(&mut self, idx: u32, ch: Channel) {
        self.dirty.mark(idx, ch);
        self.sync_pending = true;
        self.request_pulse();
    }

    /// Raises a node's CSS flag and flags its ancestors as dirty branches.
    pub(crate) fn mark_css(&mut self, idx: u32, flag: CssFlag) {
        if self.css_flag[idx as usize] < flag {
            self.css_flag[idx as usize] = flag;
        }
        let mut p = self.style_parent(idx);
        while p != INVALID && self.css_flag[p as usize] < CssFlag::DirtyBranch {
            self.css_flag[p as usize] = CssFlag::DirtyBranch;
            p = self.style_parent(p);
        }
        self.request_pulse();
    }

    /// The parent for cascade purposes: the tree parent, or the host of an
    /// embedded root.
    pub(crate) fn style_parent(&self, idx: u32) -> u32 {
        let p = self.parent[idx as usize];
        if p != INVALID {
            p
        } else {
            self.host[idx as usize]
        }
    }

    pub(crate) fn set_position_at(&mut self, idx: u32, position: Point) {
        if self.position[idx as usize] == position {
            return;
        }
        self.position[idx as usize] = position;
        self.mark_sync(idx, dirty::GEOMETRY);
        self.mark_bounds_changed(idx);
    }

    /// Sets the size without requesting layout. Returns whether it changed.
    ///
    /// A resized container needs its own layout pass; a resized leaf or
    /// sub-scene changes its bounds.
    pub(crate) fn resize_at(&mut self, idx: u32, size: Size) -> bool {
        let i = idx as usize;
        if self.size[i] == size {
            return false;
        }
        self.size[i] = size;
        self.mark_sync(idx, dirty::GEOMETRY);
        match self.kind[i] {
            NodeKind::Container => {
                self.layout_flag[i] = LayoutFlag::NeedsLayout;
            }
            NodeKind::Leaf => self.mark_bounds_changed(idx),
            NodeKind::SubScene => {
                self.mark_bounds_changed(idx);
                let inner = self.sub_root[i];
                if inner != INVALID && self.resizable[inner as usize] {
                    self.resize_at(inner, size);
                }
            }
        }
        true
    }

    pub(crate) fn set_visible_at(&mut self, idx: u32, visible: bool) {
        if self.visible[idx as usize] == visible {
            return;
        }
        self.visible[idx as usize] = visible;
        self.mark_sync(idx, dirty::VISIBILITY);
        self.mark_bounds_changed(idx);
    }

    /// Stores a property value and runs its side effects if it changed.
    pub(crate) fn set_property_at(
        &mut self,
        idx: u32,
        prop: PropertyId,
        value: ComputedValue,
        origin: StyleOrigin,
        effects: PropertyEffects,
    ) -> bool {
        let visible = value.as_bool();
        let changed = self.props[idx as usize].set(prop, value, origin);
        if changed {
            self.property_changed(idx, effects, visible.unwrap_or(true));
        }
        changed
    }

    /// Clears a property slot and runs its side effects.
    pub(crate) fn reset_property_at(
        &mut self,
        idx: u32,
        prop: PropertyId,
        effects: PropertyEffects,
    ) -> bool {
        let changed = self.props[idx as usize].reset(prop).is_some();
        if changed {
            self.property_changed(idx, effects, true);
        }
        changed
    }

    fn property_changed(&mut self, idx: u32, effects: PropertyEffects, visible: bool) {
        if effects.contains(PropertyEffects::PAINT) {
            self.mark_sync(idx, dirty::PROPERTIES);
        }
        if effects.contains(PropertyEffects::LAYOUT) {
            self.request_layout_at(idx);
            self.request_parent_layout_at(idx);
        }
        if effects.contains(PropertyEffects::VISIBILITY) {
            self.set_visible_at(idx, visible);
        }
    }

    /// Iterates `idx` and its ancestors, crossing into sub-scene hosts.
    pub(crate) fn ancestors_inclusive(&self, idx: u32) -> impl Iterator<Item = u32> + '_ {
        core::iter::successors((idx != INVALID).then_some(idx), move |&i| {
            let p = self.style_parent(i);
            (p != INVALID).then_some(p)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut store = NodeStore::new();
        let id = store.create_node(NodeKind::Leaf);
        assert!(store.is_alive(id));
        store.destroy_node(id).unwrap();
        assert!(!store.is_alive(id));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = NodeStore::new();
        let id1 = store.create_node(NodeKind::Leaf);
        store.destroy_node(id1).unwrap();
        let id2 = store.create_node(NodeKind::Container);
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
        assert_eq!(store.kind(id2), NodeKind::Container);
        assert_eq!(store.style_type(id2), "container");
    }

    #[test]
    fn destroy_linked_node_is_rejected() {
        let mut store = NodeStore::new();
        let parent = store.create_node(NodeKind::Container);
        let child = store.create_node(NodeKind::Leaf);
        store.add_child(parent, child).unwrap();
        assert_eq!(store.destroy_node(parent), Err(TreeError::StillLinked(parent)));
        assert_eq!(store.destroy_node(child), Err(TreeError::StillLinked(child)));
        store.remove_child(parent, child).unwrap();
        store.destroy_node(child).unwrap();
        assert_eq!(store.destroy_node(child), Err(TreeError::StaleNode(child)));
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_get() {
        let mut store = NodeStore::new();
        let id = store.create_node(NodeKind::Leaf);
        store.destroy_node(id).unwrap();
        let _ = store.transform(id);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_set() {
        let mut store = NodeStore::new();
        let id = store.create_node(NodeKind::Leaf);
        store.destroy_node(id).unwrap();
        store.set_visible(id, false);
    }

    #[test]
    fn style_class_changes_request_reapply() {
        let mut store = NodeStore::new();
        let parent = store.create_node(NodeKind::Container);
        let child = store.create_node(NodeKind::Leaf);
        store.add_child(parent, child).unwrap();
        store.css_flag.fill(CssFlag::Clean);

        assert!(store.add_style_class(child, "a"));
        assert!(!store.add_style_class(child, "a"));
        assert_eq!(store.css_flag(child), CssFlag::Reapply);
        assert_eq!(store.css_flag(parent), CssFlag::DirtyBranch);

        store.css_flag.fill(CssFlag::Clean);
        store.set_style_classes(child, ["a"]);
        assert_eq!(store.css_flag(child), CssFlag::Clean, "unchanged classes");
        assert!(store.remove_style_class(child, "a"));
        assert_eq!(store.css_flag(child), CssFlag::Reapply);
    }

    #[test]
    fn pseudo_class_without_trigger_does_not_dirty() {
        let mut store = NodeStore::new();
        let id = store.create_node(NodeKind::Leaf);
        store.css_flag.fill(CssFlag::Clean);
        store.set_pseudo_class(id, "hover", true);
        assert!(store.pseudo_classes(id).contains(&PseudoClass::new("hover")));
        assert_eq!(store.css_flag(id), CssFlag::Clean);
    }

    #[test]
    fn focus_eligibility() {
        let mut store = NodeStore::new();
        let root = store.create_node(NodeKind::Container);
        store.mark_scene_root(root.idx);
        let a = store.create_node(NodeKind::Leaf);
        store.add_child(root, a).unwrap();
        assert!(!store.can_focus(a), "not traversable");
        store.set_focus_traversable(a, true);
        assert!(store.can_focus(a));
        store.set_visible(root, false);
        assert!(!store.can_focus(a), "hidden ancestor");
        store.set_visible(root, true);
        store.set_disabled(a, true);
        assert!(!store.can_focus(a));
        assert!(store.pseudo_classes(a).contains(&PseudoClass::new("disabled")));
    }

    #[test]
    fn view_order_sorts_stably() {
        let mut store = NodeStore::new();
        let p = store.create_node(NodeKind::Container);
        let a = store.create_node(NodeKind::Leaf);
        let b = store.create_node(NodeKind::Leaf);
        let c = store.create_node(NodeKind::Leaf);
        store.set_children(p, &[a, b, c]).unwrap();
        store.set_view_order(a, 1.0);
        assert_eq!(store.view_ordered_children(p), vec![b, c, a]);
    }

    #[test]
    fn pulse_signal_fires_once_per_request() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fired = Arc::new(AtomicUsize::new(0));
        let mut store = NodeStore::new();
        let counter = Arc::clone(&fired);
        store.set_pulse_signal(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })));

        let a = store.create_node(NodeKind::Leaf);
        store.set_visible(a, false);
        store.set_visible(a, true);
        assert_eq!(fired.load(Ordering::Relaxed), 1);

        store.pulse_requested = false;
        store.set_view_order(a, 2.0);
        store.set_size(a, Size::new(1.0, 1.0));
        assert_eq!(fired.load(Ordering::Relaxed), 2);
    }
}
