// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenes: a node tree plus everything needed to pulse it.
//!
//! A [`Scene`] owns a [`NodeStore`], a [`StyleEngine`] with its
//! [`StyleSource`], scene-level properties, focus state, and layout
//! listeners. [`Scene::pulse`] runs one frame of work against a
//! [`Presenter`](crate::backend::Presenter).
//!
//! # Threading
//!
//! A scene is driven from one application thread. After
//! [`attach`](Scene::attach), mutating entry points called from any other
//! thread fail with [`SceneError::WrongThread`] unless the caller holds an
//! [`AccessGuard`] from [`Scene::allow_access`]. Nothing is locked; the check
//! happens at entry.

mod access;
mod config;
mod focus;
mod props;
mod pulse;

use std::thread::{self, ThreadId};

use kurbo::Size;
use log::debug;
use smallvec::SmallVec;
use smol_str::SmolStr;

pub use access::AccessGuard;
pub use config::SceneConfig;
pub use props::{Camera, Light, SceneDirty, SceneProps, SceneUpdate};
pub use pulse::PulseReport;

use crate::css::{
    Color, ComputedValue, PropertyEffects, PropertyId, SheetId, StyleEngine, StyleManager,
    StyleOrigin, StyleSource, Stylesheet, compose, extract,
};
use crate::error::{SceneError, StyleError, TreeError};
use crate::node::{CssFlag, INVALID, NodeId, NodeStore};
use crate::time::PulseClock;

/// Callback run against the tree before or after layout.
pub type LayoutListener = Box<dyn FnMut(&mut NodeStore) + Send>;

/// Handle for removing a layout listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// A node tree with styles, focus, and a pulse.
pub struct Scene<S: StyleSource = StyleManager> {
    pub(crate) store: NodeStore,
    pub(crate) styles: StyleEngine,
    pub(crate) source: S,
    pub(crate) root: Option<NodeId>,
    pub(crate) config: SceneConfig,
    pub(crate) props: SceneProps,
    pub(crate) dirty: SceneDirty,
    pub(crate) focus: Option<NodeId>,
    pub(crate) focus_path: Vec<NodeId>,
    pub(crate) initial_focus: Option<NodeId>,
    pub(crate) focus_dirty: bool,
    pub(crate) pre_layout: Vec<(ListenerId, LayoutListener)>,
    pub(crate) post_layout: Vec<(ListenerId, LayoutListener)>,
    next_listener: u32,
    pub(crate) clock: PulseClock,
    pub(crate) pulse_index: u64,
    pub(crate) synced_once: bool,
    pub(crate) owner: Option<ThreadId>,
    pub(crate) access_depth: u32,
}

impl<S: StyleSource + core::fmt::Debug> core::fmt::Debug for Scene<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("nodes", &self.store.node_count())
            .field("source", &self.source)
            .field("config", &self.config)
            .field("dirty", &self.dirty)
            .field("focus", &self.focus)
            .field("pulse_index", &self.pulse_index)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl Scene<StyleManager> {
    /// Creates an empty scene styled by a [`StyleManager`].
    #[must_use]
    pub fn new(config: SceneConfig) -> Self {
        Self::with_source(config, StyleManager::new())
    }

    /// Adds a global stylesheet and schedules a full reapply.
    pub fn add_stylesheet(&mut self, sheet: Stylesheet) -> Result<SheetId, SceneError> {
        self.check_thread()?;
        let id = self.source.add_stylesheet(sheet);
        self.styles_changed(None);
        Ok(id)
    }

    /// Adds a stylesheet that applies only within `scope`'s subtree.
    pub fn add_scoped_stylesheet(
        &mut self,
        scope: NodeId,
        sheet: Stylesheet,
    ) -> Result<SheetId, SceneError> {
        self.check_thread()?;
        self.store.check(scope)?;
        let id = self.source.add_scoped_stylesheet(scope, sheet);
        self.styles_changed(Some(scope));
        Ok(id)
    }

    /// Removes a stylesheet. Returns whether it was registered.
    pub fn remove_stylesheet(&mut self, id: SheetId) -> Result<bool, SceneError> {
        self.check_thread()?;
        let removed = self.source.remove_stylesheet(id);
        if removed {
            self.styles_changed(None);
        }
        Ok(removed)
    }

    /// Drops the stylesheets scoped to `scope`.
    pub fn forget_scope(&mut self, scope: NodeId) -> Result<bool, SceneError> {
        self.check_thread()?;
        let forgotten = self.source.forget(scope);
        if forgotten {
            let scope = self.store.is_alive(scope).then_some(scope);
            self.styles_changed(scope);
        }
        Ok(forgotten)
    }
}

impl<S: StyleSource> Scene<S> {
    /// Creates an empty scene styled by `source`.
    #[must_use]
    pub fn with_source(config: SceneConfig, source: S) -> Self {
        Self {
            store: NodeStore::with_config(config.tree()),
            styles: StyleEngine::new(),
            source,
            root: None,
            config,
            props: SceneProps::default(),
            dirty: SceneDirty::empty(),
            focus: None,
            focus_path: Vec::new(),
            initial_focus: None,
            focus_dirty: false,
            pre_layout: Vec::new(),
            post_layout: Vec::new(),
            next_listener: 0,
            clock: PulseClock::new(),
            pulse_index: 0,
            synced_once: false,
            owner: None,
            access_depth: 0,
        }
    }

    // -- Tree access --

    /// Read access to the node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeStore {
        &self.store
    }

    /// Write access to the node tree, subject to the thread check.
    pub fn tree_mut(&mut self) -> Result<&mut NodeStore, SceneError> {
        self.check_thread()?;
        Ok(&mut self.store)
    }

    /// The style engine.
    #[must_use]
    pub fn styles(&self) -> &StyleEngine {
        &self.styles
    }

    /// Mutable access to the style engine. Registering properties drops the
    /// shared caches, so the whole scene is reapplied.
    pub fn styles_mut(&mut self) -> Result<&mut StyleEngine, SceneError> {
        self.check_thread()?;
        if let Some(root) = self.root {
            self.store.request_css_reapply(root);
        }
        Ok(&mut self.styles)
    }

    /// The style source.
    #[must_use]
    pub fn style_source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the style source. Call
    /// [`invalidate_styles`](Self::invalidate_styles) after changing what it
    /// returns.
    pub fn style_source_mut(&mut self) -> Result<&mut S, SceneError> {
        self.check_thread()?;
        Ok(&mut self.source)
    }

    /// Drops caches the source no longer vouches for and schedules a reapply
    /// of `scope` (or the whole scene).
    pub fn invalidate_styles(&mut self, scope: Option<NodeId>) -> Result<(), SceneError> {
        self.check_thread()?;
        if let Some(scope) = scope {
            self.store.check(scope)?;
        }
        self.styles_changed(scope);
        Ok(())
    }

    fn styles_changed(&mut self, scope: Option<NodeId>) {
        let dropped = self.styles.prune(&self.source);
        debug!("style source changed, dropped {dropped} shared caches");
        if let Some(node) = scope.or(self.root) {
            self.store.request_css_reapply(node);
        }
    }

    /// The configuration the scene was created with.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    // -- Root and scene properties --

    /// The root node, if any.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Replaces the root node.
    ///
    /// The new root must be parentless and not embedded in a sub-scene. Its
    /// subtree joins the scene and is fully styled, laid out, and synced by
    /// the next pulse.
    pub fn set_root(&mut self, root: Option<NodeId>) -> Result<(), SceneError> {
        self.check_thread()?;
        if let Some(id) = root {
            let idx = self.store.check(id)?;
            if self.root == Some(id) {
                return Ok(());
            }
            let i = idx as usize;
            if self.store.parent[i] != INVALID || self.store.host[i] != INVALID {
                return Err(TreeError::StillLinked(id).into());
            }
            if self.store.clip_owner[i] != INVALID {
                return Err(TreeError::ClipConflict {
                    child: id,
                    owner: self.store.handle(self.store.clip_owner[i]),
                }
                .into());
            }
        }
        if let Some(old) = self.root.take()
            && self.store.is_alive(old)
        {
            self.store.unmark_scene_root(old.idx);
        }
        self.root = root;
        if let Some(id) = root {
            self.store.mark_scene_root(id.idx);
            self.fit_root();
        }
        self.focus_dirty = true;
        self.mark_dirty(SceneDirty::ROOT);
        Ok(())
    }

    /// Scene-level properties.
    #[must_use]
    pub fn props(&self) -> &SceneProps {
        &self.props
    }

    /// Sets the background fill.
    pub fn set_fill(&mut self, fill: Color) -> Result<(), SceneError> {
        self.check_thread()?;
        if self.props.fill != fill {
            self.props.fill = fill;
            self.mark_dirty(SceneDirty::FILL);
        }
        Ok(())
    }

    /// Sets the camera.
    pub fn set_camera(&mut self, camera: Camera) -> Result<(), SceneError> {
        self.check_thread()?;
        if self.props.camera != camera {
            self.props.camera = camera;
            self.mark_dirty(SceneDirty::CAMERA);
        }
        Ok(())
    }

    /// Sets the cursor. `None` restores the platform default.
    pub fn set_cursor(&mut self, cursor: Option<&str>) -> Result<(), SceneError> {
        self.check_thread()?;
        let cursor = cursor.map(SmolStr::new);
        if self.props.cursor != cursor {
            self.props.cursor = cursor;
            self.mark_dirty(SceneDirty::CURSOR);
        }
        Ok(())
    }

    /// Adds a light.
    pub fn add_light(&mut self, light: Light) -> Result<(), SceneError> {
        self.check_thread()?;
        self.props.lights.push(light);
        self.mark_dirty(SceneDirty::LIGHTS);
        Ok(())
    }

    /// Removes every light.
    pub fn clear_lights(&mut self) -> Result<(), SceneError> {
        self.check_thread()?;
        if !self.props.lights.is_empty() {
            self.props.lights.clear();
            self.mark_dirty(SceneDirty::LIGHTS);
        }
        Ok(())
    }

    /// Sets the surface size. A resizable root is resized to match.
    pub fn set_size(&mut self, size: Size) -> Result<(), SceneError> {
        self.check_thread()?;
        if self.props.size != size {
            self.props.size = size;
            self.fit_root();
            self.mark_dirty(SceneDirty::ROOT);
        }
        Ok(())
    }

    fn fit_root(&mut self) {
        if let Some(root) = self.root
            && self.store.is_resizable(root)
            && self.props.size != Size::ZERO
        {
            self.store.set_size(root, self.props.size);
        }
    }

    /// Scene-level concerns waiting for the next sync.
    #[must_use]
    pub fn dirty(&self) -> SceneDirty {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self, bits: SceneDirty) {
        self.dirty |= bits;
        self.store.request_pulse();
    }

    // -- Properties --

    /// Sets a property from application code.
    ///
    /// The value is stored with [`StyleOrigin::User`]: user-agent
    /// stylesheets no longer override it, author stylesheets still do.
    /// Setting a component such as `padding-left` or `font-size` also
    /// updates its shorthand, and setting a shorthand updates the components
    /// already stored. Returns whether the stored value changed.
    pub fn set_property(
        &mut self,
        node: NodeId,
        prop: PropertyId,
        value: ComputedValue,
    ) -> Result<bool, SceneError> {
        self.check_thread()?;
        let idx = self.store.check(node)?;
        let registry = self.styles.registry();
        if usize::from(prop.index()) >= registry.len() {
            return Err(StyleError::UnknownProperty(SmolStr::new(format!("{prop:?}"))).into());
        }
        let def = registry.def(prop);
        def.validate(&value)?;

        let mut linked: SmallVec<[(PropertyId, ComputedValue, PropertyEffects); 4]> =
            SmallVec::new();
        if let Some(whole) = def.shorthand {
            let whole_def = registry.def(whole);
            let mut composed = self.effective_value(idx, whole);
            if let Some(k) = whole_def.sub_properties.iter().position(|&s| s == prop)
                && compose(&mut composed, k, &value)
            {
                linked.push((whole, composed, whole_def.effects));
            }
        } else {
            for (k, &sub) in def.sub_properties.iter().enumerate() {
                if self.store.props[idx as usize].get(sub).is_some()
                    && let Some(part) = extract(&value, k)
                {
                    linked.push((sub, part, registry.def(sub).effects));
                }
            }
        }

        let effects = def.effects;
        let changed = self.store_user_value(idx, prop, value, effects);
        for (id, value, effects) in linked {
            self.store_user_value(idx, id, value, effects);
        }
        Ok(changed)
    }

    /// Writes a user value. A changed font becomes the node's effective font
    /// and restyles its children.
    fn store_user_value(
        &mut self,
        idx: u32,
        prop: PropertyId,
        value: ComputedValue,
        effects: PropertyEffects,
    ) -> bool {
        let font = value.as_font().cloned();
        let changed = self
            .store
            .set_property_at(idx, prop, value, StyleOrigin::User, effects);
        if changed && effects.contains(PropertyEffects::FONT) {
            if let Some(font) = font
                && let Some(helper) = self.store.helper[idx as usize].as_mut()
            {
                helper.font = font;
            }
            let kids = self.store.children[idx as usize].clone();
            for c in kids {
                self.store.mark_css(c, CssFlag::Update);
            }
        }
        changed
    }

    /// The value a property holds on a node: its slot, the effective font
    /// for an unset `font`, or the initial value.
    fn effective_value(&self, idx: u32, prop: PropertyId) -> ComputedValue {
        if let Some(slot) = self.store.props[idx as usize].get(prop) {
            return slot.value.clone();
        }
        if prop == PropertyId::FONT
            && let Some(helper) = self.store.helper[idx as usize].as_ref()
        {
            return ComputedValue::Font(helper.font.clone());
        }
        self.styles.registry().def(prop).initial.clone()
    }

    /// [`set_property`](Self::set_property) by property name.
    pub fn set_property_by_name(
        &mut self,
        node: NodeId,
        name: &str,
        value: ComputedValue,
    ) -> Result<bool, SceneError> {
        let prop = self
            .styles
            .registry()
            .id(name)
            .ok_or_else(|| StyleError::UnknownProperty(SmolStr::new(name)))?;
        self.set_property(node, prop, value)
    }

    /// A property's current value and origin.
    ///
    /// Unset properties report the registry's initial value and no origin.
    /// Returns `None` for a property the registry does not know.
    #[must_use]
    pub fn property(
        &self,
        node: NodeId,
        prop: PropertyId,
    ) -> Option<(ComputedValue, Option<StyleOrigin>)> {
        if let Some(slot) = self.store.property(node, prop) {
            return Some((slot.value.clone(), Some(slot.origin)));
        }
        let registry = self.styles.registry();
        (usize::from(prop.index()) < registry.len())
            .then(|| (registry.def(prop).initial.clone(), None))
    }

    // -- Listeners --

    /// Adds a callback that runs after styles and before layout in every
    /// pulse. It may mutate the tree.
    pub fn add_pre_layout_listener(
        &mut self,
        f: impl FnMut(&mut NodeStore) + Send + 'static,
    ) -> Result<ListenerId, SceneError> {
        self.check_thread()?;
        let id = self.next_listener_id();
        self.pre_layout.push((id, Box::new(f)));
        Ok(id)
    }

    /// Adds a callback that runs after layout in every pulse. Changes it
    /// makes are styled and laid out by the next pulse.
    pub fn add_post_layout_listener(
        &mut self,
        f: impl FnMut(&mut NodeStore) + Send + 'static,
    ) -> Result<ListenerId, SceneError> {
        self.check_thread()?;
        let id = self.next_listener_id();
        self.post_layout.push((id, Box::new(f)));
        Ok(id)
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> Result<bool, SceneError> {
        self.check_thread()?;
        let before = self.pre_layout.len() + self.post_layout.len();
        self.pre_layout.retain(|(l, _)| *l != id);
        self.post_layout.retain(|(l, _)| *l != id);
        Ok(before != self.pre_layout.len() + self.post_layout.len())
    }

    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    /// Installs the callback raised when the scene first needs a pulse.
    ///
    /// See [`NodeStore::set_pulse_signal`].
    pub fn set_pulse_signal(
        &mut self,
        signal: Option<Box<dyn FnMut() + Send>>,
    ) -> Result<(), SceneError> {
        self.check_thread()?;
        self.store.set_pulse_signal(signal);
        Ok(())
    }

    // -- Threading --

    /// Binds the scene to the calling thread, as when it is shown on a
    /// surface.
    pub fn attach(&mut self) {
        self.owner = Some(thread::current().id());
    }

    /// Releases the thread binding.
    pub fn detach(&mut self) {
        self.owner = None;
    }

    /// Whether the scene is bound to a thread.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    /// Fails with [`SceneError::WrongThread`] if the calling thread may not
    /// mutate the scene.
    pub fn check_thread(&self) -> Result<(), SceneError> {
        if !self.config.enforce_thread || self.access_depth > 0 {
            return Ok(());
        }
        match self.owner {
            Some(owner) if owner != thread::current().id() => Err(SceneError::WrongThread),
            _ => Ok(()),
        }
    }
}
