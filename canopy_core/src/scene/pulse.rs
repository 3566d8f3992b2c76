// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pulse: one frame of scene work.
//!
//! Phases run in a fixed order over the whole scene, never interleaved:
//!
//! 1. **Focus**: an owner that can no longer hold focus is redirected.
//! 2. **Pre-layout** listeners run and may mutate the tree.
//! 3. **CSS**: flagged branches are restyled top-down; clean subtrees are
//!    skipped without being visited.
//! 4. **Layout**: every layout root with work is laid out.
//! 5. **Post-layout** listeners run. Their changes are picked up by the next
//!    pulse.
//! 6. **Bounds**: flagged bounds are refreshed bottom-up.
//! 7. **Sync**: under the presenter's lock, released peers are dropped,
//!    changed nodes are pushed to their peers (every node on the scene's
//!    first sync), and scene-level properties are sent if their dirty bits
//!    are set.
//!
//! A pulse with nothing to do touches no node and calls no presenter method.

use log::debug;

use super::props::SceneUpdate;
use super::{LayoutListener, ListenerId, Scene};
use crate::backend::{PeerUpdate, Presenter};
use crate::css::StyleSource;
use crate::error::SceneError;
use crate::node::{CssFlag, NodeStore, SyncChanges};
#[cfg(feature = "trace-rich")]
use crate::trace::NodeChange;
use crate::trace::{
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, PulseBeginEvent, PulseSummaryBuilder, Tracer,
};

/// What one pulse did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseReport {
    /// Pulse counter.
    pub pulse_index: u64,
    /// Whether this pulse performed the scene's first sync.
    pub first: bool,
    /// Whether the focus owner changed.
    pub focus_changed: bool,
    /// Nodes whose styles were resolved.
    pub nodes_styled: usize,
    /// Layout roots that had work.
    pub layout_roots: usize,
    /// Bounds roots refreshed.
    pub bounds_roots: usize,
    /// Peers updated.
    pub nodes_synced: usize,
    /// Peers released.
    pub peers_released: usize,
    /// Whether scene-level properties were sent.
    pub scene_synced: bool,
}

impl PulseReport {
    /// Whether the pulse did no work at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.focus_changed
            && self.nodes_styled == 0
            && self.layout_roots == 0
            && self.bounds_roots == 0
            && self.nodes_synced == 0
            && self.peers_released == 0
            && !self.scene_synced
    }
}

impl<S: StyleSource> Scene<S> {
    /// Runs one pulse, pushing changes to `presenter`.
    pub fn pulse(&mut self, presenter: &mut dyn Presenter) -> Result<PulseReport, SceneError> {
        self.pulse_traced(presenter, &mut Tracer::none())
    }

    /// Like [`pulse`](Self::pulse), reporting phases to `tracer`.
    pub fn pulse_traced(
        &mut self,
        presenter: &mut dyn Presenter,
        tracer: &mut Tracer<'_>,
    ) -> Result<PulseReport, SceneError> {
        self.check_thread()?;
        // Changes made during the pulse must not raise the signal; whatever
        // is left over is re-requested at the end.
        self.store.pulse_requested = true;

        let pulse_index = self.pulse_index;
        self.pulse_index += 1;
        let first = !self.synced_once && self.root.is_some();
        let begin = PulseBeginEvent {
            pulse_index,
            timestamp: self.clock.now(),
            first,
        };
        tracer.pulse_begin(&begin);
        let mut summary = PulseSummaryBuilder::new(&begin);
        let mut report = PulseReport {
            pulse_index,
            first,
            ..PulseReport::default()
        };

        self.phase_begin(tracer, &mut summary, PhaseKind::Focus);
        report.focus_changed = self.repair_focus();
        self.phase_end(tracer, &mut summary, PhaseKind::Focus);

        self.phase_begin(tracer, &mut summary, PhaseKind::PreLayout);
        run_listeners(&mut self.pre_layout, &mut self.store);
        self.phase_end(tracer, &mut summary, PhaseKind::PreLayout);

        self.phase_begin(tracer, &mut summary, PhaseKind::Css);
        if let Some(root) = self.root {
            report.nodes_styled = self
                .styles
                .apply_styles(&mut self.store, root, &mut self.source);
        }
        self.phase_end(tracer, &mut summary, PhaseKind::Css);

        self.phase_begin(tracer, &mut summary, PhaseKind::Layout);
        if let Some(root) = self.root {
            report.layout_roots = self.store.layout_pass(root);
        }
        self.phase_end(tracer, &mut summary, PhaseKind::Layout);

        self.phase_begin(tracer, &mut summary, PhaseKind::PostLayout);
        run_listeners(&mut self.post_layout, &mut self.store);
        self.phase_end(tracer, &mut summary, PhaseKind::PostLayout);

        self.phase_begin(tracer, &mut summary, PhaseKind::Bounds);
        report.bounds_roots = self.store.update_bounds();
        self.phase_end(tracer, &mut summary, PhaseKind::Bounds);

        self.phase_begin(tracer, &mut summary, PhaseKind::Sync);
        if first || self.store.sync_pending || !self.dirty.is_empty() {
            let changes = self.store.collect_sync(self.root, first);
            self.sync(presenter, &changes, &mut report);
            if first {
                self.synced_once = true;
            }
            #[cfg(feature = "trace-rich")]
            if tracer.is_active() {
                let nodes: Vec<NodeChange> = changes
                    .updates
                    .iter()
                    .map(|&(node, changes)| NodeChange { node, changes })
                    .collect();
                tracer.node_changes(pulse_index, &nodes);
            }
        }
        self.phase_end(tracer, &mut summary, PhaseKind::Sync);

        summary.set_nodes_styled(saturating_u32(report.nodes_styled));
        summary.set_layout_roots(saturating_u32(report.layout_roots));
        summary.set_bounds_roots(saturating_u32(report.bounds_roots));
        summary.set_synced(
            saturating_u32(report.nodes_synced),
            saturating_u32(report.peers_released),
        );
        tracer.pulse_summary(&summary.finish());

        if !report.is_noop() {
            debug!(
                "pulse {pulse_index}: styled {}, layout roots {}, synced {}, released {}",
                report.nodes_styled,
                report.layout_roots,
                report.nodes_synced,
                report.peers_released
            );
        }

        self.store.pulse_requested = false;
        if self.has_pending_work() {
            self.store.request_pulse();
        }
        Ok(report)
    }

    fn sync(
        &mut self,
        presenter: &mut dyn Presenter,
        changes: &SyncChanges,
        report: &mut PulseReport,
    ) {
        let scene_dirty = core::mem::take(&mut self.dirty);
        if changes.is_empty() && scene_dirty.is_empty() {
            return;
        }

        presenter.lock();
        for &node in &changes.released {
            presenter.release_peer(node);
        }
        for &(node, flags) in &changes.updates {
            if !self.store.has_peer[node as usize] {
                presenter.create_peer(node, self.store.kind[node as usize]);
                self.store.set_has_peer(node);
            }
            let (removed, full_repaint) = self.store.take_removed(node);
            presenter.update_peer(
                &self.store,
                &PeerUpdate {
                    node,
                    changes: flags,
                    removed: &removed,
                    full_repaint,
                },
            );
        }
        if !scene_dirty.is_empty() {
            presenter.update_scene(&SceneUpdate {
                dirty: scene_dirty,
                props: &self.props,
                root: self.root.map(|r| r.index()),
            });
            report.scene_synced = true;
        }
        presenter.unlock();

        report.nodes_synced = changes.updates.len();
        report.peers_released = changes.released.len();
    }

    /// Whether anything is left for another pulse.
    fn has_pending_work(&self) -> bool {
        let css = self
            .root
            .is_some_and(|r| self.store.css_flag[r.index() as usize] != CssFlag::Clean);
        css || self.focus_dirty
            || !self.store.layout_roots.is_empty()
            || !self.store.bounds_roots.is_empty()
            || self.store.sync_pending
            || !self.dirty.is_empty()
    }

    fn phase_begin(
        &self,
        tracer: &mut Tracer<'_>,
        summary: &mut PulseSummaryBuilder,
        phase: PhaseKind,
    ) {
        let timestamp = self.clock.now();
        summary.phase_begin(phase, timestamp);
        tracer.phase_begin(&PhaseBeginEvent {
            pulse_index: self.pulse_index - 1,
            phase,
            timestamp,
        });
    }

    fn phase_end(
        &self,
        tracer: &mut Tracer<'_>,
        summary: &mut PulseSummaryBuilder,
        phase: PhaseKind,
    ) {
        let timestamp = self.clock.now();
        summary.phase_end(phase, timestamp);
        tracer.phase_end(&PhaseEndEvent {
            pulse_index: self.pulse_index - 1,
            phase,
            timestamp,
        });
    }
}

fn run_listeners(listeners: &mut [(ListenerId, LayoutListener)], store: &mut NodeStore) {
    for (_, listener) in listeners {
        listener(store);
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kurbo::Size;

    use super::*;
    use crate::backend::testing::{Call, RecordingPresenter};
    use crate::css::{Color, ComputedValue, PropertyId, StyleOrigin, Stylesheet};
    use crate::layout::{Axis, StackLayout};
    use crate::node::{CssFlag, LayoutFlag, NodeId, NodeKind, SyncFlags};
    use crate::scene::{SceneConfig, SceneDirty};

    struct Fixture {
        scene: Scene,
        presenter: RecordingPresenter,
        root: NodeId,
        a: NodeId,
        b: NodeId,
    }

    fn fixture() -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = Scene::new(SceneConfig::headless());
        scene
            .add_stylesheet(
                Stylesheet::parse(
                    StyleOrigin::Author,
                    "leaf { pref-width: 10; pref-height: 10 } .wide { pref-width: 20 }",
                )
                .unwrap(),
            )
            .unwrap();
        let tree = scene.tree_mut().unwrap();
        let root = tree.create_node(NodeKind::Container);
        let a = tree.create_node(NodeKind::Leaf);
        let b = tree.create_node(NodeKind::Leaf);
        tree.add_style_class(b, "wide");
        tree.set_children(root, &[a, b]).unwrap();
        tree.set_layout_policy(root, Some(Arc::new(StackLayout::new(Axis::Horizontal, 0.0))));
        scene.set_root(Some(root)).unwrap();
        Fixture {
            scene,
            presenter: RecordingPresenter::default(),
            root,
            a,
            b,
        }
    }

    #[test]
    fn first_pulse_styles_lays_out_and_syncs_everything() {
        let mut f = fixture();
        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert!(report.first);
        assert_eq!(report.nodes_styled, 3);
        assert_eq!(report.nodes_synced, 3);
        assert!(report.scene_synced);

        let tree = f.scene.tree();
        assert_eq!(tree.size(f.a), Size::new(10.0, 10.0));
        assert_eq!(tree.size(f.b), Size::new(20.0, 10.0));
        assert_eq!(tree.position(f.b).x, 10.0, "stacked in a row");
        assert!(tree.has_peer(f.root) && tree.has_peer(f.a) && tree.has_peer(f.b));

        let calls = &f.presenter.calls;
        assert_eq!(calls.first(), Some(&Call::Lock));
        assert_eq!(calls.last(), Some(&Call::Unlock));
        assert!(calls.contains(&Call::Create(f.root.index(), NodeKind::Container)));
        assert!(calls.iter().any(|c| matches!(c, Call::Scene(d) if d.contains(SceneDirty::ROOT))));
        assert!(!f.scene.tree().pulse_requested());
    }

    #[test]
    fn unchanged_scene_pulses_as_a_noop() {
        let mut f = fixture();
        f.scene.pulse(&mut f.presenter).unwrap();
        f.presenter.clear();
        let converted = f.scene.styles().stats().converter_calls;

        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert!(report.is_noop(), "{report:?}");
        assert!(!report.first);
        assert!(f.presenter.calls.is_empty());
        assert_eq!(f.scene.styles().stats().converter_calls, converted);
    }

    #[test]
    fn later_pulses_sync_only_changed_nodes() {
        let mut f = fixture();
        f.scene.pulse(&mut f.presenter).unwrap();
        f.presenter.clear();

        f.scene
            .set_property(f.a, PropertyId::OPACITY, ComputedValue::Number(0.5))
            .unwrap();
        assert!(f.scene.tree().pulse_requested());
        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(report.nodes_styled, 0);
        assert_eq!(f.presenter.updated(), vec![f.a.index()]);
        assert!(f.presenter.calls.contains(&Call::Update {
            node: f.a.index(),
            changes: SyncFlags::PROPERTIES,
            removed: Vec::new(),
            full_repaint: false,
        }));
    }

    #[test]
    fn user_padding_side_reaches_layout() {
        let mut f = fixture();
        f.scene.pulse(&mut f.presenter).unwrap();

        f.scene
            .set_property(f.root, PropertyId::PADDING_LEFT, ComputedValue::Number(7.0))
            .unwrap();
        let padding = f
            .scene
            .property(f.root, PropertyId::PADDING)
            .and_then(|(v, _)| v.as_insets());
        assert_eq!(padding.map(|p| p.x0), Some(7.0), "folded into the shorthand");
        assert_eq!(f.scene.tree().layout_flag(f.root), LayoutFlag::NeedsLayout);

        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert!(report.layout_roots > 0, "{report:?}");
        let tree = f.scene.tree_mut().unwrap();
        assert_eq!(tree.position(f.a).x, 7.0, "inside the padding");
        assert_eq!(tree.position(f.b).x, 17.0);
        assert_eq!(tree.pref_size(f.root).width, 37.0);
    }

    #[test]
    fn user_font_size_restyles_relative_children() {
        let mut f = fixture();
        f.scene
            .add_stylesheet(
                Stylesheet::parse(StyleOrigin::Author, ".tall { pref-height: 2em }").unwrap(),
            )
            .unwrap();
        f.scene.tree_mut().unwrap().add_style_class(f.a, "tall");
        f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(f.scene.tree().size(f.a).height, 26.0, "default 13px font");

        f.scene
            .set_property(f.root, PropertyId::FONT_SIZE, ComputedValue::Number(30.0))
            .unwrap();
        let font = f.scene.property(f.root, PropertyId::FONT);
        assert!(
            matches!(&font, Some((ComputedValue::Font(v), Some(StyleOrigin::User))) if v.size == 30.0),
            "{font:?}"
        );
        assert_eq!(f.scene.tree().css_flag(f.a), CssFlag::Update);
        assert_eq!(f.scene.tree().css_flag(f.b), CssFlag::Update);

        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(report.nodes_styled, 2, "only the children");
        assert_eq!(f.scene.tree().size(f.a).height, 60.0);
        assert_eq!(f.scene.tree().size(f.b).height, 10.0, "absolute sizes stay");
    }

    #[test]
    fn removal_and_destruction_reach_the_presenter() {
        let mut f = fixture();
        f.scene.pulse(&mut f.presenter).unwrap();
        f.presenter.clear();

        let tree = f.scene.tree_mut().unwrap();
        tree.remove_child(f.root, f.a).unwrap();
        tree.destroy_node(f.a).unwrap();
        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(report.peers_released, 1);
        assert!(f.presenter.calls.contains(&Call::Release(f.a.index())));
        let root_update = f.presenter.calls.iter().find_map(|c| match c {
            Call::Update { node, removed, .. } if *node == f.root.index() => Some(removed.clone()),
            _ => None,
        });
        assert_eq!(root_update, Some(vec![f.a.index()]));
        assert_eq!(f.scene.tree().position(f.b).x, 0.0, "relaid out");
    }

    #[test]
    fn scene_properties_sync_only_when_dirty() {
        let mut f = fixture();
        f.scene.pulse(&mut f.presenter).unwrap();
        f.presenter.clear();

        f.scene.set_fill(Color::BLACK).unwrap();
        f.scene.set_cursor(Some("pointer")).unwrap();
        f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(
            f.presenter.calls,
            vec![
                Call::Lock,
                Call::Scene(SceneDirty::FILL | SceneDirty::CURSOR),
                Call::Unlock
            ]
        );
        assert!(f.scene.dirty().is_empty());
    }

    #[test]
    fn listeners_run_around_layout() {
        let mut f = fixture();
        let seen = Arc::new(AtomicUsize::new(0));
        let a = f.a;
        let pre = Arc::clone(&seen);
        f.scene.add_pre_layout_listener(move |tree| {
            pre.fetch_add(1, Ordering::Relaxed);
            tree.set_visible(a, false);
        })
        .unwrap();
        let post = Arc::clone(&seen);
        f.scene.add_post_layout_listener(move |_| {
            post.fetch_add(10, Ordering::Relaxed);
        })
        .unwrap();
        f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 11);
        assert!(!f.scene.tree().is_visible(f.a));
    }

    #[test]
    fn post_layout_changes_request_another_pulse() {
        let mut f = fixture();
        let signals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&signals);
        f.scene.set_pulse_signal(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })))
        .unwrap();
        let b = f.b;
        let mut once = true;
        f.scene.add_post_layout_listener(move |tree| {
            if once {
                tree.set_size(b, Size::new(50.0, 50.0));
                once = false;
            }
        })
        .unwrap();
        f.scene.pulse(&mut f.presenter).unwrap();
        assert!(f.scene.tree().pulse_requested());
        assert_eq!(signals.load(Ordering::Relaxed), 1, "raised once, after the pulse");
        f.scene.pulse(&mut f.presenter).unwrap();
        assert!(!f.scene.tree().pulse_requested());
    }

    #[test]
    fn focus_is_repaired_in_the_pulse() {
        let mut f = fixture();
        let tree = f.scene.tree_mut().unwrap();
        tree.set_focus_traversable(f.a, true);
        tree.set_focus_traversable(f.b, true);
        f.scene.pulse(&mut f.presenter).unwrap();
        assert_eq!(f.scene.focus_owner(), Some(f.a), "first focusable node");

        f.scene.tree_mut().unwrap().set_disabled(f.a, true);
        let report = f.scene.pulse(&mut f.presenter).unwrap();
        assert!(report.focus_changed);
        assert_eq!(f.scene.focus_owner(), Some(f.b));
    }
}
