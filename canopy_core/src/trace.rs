// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the pulse.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! pulse instrumentation calls at each phase. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`PulseSummaryBuilder`] collects phase timestamps and work counts during a
//! pulse and produces a [`PulseSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`NodeChange`] events and the
//!   corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use crate::node::SyncFlags;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the pulse is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Focus repair.
    Focus,
    /// Pre-layout listeners.
    PreLayout,
    /// Style resolution.
    Css,
    /// Layout pass.
    Layout,
    /// Post-layout listeners.
    PostLayout,
    /// Bounds refresh.
    Bounds,
    /// Peer synchronization.
    Sync,
}

impl PhaseKind {
    /// All phases, in pulse order.
    pub const ALL: [Self; 7] = [
        Self::Focus,
        Self::PreLayout,
        Self::Css,
        Self::Layout,
        Self::PostLayout,
        Self::Bounds,
        Self::Sync,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::PreLayout => "pre-layout",
            Self::Css => "css",
            Self::Layout => "layout",
            Self::PostLayout => "post-layout",
            Self::Bounds => "bounds",
            Self::Sync => "sync",
        }
    }

    /// Stable small integer used by binary encodings.
    #[must_use]
    pub const fn index(self) -> usize {
        phase_index(self)
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a pulse starts.
#[derive(Clone, Copy, Debug)]
pub struct PulseBeginEvent {
    /// Monotonic pulse counter.
    pub pulse_index: u64,
    /// Host time at the start of the pulse.
    pub timestamp: HostTime,
    /// Whether this is the scene's first sync.
    pub first: bool,
}

/// Marks the beginning of a pulse phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Pulse counter.
    pub pulse_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a pulse phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Pulse counter.
    pub pulse_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Per-pulse summary produced by [`PulseSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseSummary {
    /// Pulse counter.
    pub pulse_index: u64,
    /// Host time when the pulse started.
    pub start: HostTime,
    /// Whether this was the scene's first sync.
    pub first: bool,
    /// Nodes whose styles were resolved.
    pub nodes_styled: u32,
    /// Layout roots that had work.
    pub layout_roots: u32,
    /// Bounds roots refreshed.
    pub bounds_roots: u32,
    /// Render peers updated.
    pub nodes_synced: u32,
    /// Render peers released.
    pub peers_released: u32,
    /// Focus phase duration in nanoseconds (0 if not measured).
    pub focus_nanos: u64,
    /// Pre-layout phase duration in nanoseconds.
    pub pre_layout_nanos: u64,
    /// CSS phase duration in nanoseconds.
    pub css_nanos: u64,
    /// Layout phase duration in nanoseconds.
    pub layout_nanos: u64,
    /// Post-layout phase duration in nanoseconds.
    pub post_layout_nanos: u64,
    /// Bounds phase duration in nanoseconds.
    pub bounds_nanos: u64,
    /// Sync phase duration in nanoseconds.
    pub sync_nanos: u64,
}

impl PulseSummary {
    /// Duration of one phase in nanoseconds.
    #[must_use]
    pub const fn phase_nanos(&self, phase: PhaseKind) -> u64 {
        match phase {
            PhaseKind::Focus => self.focus_nanos,
            PhaseKind::PreLayout => self.pre_layout_nanos,
            PhaseKind::Css => self.css_nanos,
            PhaseKind::Layout => self.layout_nanos,
            PhaseKind::PostLayout => self.post_layout_nanos,
            PhaseKind::Bounds => self.bounds_nanos,
            PhaseKind::Sync => self.sync_nanos,
        }
    }

    /// Sum of all phase durations in nanoseconds.
    #[must_use]
    pub fn total_nanos(&self) -> u64 {
        PhaseKind::ALL.iter().map(|&p| self.phase_nanos(p)).sum()
    }
}

/// A per-pulse node change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeChange {
    /// Slot index of the node that was synced.
    pub node: u32,
    /// What was sent to its peer.
    pub changes: SyncFlags,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the pulse.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a pulse starts.
    fn on_pulse_begin(&mut self, e: &PulseBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a pulse phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pulse phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called with a per-pulse summary.
    fn on_pulse_summary(&mut self, s: &PulseSummary) {
        _ = s;
    }

    /// Called with the nodes synced this pulse (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_changes(&mut self, pulse_index: u64, changes: &[NodeChange]) {
        _ = (pulse_index, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`PulseBeginEvent`].
    #[inline]
    pub fn pulse_begin(&mut self, e: &PulseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pulse_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PulseSummary`].
    #[inline]
    pub fn pulse_summary(&mut self, s: &PulseSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_pulse_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_changes(&mut self, pulse_index: u64, changes: &[NodeChange]) {
        if let Some(s) = &mut self.sink {
            s.on_node_changes(pulse_index, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// PulseSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a pulse and produces a [`PulseSummary`].
#[derive(Debug)]
pub struct PulseSummaryBuilder {
    begin: PulseBeginEvent,
    phase_starts: [Option<HostTime>; 7],
    phase_ends: [Option<HostTime>; 7],
    counts: PulseSummary,
}

impl PulseSummaryBuilder {
    /// Starts building a summary for the given pulse.
    #[must_use]
    pub fn new(begin: &PulseBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_starts: [None; 7],
            phase_ends: [None; 7],
            counts: PulseSummary::default(),
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Sets the number of nodes styled.
    pub fn set_nodes_styled(&mut self, n: u32) {
        self.counts.nodes_styled = n;
    }

    /// Sets the number of layout roots that had work.
    pub fn set_layout_roots(&mut self, n: u32) {
        self.counts.layout_roots = n;
    }

    /// Sets the number of bounds roots refreshed.
    pub fn set_bounds_roots(&mut self, n: u32) {
        self.counts.bounds_roots = n;
    }

    /// Sets the number of peers updated and released.
    pub fn set_synced(&mut self, synced: u32, released: u32) {
        self.counts.nodes_synced = synced;
        self.counts.peers_released = released;
    }

    /// Consumes the builder and produces the final [`PulseSummary`].
    #[must_use]
    pub fn finish(self) -> PulseSummary {
        PulseSummary {
            pulse_index: self.begin.pulse_index,
            start: self.begin.timestamp,
            first: self.begin.first,
            focus_nanos: self.phase_duration(PhaseKind::Focus),
            pre_layout_nanos: self.phase_duration(PhaseKind::PreLayout),
            css_nanos: self.phase_duration(PhaseKind::Css),
            layout_nanos: self.phase_duration(PhaseKind::Layout),
            post_layout_nanos: self.phase_duration(PhaseKind::PostLayout),
            bounds_nanos: self.phase_duration(PhaseKind::Bounds),
            sync_nanos: self.phase_duration(PhaseKind::Sync),
            ..self.counts
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).nanos(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Focus => 0,
        PhaseKind::PreLayout => 1,
        PhaseKind::Css => 2,
        PhaseKind::Layout => 3,
        PhaseKind::PostLayout => 4,
        PhaseKind::Bounds => 5,
        PhaseKind::Sync => 6,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> PulseBeginEvent {
        PulseBeginEvent {
            pulse_index: 42,
            timestamp: HostTime(1_000_000),
            first: false,
        }
    }

    #[test]
    fn phase_indices_round_trip() {
        for (i, phase) in PhaseKind::ALL.into_iter().enumerate() {
            assert_eq!(phase.index(), i);
            assert_eq!(PhaseKind::from_index(i), Some(phase));
        }
        assert_eq!(PhaseKind::from_index(7), None);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_pulse_begin(&sample_begin());
        sink.on_pulse_summary(&PulseSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_active());
        tracer.pulse_begin(&sample_begin());
        tracer.phase_begin(&PhaseBeginEvent {
            pulse_index: 42,
            phase: PhaseKind::Css,
            timestamp: HostTime(5),
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = PulseSummaryBuilder::new(&sample_begin());

        builder.phase_begin(PhaseKind::Css, HostTime(1_000_000));
        builder.phase_end(PhaseKind::Css, HostTime(1_000_100));
        builder.phase_begin(PhaseKind::Layout, HostTime(1_000_100));
        builder.phase_end(PhaseKind::Layout, HostTime(1_000_500));
        builder.phase_begin(PhaseKind::Sync, HostTime(1_000_500));
        builder.phase_end(PhaseKind::Sync, HostTime(1_002_000));
        builder.set_nodes_styled(3);
        builder.set_synced(2, 1);

        let summary = builder.finish();
        assert_eq!(summary.css_nanos, 100);
        assert_eq!(summary.layout_nanos, 400);
        assert_eq!(summary.sync_nanos, 1500);
        assert_eq!(summary.total_nanos(), 2000);
        assert_eq!(summary.nodes_styled, 3);
        assert_eq!(summary.nodes_synced, 2);
        assert_eq!(summary.peers_released, 1);
        assert_eq!(summary.pulse_index, 42);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let summary = PulseSummaryBuilder::new(&sample_begin()).finish();
        for phase in PhaseKind::ALL {
            assert_eq!(summary.phase_nanos(phase), 0);
        }
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            pulses: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_pulse_begin(&mut self, e: &PulseBeginEvent) {
                self.pulses.push(e.pulse_index);
            }
        }

        let mut sink = RecordingSink { pulses: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        assert!(tracer.is_active());
        tracer.pulse_begin(&sample_begin());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.pulses, &[42]);
    }
}
