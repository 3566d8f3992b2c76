// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes pulse events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Per-node change events ([`on_node_changes`](TraceSink::on_node_changes))
//! store only the count.

use canopy_core::time::HostTime;
use canopy_core::trace::{
    NodeChange, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PulseBeginEvent, PulseSummary,
    TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PULSE_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_PULSE_SUMMARY: u8 = 4;
const TAG_NODE_CHANGES_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(u8::try_from(p.index()).unwrap_or(u8::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_pulse_begin(&mut self, e: &PulseBeginEvent) {
        self.write_u8(TAG_PULSE_BEGIN);
        self.write_u64(e.pulse_index);
        self.write_u64(e.timestamp.nanos());
        self.write_bool(e.first);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.pulse_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.pulse_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_pulse_summary(&mut self, s: &PulseSummary) {
        self.write_u8(TAG_PULSE_SUMMARY);
        self.write_u64(s.pulse_index);
        self.write_u64(s.start.nanos());
        self.write_bool(s.first);
        self.write_u32(s.nodes_styled);
        self.write_u32(s.layout_roots);
        self.write_u32(s.bounds_roots);
        self.write_u32(s.nodes_synced);
        self.write_u32(s.peers_released);
        for phase in PhaseKind::ALL {
            self.write_u64(s.phase_nanos(phase));
        }
    }

    fn on_node_changes(&mut self, pulse_index: u64, changes: &[NodeChange]) {
        self.write_u8(TAG_NODE_CHANGES_COUNT);
        self.write_u64(pulse_index);
        self.write_u32(u32::try_from(changes.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PulseBeginEvent`].
    PulseBegin(PulseBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PulseSummary`].
    PulseSummary(PulseSummary),
    /// Node-change count for a pulse.
    NodeChangesCount {
        /// Pulse counter.
        pulse_index: u64,
        /// Number of nodes synced with per-node detail.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes: [u8; N] = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::from_index(usize::from(self.read_u8()?))
    }

    fn decode_pulse_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PulseBegin(PulseBeginEvent {
            pulse_index: self.read_u64()?,
            timestamp: HostTime(self.read_u64()?),
            first: self.read_bool()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            pulse_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            pulse_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_pulse_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PulseSummary(PulseSummary {
            pulse_index: self.read_u64()?,
            start: HostTime(self.read_u64()?),
            first: self.read_bool()?,
            nodes_styled: self.read_u32()?,
            layout_roots: self.read_u32()?,
            bounds_roots: self.read_u32()?,
            nodes_synced: self.read_u32()?,
            peers_released: self.read_u32()?,
            focus_nanos: self.read_u64()?,
            pre_layout_nanos: self.read_u64()?,
            css_nanos: self.read_u64()?,
            layout_nanos: self.read_u64()?,
            post_layout_nanos: self.read_u64()?,
            bounds_nanos: self.read_u64()?,
            sync_nanos: self.read_u64()?,
        }))
    }

    fn decode_node_changes_count(&mut self) -> Option<RecordedEvent> {
        let pulse_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::NodeChangesCount { pulse_index, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_PULSE_BEGIN => self.decode_pulse_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_PULSE_SUMMARY => self.decode_pulse_summary(),
            TAG_NODE_CHANGES_COUNT => self.decode_node_changes_count(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
