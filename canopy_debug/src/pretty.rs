// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Times are
//! printed in microseconds.

use std::io::Write;

use canopy_core::time::{Duration, HostTime};
use canopy_core::trace::{
    NodeChange, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PulseBeginEvent, PulseSummary,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    phases: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("phases", &self.phases)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            phases: true,
        }
    }

    /// Omits per-phase begin/end lines, keeping pulse starts and summaries.
    #[must_use]
    pub fn summaries_only(mut self) -> Self {
        self.phases = false;
        self
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    Duration(t.nanos()).as_micros_f64()
}

fn span_us(nanos: u64) -> f64 {
    Duration(nanos).as_micros_f64()
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pulse_begin(&mut self, e: &PulseBeginEvent) {
        let first = if e.first { " first" } else { "" };
        let _ = writeln!(
            self.writer,
            "[pulse] #{} at {:.1}µs{first}",
            e.pulse_index,
            us(e.timestamp),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if !self.phases {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:begin] pulse={} {} at {:.1}µs",
            e.pulse_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        if !self.phases {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:end] pulse={} {} at {:.1}µs",
            e.pulse_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_pulse_summary(&mut self, s: &PulseSummary) {
        let _ = write!(
            self.writer,
            "[summary] pulse={} styled={} layout={} bounds={} synced={} released={} total={:.1}µs",
            s.pulse_index,
            s.nodes_styled,
            s.layout_roots,
            s.bounds_roots,
            s.nodes_synced,
            s.peers_released,
            span_us(s.total_nanos()),
        );
        for phase in PhaseKind::ALL {
            let nanos = s.phase_nanos(phase);
            if nanos > 0 {
                let _ = write!(self.writer, " {}={:.1}µs", phase.name(), span_us(nanos));
            }
        }
        let _ = writeln!(self.writer);
    }

    fn on_node_changes(&mut self, pulse_index: u64, changes: &[NodeChange]) {
        let _ = writeln!(
            self.writer,
            "[nodes] pulse={pulse_index} changed={}",
            changes.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PulseSummary {
        PulseSummary {
            pulse_index: 2,
            nodes_styled: 4,
            layout_nanos: 1_500,
            ..PulseSummary::default()
        }
    }

    #[test]
    fn pretty_print_pulse() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_pulse_begin(&PulseBeginEvent {
            pulse_index: 2,
            timestamp: HostTime(3_000),
            first: true,
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            pulse_index: 2,
            phase: PhaseKind::Layout,
            timestamp: HostTime(3_000),
        });
        sink.on_pulse_summary(&summary());
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[pulse] #2 at 3.0µs first"), "got: {output}");
        assert!(output.contains("[phase:begin] pulse=2 layout"), "got: {output}");
        assert!(output.contains("styled=4"), "got: {output}");
        assert!(output.contains(" layout=1.5µs"), "got: {output}");
        assert!(!output.contains(" css="), "idle phases omitted: {output}");
    }

    #[test]
    fn summaries_only_skips_phases() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).summaries_only();
        sink.on_phase_end(&PhaseEndEvent {
            pulse_index: 2,
            phase: PhaseKind::Css,
            timestamp: HostTime(10),
        });
        sink.on_pulse_summary(&summary());
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!output.contains("[phase"), "got: {output}");
        assert_eq!(output.lines().count(), 1, "got: {output}");
    }
}
