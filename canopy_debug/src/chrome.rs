// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Map, Value, json};

use canopy_core::trace::PhaseKind;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration slices; pulse starts and summaries become
/// instant events.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Timestamp of the most recent event, for records that carry none.
    let mut last_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PulseBegin(e) => {
                last_us = nanos_to_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "i",
                    "name": "Pulse",
                    "cat": "Scene",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "pulse_index": e.pulse_index,
                        "first": e.first,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_us = nanos_to_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Pulse",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pulse_index": e.pulse_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_us = nanos_to_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Pulse",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pulse_index": e.pulse_index,
                    }
                }));
            }
            RecordedEvent::PulseSummary(s) => {
                let mut args = Map::new();
                args.insert("pulse_index".into(), s.pulse_index.into());
                args.insert("nodes_styled".into(), s.nodes_styled.into());
                args.insert("layout_roots".into(), s.layout_roots.into());
                args.insert("bounds_roots".into(), s.bounds_roots.into());
                args.insert("nodes_synced".into(), s.nodes_synced.into());
                args.insert("peers_released".into(), s.peers_released.into());
                for phase in PhaseKind::ALL {
                    args.insert(
                        format!("{}_us", phase.name()),
                        nanos_to_us(s.phase_nanos(phase)).into(),
                    );
                }
                events.push(json!({
                    "ph": "i",
                    "name": "PulseSummary",
                    "cat": "Summary",
                    "ts": nanos_to_us(s.start.nanos()),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": args,
                }));
            }
            RecordedEvent::NodeChangesCount { pulse_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "NodeChanges",
                    "cat": "Rich",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pulse_index": pulse_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use canopy_core::time::HostTime;
    use canopy_core::trace::{
        PhaseBeginEvent, PhaseEndEvent, PulseBeginEvent, PulseSummary, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_pulse_begin(&PulseBeginEvent {
            pulse_index: 0,
            timestamp: HostTime(1_000_000),
            first: true,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            pulse_index: 0,
            phase: PhaseKind::Css,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            pulse_index: 0,
            phase: PhaseKind::Css,
            timestamp: HostTime(1_000_500),
        });
        rec.on_pulse_summary(&PulseSummary {
            start: HostTime(1_000_000),
            first: true,
            css_nanos: 500,
            ..PulseSummary::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4, "one entry per record");

        assert_eq!(parsed[0]["ph"], "i", "pulse start is an instant");
        assert_eq!(parsed[0]["name"], "Pulse", "pulse name");
        assert_eq!(parsed[0]["ts"], 1000.0, "microseconds");

        assert_eq!(parsed[1]["ph"], "B", "phase begin");
        assert_eq!(parsed[1]["name"], "css", "phase name");
        assert_eq!(parsed[2]["ph"], "E", "phase end");
        assert_eq!(parsed[2]["ts"], 1000.5, "microseconds");

        assert_eq!(parsed[3]["args"]["css_us"], 0.5, "phase time in summary");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty(), "no events");
    }
}
