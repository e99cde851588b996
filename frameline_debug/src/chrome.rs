// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Map, Value, json};

use frameline_core::time::Timebase;
use frameline_core::trace::PhaseKind;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Events that carry no timestamp of their own are placed at the start of
/// the most recent pass.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut pass_start_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PassBegin(e) => {
                pass_start_us = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "PassBegin",
                    "cat": "Lifecycle",
                    "ts": pass_start_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "pass_index": e.pass_index,
                        "root": e.root.index(),
                        "target": format!("{:?}", e.target),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Pass",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Pass",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                    }
                }));
            }
            RecordedEvent::ThrottleChange(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ThrottleChange",
                    "cat": "Throttle",
                    "ts": pass_start_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "pass_index": e.pass_index,
                        "view": e.view.index(),
                        "throttled": e.throttled,
                    }
                }));
            }
            RecordedEvent::AnchorAdjust(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "AnchorAdjust",
                    "cat": "Scroll",
                    "ts": pass_start_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "pass_index": e.pass_index,
                        "view": e.view.index(),
                        "node": e.node.0,
                        "dx": e.delta.x,
                        "dy": e.delta.y,
                    }
                }));
            }
            RecordedEvent::PassSummary(s) => {
                let mut args = Map::new();
                args.insert("pass_index".into(), json!(s.pass_index));
                args.insert("target".into(), json!(format!("{:?}", s.target)));
                args.insert("layouts".into(), json!(s.layouts));
                args.insert("paints".into(), json!(s.paints));
                args.insert("throttled_skipped".into(), json!(s.throttled_skipped));
                for phase in PhaseKind::ALL {
                    args.insert(
                        format!("{}_us", phase.name()),
                        json!(ticks_to_us(s.ticks(phase), timebase)),
                    );
                }
                events.push(json!({
                    "ph": "i",
                    "name": "PassSummary",
                    "cat": "Summary",
                    "ts": ticks_to_us(s.start.ticks(), timebase),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": Value::Object(args),
                }));
            }
            RecordedEvent::ViewWorkCounts { pass_index, counts } => {
                events.push(json!({
                    "ph": "i",
                    "name": "ViewWork",
                    "cat": "Rich",
                    "ts": pass_start_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass_index": pass_index,
                        "style_recalcs": counts.style_recalcs,
                        "layouts": counts.layouts,
                        "compositing_updates": counts.compositing_updates,
                        "pre_paints": counts.pre_paints,
                        "paints": counts.paints,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}
