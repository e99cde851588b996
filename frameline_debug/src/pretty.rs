// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use frameline_core::time::{HostTime, Timebase};
use frameline_core::trace::{
    AnchorAdjustEvent, PassBeginEvent, PassSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ThrottleChangeEvent, TraceSink, ViewWork,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[pass] #{} root={:?} target={:?} at {:.1}µs",
            e.pass_index,
            e.root,
            e.target,
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] pass={} {} at {:.1}µs",
            e.pass_index,
            e.phase.name(),
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] pass={} {} at {:.1}µs",
            e.pass_index,
            e.phase.name(),
            self.host_us(e.timestamp),
        );
    }

    fn on_throttle_change(&mut self, e: &ThrottleChangeEvent) {
        let state = if e.throttled { "throttled" } else { "unthrottled" };
        let _ = writeln!(
            self.writer,
            "[throttle] pass={} view={:?} {state}",
            e.pass_index, e.view,
        );
    }

    fn on_anchor_adjust(&mut self, e: &AnchorAdjustEvent) {
        let _ = writeln!(
            self.writer,
            "[anchor] pass={} view={:?} node={} delta=({:.1}, {:.1})",
            e.pass_index, e.view, e.node.0, e.delta.x, e.delta.y,
        );
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        let mut line = format!(
            "[summary] pass={} layouts={} paints={} skipped={}",
            s.pass_index, s.layouts, s.paints, s.throttled_skipped,
        );
        for phase in PhaseKind::ALL {
            let ticks = s.ticks(phase);
            if ticks > 0 {
                line.push_str(&format!(" {}={:.1}µs", phase.name(), self.ticks_to_us(ticks)));
            }
        }
        let _ = writeln!(self.writer, "{line}");
    }

    fn on_view_work(&mut self, pass_index: u64, work: &[ViewWork]) {
        let _ = writeln!(
            self.writer,
            "[work] pass={pass_index} records={}",
            work.len(),
        );
    }
}
