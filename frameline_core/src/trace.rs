// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for lifecycle passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the coordinator calls as a pass runs. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`PassSummaryBuilder`] collects phase timestamps during a pass and
//! produces a [`PassSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`ViewWork`] records plus the
//!   corresponding `TraceSink` method.

use kurbo::Vec2;

use crate::lifecycle::TargetState;
use crate::time::HostTime;
use crate::view::{NodeId, ViewId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a lifecycle pass is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Style recalculation and layout, recursively.
    StyleAndLayout,
    /// Draining the scroll anchoring queue.
    ScrollAnchoring,
    /// Resize observer delivery rounds.
    ResizeObservers,
    /// Compositing updates.
    Compositing,
    /// The paint invalidation walk.
    PrePaint,
    /// Painting.
    Paint,
    /// Recomputing child viewport intersections.
    ViewportIntersection,
}

impl PhaseKind {
    /// Every phase, in the order a full pass runs them.
    pub const ALL: [Self; PHASE_COUNT] = [
        Self::StyleAndLayout,
        Self::ScrollAnchoring,
        Self::ResizeObservers,
        Self::Compositing,
        Self::PrePaint,
        Self::Paint,
        Self::ViewportIntersection,
    ];

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StyleAndLayout => "style_and_layout",
            Self::ScrollAnchoring => "scroll_anchoring",
            Self::ResizeObservers => "resize_observers",
            Self::Compositing => "compositing",
            Self::PrePaint => "pre_paint",
            Self::Paint => "paint",
            Self::ViewportIntersection => "viewport_intersection",
        }
    }
}

const PHASE_COUNT: usize = 7;

/// Which piece of per-view work was done.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkKind {
    /// Style was recalculated.
    StyleRecalc,
    /// The view was laid out.
    Layout,
    /// Compositing inputs were updated.
    Compositing,
    /// The paint invalidation walk ran.
    PrePaint,
    /// The view was painted.
    Paint,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a coordinated pass starts.
#[derive(Clone, Copy, Debug)]
pub struct PassBeginEvent {
    /// Monotonic pass counter of the tree.
    pub pass_index: u64,
    /// Local root the pass runs on.
    pub root: ViewId,
    /// State the pass is asked to reach.
    pub target: TargetState,
    /// Host time at the start of the pass.
    pub timestamp: HostTime,
}

/// Marks the beginning of a pass phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a pass phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when a view's throttled status flipped.
#[derive(Clone, Copy, Debug)]
pub struct ThrottleChangeEvent {
    /// Pass counter of the pass that reported the change.
    pub pass_index: u64,
    /// The view.
    pub view: ViewId,
    /// Whether the view is throttled now.
    pub throttled: bool,
}

/// Emitted when scroll anchoring moved a view's scroll offset.
#[derive(Clone, Copy, Debug)]
pub struct AnchorAdjustEvent {
    /// Pass counter.
    pub pass_index: u64,
    /// The scrolled view.
    pub view: ViewId,
    /// The anchor node.
    pub node: NodeId,
    /// Applied scroll delta.
    pub delta: Vec2,
}

/// Per-pass timing summary produced by [`PassSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct PassSummary {
    /// Pass counter.
    pub pass_index: u64,
    /// Local root of the pass.
    pub root: ViewId,
    /// Requested target state.
    pub target: TargetState,
    /// Host time when the pass started.
    pub start: HostTime,
    /// Duration of each phase in ticks, indexed like [`PhaseKind::ALL`]
    /// (0 if the phase did not run).
    pub phase_ticks: [u64; PHASE_COUNT],
    /// Number of views laid out.
    pub layouts: u32,
    /// Number of views painted.
    pub paints: u32,
    /// Number of throttled views skipped.
    pub throttled_skipped: u32,
}

impl PassSummary {
    /// Returns the measured duration of `phase` in ticks.
    #[must_use]
    pub const fn ticks(&self, phase: PhaseKind) -> u64 {
        self.phase_ticks[phase_index(phase)]
    }
}

/// A per-view work record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewWork {
    /// Slot index of the view.
    pub view_index: u32,
    /// What was done.
    pub kind: WorkKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from lifecycle passes.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a pass starts.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a pass phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pass phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a view's throttled status flipped.
    fn on_throttle_change(&mut self, e: &ThrottleChangeEvent) {
        _ = e;
    }

    /// Called when scroll anchoring adjusted a scroll offset.
    fn on_anchor_adjust(&mut self, e: &AnchorAdjustEvent) {
        _ = e;
    }

    /// Called with a per-pass timing summary.
    fn on_pass_summary(&mut self, s: &PassSummary) {
        _ = s;
    }

    /// Called with the per-view work of a pass (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_view_work(&mut self, pass_index: u64, work: &[ViewWork]) {
        _ = (pass_index, work);
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

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&mut self, e: &PassBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_begin(e);
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

    /// Emits a [`ThrottleChangeEvent`].
    #[inline]
    pub fn throttle_change(&mut self, e: &ThrottleChangeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_throttle_change(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AnchorAdjustEvent`].
    #[inline]
    pub fn anchor_adjust(&mut self, e: &AnchorAdjustEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_anchor_adjust(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassSummary`].
    #[inline]
    pub fn pass_summary(&mut self, s: &PassSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_pass_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits per-view work records (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn view_work(&mut self, pass_index: u64, work: &[ViewWork]) {
        if let Some(s) = &mut self.sink {
            s.on_view_work(pass_index, work);
        }
    }
}

// ---------------------------------------------------------------------------
// PassSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a pass and produces a [`PassSummary`].
#[derive(Debug)]
pub struct PassSummaryBuilder {
    begin: PassBeginEvent,
    phase_starts: [Option<HostTime>; PHASE_COUNT],
    phase_ends: [Option<HostTime>; PHASE_COUNT],
    layouts: u32,
    paints: u32,
    throttled_skipped: u32,
}

impl PassSummaryBuilder {
    /// Starts building a summary for the given pass.
    #[must_use]
    pub fn new(begin: &PassBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_starts: [None; PHASE_COUNT],
            phase_ends: [None; PHASE_COUNT],
            layouts: 0,
            paints: 0,
            throttled_skipped: 0,
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

    /// Sets the work counters reported in the summary.
    pub fn set_work(&mut self, layouts: u32, paints: u32, throttled_skipped: u32) {
        self.layouts = layouts;
        self.paints = paints;
        self.throttled_skipped = throttled_skipped;
    }

    /// Consumes the builder and produces the final [`PassSummary`].
    #[must_use]
    pub fn finish(self) -> PassSummary {
        let mut phase_ticks = [0; PHASE_COUNT];
        for phase in PhaseKind::ALL {
            phase_ticks[phase_index(phase)] = self.phase_duration(phase);
        }
        PassSummary {
            pass_index: self.begin.pass_index,
            root: self.begin.root,
            target: self.begin.target,
            start: self.begin.timestamp,
            phase_ticks,
            layouts: self.layouts,
            paints: self.paints,
            throttled_skipped: self.throttled_skipped,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).ticks(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::StyleAndLayout => 0,
        PhaseKind::ScrollAnchoring => 1,
        PhaseKind::ResizeObservers => 2,
        PhaseKind::Compositing => 3,
        PhaseKind::PrePaint => 4,
        PhaseKind::Paint => 5,
        PhaseKind::ViewportIntersection => 6,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewTree;

    fn sample_begin() -> PassBeginEvent {
        let mut tree = ViewTree::default();
        let root = tree.create_local_view(kurbo::Rect::new(0.0, 0.0, 10.0, 10.0));
        PassBeginEvent {
            pass_index: 42,
            root,
            target: TargetState::PaintClean,
            timestamp: HostTime(1_000_000),
        }
    }

    #[test]
    fn phase_order_matches_index() {
        for (i, phase) in PhaseKind::ALL.into_iter().enumerate() {
            assert_eq!(phase_index(phase), i);
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let begin = sample_begin();
        let mut sink = NoopSink;
        sink.on_pass_begin(&begin);
        sink.on_pass_summary(&PassSummaryBuilder::new(&begin).finish());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.pass_begin(&sample_begin());
        tracer.phase_begin(&PhaseBeginEvent {
            pass_index: 0,
            phase: PhaseKind::Paint,
            timestamp: HostTime(0),
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let begin = sample_begin();
        let mut builder = PassSummaryBuilder::new(&begin);

        builder.phase_begin(PhaseKind::StyleAndLayout, HostTime(1_000_000));
        builder.phase_end(PhaseKind::StyleAndLayout, HostTime(1_000_400));
        builder.phase_begin(PhaseKind::Compositing, HostTime(1_000_400));
        builder.phase_end(PhaseKind::Compositing, HostTime(1_000_450));
        builder.phase_begin(PhaseKind::Paint, HostTime(1_000_450));
        builder.phase_end(PhaseKind::Paint, HostTime(1_002_000));
        builder.set_work(2, 1, 3);

        let summary = builder.finish();
        assert_eq!(summary.ticks(PhaseKind::StyleAndLayout), 400);
        assert_eq!(summary.ticks(PhaseKind::Compositing), 50);
        assert_eq!(summary.ticks(PhaseKind::Paint), 1550);
        assert_eq!(summary.ticks(PhaseKind::PrePaint), 0);
        assert_eq!(summary.layouts, 2);
        assert_eq!(summary.throttled_skipped, 3);
        assert_eq!(summary.pass_index, 42);
    }

    #[test]
    fn unfinished_phase_is_zero() {
        let begin = sample_begin();
        let mut builder = PassSummaryBuilder::new(&begin);
        builder.phase_begin(PhaseKind::PrePaint, HostTime(5));
        let summary = builder.finish();
        assert_eq!(summary.ticks(PhaseKind::PrePaint), 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            passes: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_pass_begin(&mut self, e: &PassBeginEvent) {
                self.passes.push(e.pass_index);
            }
        }

        let mut sink = RecordingSink { passes: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.pass_begin(&sample_begin());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.passes, &[42]);
    }
}
