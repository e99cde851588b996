// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Per-view work ([`on_view_work`](TraceSink::on_view_work)) is stored as one
//! count per [`WorkKind`].

use frameline_core::lifecycle::TargetState;
use frameline_core::time::HostTime;
use frameline_core::trace::{
    AnchorAdjustEvent, PassBeginEvent, PassSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ThrottleChangeEvent, TraceSink, ViewWork, WorkKind,
};
use frameline_core::view::{NodeId, ViewId};
use kurbo::Vec2;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PASS_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_THROTTLE_CHANGE: u8 = 4;
const TAG_ANCHOR_ADJUST: u8 = 5;
const TAG_PASS_SUMMARY: u8 = 6;
const TAG_VIEW_WORK_COUNTS: u8 = 7;

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

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_view(&mut self, v: ViewId) {
        self.write_u32(v.index());
        self.write_u32(v.generation());
    }

    fn write_target(&mut self, t: TargetState) {
        self.write_u8(match t {
            TargetState::LayoutClean => 0,
            TargetState::CompositingClean => 1,
            TargetState::PrePaintClean => 2,
            TargetState::PaintClean => 3,
        });
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::StyleAndLayout => 0,
            PhaseKind::ScrollAnchoring => 1,
            PhaseKind::ResizeObservers => 2,
            PhaseKind::Compositing => 3,
            PhaseKind::PrePaint => 4,
            PhaseKind::Paint => 5,
            PhaseKind::ViewportIntersection => 6,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_u8(TAG_PASS_BEGIN);
        self.write_u64(e.pass_index);
        self.write_view(e.root);
        self.write_target(e.target);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.pass_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.pass_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_throttle_change(&mut self, e: &ThrottleChangeEvent) {
        self.write_u8(TAG_THROTTLE_CHANGE);
        self.write_u64(e.pass_index);
        self.write_view(e.view);
        self.write_u8(u8::from(e.throttled));
    }

    fn on_anchor_adjust(&mut self, e: &AnchorAdjustEvent) {
        self.write_u8(TAG_ANCHOR_ADJUST);
        self.write_u64(e.pass_index);
        self.write_view(e.view);
        self.write_u32(e.node.0);
        self.write_f64(e.delta.x);
        self.write_f64(e.delta.y);
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        self.write_u8(TAG_PASS_SUMMARY);
        self.write_u64(s.pass_index);
        self.write_view(s.root);
        self.write_target(s.target);
        self.write_u64(s.start.ticks());
        for ticks in s.phase_ticks {
            self.write_u64(ticks);
        }
        self.write_u32(s.layouts);
        self.write_u32(s.paints);
        self.write_u32(s.throttled_skipped);
    }

    fn on_view_work(&mut self, pass_index: u64, work: &[ViewWork]) {
        let mut counts = WorkCounts::default();
        for w in work {
            let slot = match w.kind {
                WorkKind::StyleRecalc => &mut counts.style_recalcs,
                WorkKind::Layout => &mut counts.layouts,
                WorkKind::Compositing => &mut counts.compositing_updates,
                WorkKind::PrePaint => &mut counts.pre_paints,
                WorkKind::Paint => &mut counts.paints,
            };
            *slot = slot.saturating_add(1);
        }
        self.write_u8(TAG_VIEW_WORK_COUNTS);
        self.write_u64(pass_index);
        self.write_u32(counts.style_recalcs);
        self.write_u32(counts.layouts);
        self.write_u32(counts.compositing_updates);
        self.write_u32(counts.pre_paints);
        self.write_u32(counts.paints);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Per-kind totals of the view work recorded for one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkCounts {
    /// Views whose style was recalculated.
    pub style_recalcs: u32,
    /// Views laid out.
    pub layouts: u32,
    /// Views whose compositing inputs were updated.
    pub compositing_updates: u32,
    /// Views walked by pre-paint.
    pub pre_paints: u32,
    /// Views painted.
    pub paints: u32,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`ThrottleChangeEvent`].
    ThrottleChange(ThrottleChangeEvent),
    /// An [`AnchorAdjustEvent`].
    AnchorAdjust(AnchorAdjustEvent),
    /// A [`PassSummary`].
    PassSummary(PassSummary),
    /// View work totals for a pass.
    ViewWorkCounts {
        /// Pass counter.
        pass_index: u64,
        /// Totals per work kind.
        counts: WorkCounts,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
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
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_view(&mut self) -> Option<ViewId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(ViewId::from_raw(index, generation))
    }

    fn read_target(&mut self) -> Option<TargetState> {
        Some(match self.read_u8()? {
            0 => TargetState::LayoutClean,
            1 => TargetState::CompositingClean,
            2 => TargetState::PrePaintClean,
            _ => TargetState::PaintClean,
        })
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            pass_index: self.read_u64()?,
            root: self.read_view()?,
            target: self.read_target()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            pass_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            pass_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: HostTime(self.read_u64()?),
        }))
    }

    fn decode_throttle_change(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ThrottleChange(ThrottleChangeEvent {
            pass_index: self.read_u64()?,
            view: self.read_view()?,
            throttled: self.read_u8()? != 0,
        }))
    }

    fn decode_anchor_adjust(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::AnchorAdjust(AnchorAdjustEvent {
            pass_index: self.read_u64()?,
            view: self.read_view()?,
            node: NodeId(self.read_u32()?),
            delta: Vec2::new(self.read_f64()?, self.read_f64()?),
        }))
    }

    fn decode_pass_summary(&mut self) -> Option<RecordedEvent> {
        let pass_index = self.read_u64()?;
        let root = self.read_view()?;
        let target = self.read_target()?;
        let start = HostTime(self.read_u64()?);
        let mut phase_ticks = [0; PhaseKind::ALL.len()];
        for ticks in &mut phase_ticks {
            *ticks = self.read_u64()?;
        }
        Some(RecordedEvent::PassSummary(PassSummary {
            pass_index,
            root,
            target,
            start,
            phase_ticks,
            layouts: self.read_u32()?,
            paints: self.read_u32()?,
            throttled_skipped: self.read_u32()?,
        }))
    }

    fn decode_view_work_counts(&mut self) -> Option<RecordedEvent> {
        let pass_index = self.read_u64()?;
        let counts = WorkCounts {
            style_recalcs: self.read_u32()?,
            layouts: self.read_u32()?,
            compositing_updates: self.read_u32()?,
            pre_paints: self.read_u32()?,
            paints: self.read_u32()?,
        };
        Some(RecordedEvent::ViewWorkCounts { pass_index, counts })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_THROTTLE_CHANGE => self.decode_throttle_change(),
            TAG_ANCHOR_ADJUST => self.decode_anchor_adjust(),
            TAG_PASS_SUMMARY => self.decode_pass_summary(),
            TAG_VIEW_WORK_COUNTS => self.decode_view_work_counts(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
