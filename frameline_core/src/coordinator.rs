// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinated lifecycle passes.
//!
//! [`ViewTree::update_lifecycle_phases`] brings a local root and every
//! participating view below it to a [`TargetState`]. A view participates
//! when it is local, has an active document, and is not throttled; remote
//! views end the walk, since their subtrees belong to another local root.
//!
//! A pass runs these steps:
//!
//! 1. **Throttling**: pending throttling propagation is flushed. An inactive
//!    root ends the pass with an empty report; a throttled root only updates
//!    viewport intersections.
//! 2. **Style and layout**: recursively, parent first. A view whose layout
//!    is dirtied again by its children is laid out once more, then must be
//!    clean.
//! 3. For a `LayoutClean` target, viewport intersections are updated and the
//!    pass ends here.
//! 4. **Scroll anchoring**: the anchoring queue is drained once.
//! 5. **Resize observers** (`PaintClean` only): observations are delivered
//!    and style and layout rerun, for a bounded number of rounds.
//! 6. **Compositing**, **pre-paint** (`PrePaintClean` and up) and **paint**
//!    (`PaintClean`), in pre-order.
//! 7. **Viewport intersection**: child visibility is recomputed and remote
//!    intersections are reported.
//!
//! Invalidations made by script during a pass (resize events, resize
//! observers) do not lower the state of participating views. When the pass
//! ends, views left with outstanding work are pulled back down and request
//! another visual update.
//!
//! Post-layout work (fragment anchor scrolling, resize events) normally runs
//! right after each layout. When it dirties layout again, or runs nested in
//! itself, a zero-delay task is posted instead and the embedder runs it with
//! [`ViewTree::run_posted_tasks`].

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::client::{FrameClient, PrePaintInput};
use crate::dirty;
use crate::error::InvariantError;
use crate::lifecycle::{LifecycleState, TargetState};
use crate::observer::ObserverRegistry;
use crate::scroll::AnchorAdjustment;
use crate::throttle::ThrottleTransition;
use crate::trace::{
    AnchorAdjustEvent, PassBeginEvent, PassSummaryBuilder, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, ThrottleChangeEvent, Tracer,
};
#[cfg(feature = "trace-rich")]
use crate::trace::{ViewWork, WorkKind};
use crate::view::{INVALID, ViewId, ViewTree};

// ---------------------------------------------------------------------------
// Posted tasks
// ---------------------------------------------------------------------------

/// Work deferred to a zero-delay task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// Post-layout tasks of one view.
    PostLayout,
}

/// FIFO of posted tasks, at most one per view and kind.
#[derive(Clone, Debug, Default)]
pub(crate) struct TaskQueue {
    queue: VecDeque<(u32, TaskKind)>,
}

impl TaskQueue {
    pub(crate) fn post(&mut self, idx: u32, kind: TaskKind) {
        if !self.contains(idx, kind) {
            self.queue.push_back((idx, kind));
        }
    }

    pub(crate) fn contains(&self, idx: u32, kind: TaskKind) -> bool {
        self.queue.contains(&(idx, kind))
    }

    /// Removes a posted task. Returns `false` if it was not posted.
    pub(crate) fn remove(&mut self, idx: u32, kind: TaskKind) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&task| task != (idx, kind));
        self.queue.len() != before
    }

    pub(crate) fn cancel_view(&mut self, idx: u32) {
        self.queue.retain(|&(i, _)| i != idx);
    }

    fn pop(&mut self) -> Option<(u32, TaskKind)> {
        self.queue.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pass context and report
// ---------------------------------------------------------------------------

/// Everything a pass borrows from the embedder.
pub struct PassContext<'a> {
    client: &'a mut dyn FrameClient,
    observers: Option<&'a mut ObserverRegistry>,
    tracer: Tracer<'a>,
}

impl fmt::Debug for PassContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassContext")
            .field("observers", &self.observers)
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}

impl<'a> PassContext<'a> {
    /// Creates a context with no observers and no tracing.
    pub fn new(client: &'a mut dyn FrameClient) -> Self {
        Self {
            client,
            observers: None,
            tracer: Tracer::none(),
        }
    }

    /// Attaches an observer registry.
    #[must_use]
    pub fn with_observers(mut self, observers: &'a mut ObserverRegistry) -> Self {
        self.observers = Some(observers);
        self
    }

    /// Attaches a tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer<'a>) -> Self {
        self.tracer = tracer;
        self
    }
}

/// What a pass did.
#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    /// Local root of the pass.
    pub root: ViewId,
    /// Requested target state.
    pub target: TargetState,
    /// Value of the tree's pass counter for this pass.
    pub pass_index: u64,
    /// Style recalculations run.
    pub style_recalcs: u32,
    /// Client layout calls, re-layouts included.
    pub layouts: u32,
    /// Compositing updates run.
    pub compositing_updates: u32,
    /// Pre-paint walks run.
    pub pre_paints: u32,
    /// Views painted.
    pub paints: u32,
    /// Throttled views whose subtrees were skipped.
    pub throttled_skipped: u32,
    /// Resize observer rounds that delivered something.
    pub resize_observer_rounds: u32,
    /// Scroll offset changes made by scroll anchoring.
    pub anchor_adjustments: Vec<AnchorAdjustment>,
    /// Throttling flips reported by this pass.
    pub throttle_transitions: Vec<ThrottleTransition>,
    /// Remote children whose viewport intersection changed; the embedder
    /// pushes these to the process rendering them.
    pub remote_intersections: Vec<(ViewId, Rect)>,
    #[cfg(feature = "trace-rich")]
    work: Vec<ViewWork>,
}

impl PassReport {
    fn new(root: ViewId, target: TargetState, pass_index: u64) -> Self {
        Self {
            root,
            target,
            pass_index,
            style_recalcs: 0,
            layouts: 0,
            compositing_updates: 0,
            pre_paints: 0,
            paints: 0,
            throttled_skipped: 0,
            resize_observer_rounds: 0,
            anchor_adjustments: Vec::new(),
            throttle_transitions: Vec::new(),
            remote_intersections: Vec::new(),
            #[cfg(feature = "trace-rich")]
            work: Vec::new(),
        }
    }

    /// Returns `true` if any rendering work ran.
    #[must_use]
    pub fn did_work(&self) -> bool {
        self.style_recalcs > 0
            || self.layouts > 0
            || self.compositing_updates > 0
            || self.pre_paints > 0
            || self.paints > 0
            || !self.anchor_adjustments.is_empty()
    }
}

/// Proof that a pass is running for `root`.
///
/// Issued once per root by `begin_pass` and consumed by `end_pass`.
#[derive(Debug)]
struct PassToken {
    root: u32,
    target: TargetState,
    index: u64,
    participants: Vec<ViewId>,
    summary: PassSummaryBuilder,
}

impl PassToken {
    fn begin_phase(&mut self, cx: &mut PassContext<'_>, phase: PhaseKind) {
        let timestamp = cx.client.now();
        self.summary.phase_begin(phase, timestamp);
        cx.tracer.phase_begin(&PhaseBeginEvent {
            pass_index: self.index,
            phase,
            timestamp,
        });
    }

    fn end_phase(&mut self, cx: &mut PassContext<'_>, phase: PhaseKind) {
        let timestamp = cx.client.now();
        self.summary.phase_end(phase, timestamp);
        cx.tracer.phase_end(&PhaseEndEvent {
            pass_index: self.index,
            phase,
            timestamp,
        });
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

impl ViewTree {
    /// Brings the local root `root` and every participating view below it to
    /// `target`.
    ///
    /// An inactive root document is not an error: the pass does nothing and
    /// returns an empty report.
    ///
    /// # Errors
    ///
    /// - [`InvariantError::RemoteView`] if `root` is a remote view.
    /// - [`InvariantError::NotLocalRoot`] if `root` has a local parent.
    /// - [`InvariantError::Reentrant`] if a pass for `root` is already
    ///   running (for example when called from a resize event handler).
    /// - [`InvariantError::DirtyLayout`] or
    ///   [`InvariantError::InvalidTransition`] if a view could not be
    ///   brought to a clean state. Views left mid-phase are pulled back to
    ///   [`LifecycleState::VisualUpdatePending`].
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn update_lifecycle_phases(
        &mut self,
        root: ViewId,
        target: TargetState,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.validate(root);
        let Some(local_root) = self.local_root_idx(root.idx) else {
            return Err(InvariantError::RemoteView { view: root });
        };
        if local_root != root.idx {
            return Err(InvariantError::NotLocalRoot {
                view: root,
                local_root: self.id_at(local_root),
            });
        }

        let begin = PassBeginEvent {
            pass_index: self.pass_count,
            root,
            target,
            timestamp: cx.client.now(),
        };
        let mut token = self.begin_pass(root.idx, target, &begin)?;
        cx.tracer.pass_begin(&begin);
        let mut report = PassReport::new(root, target, token.index);
        let result = self.run_pass(&mut token, cx, &mut report);
        self.end_pass(token, result.is_err(), cx, &mut report);
        result.map(|()| report)
    }

    /// Runs every phase for the local root of `view`.
    ///
    /// # Errors
    ///
    /// See [`update_lifecycle_phases`](Self::update_lifecycle_phases).
    pub fn update_all_lifecycle_phases(
        &mut self,
        view: ViewId,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.update_lifecycle_of_local_root(view, TargetState::PaintClean, cx)
    }

    /// Runs everything but paint for the local root of `view`.
    ///
    /// # Errors
    ///
    /// See [`update_lifecycle_phases`](Self::update_lifecycle_phases).
    pub fn update_all_lifecycle_phases_except_paint(
        &mut self,
        view: ViewId,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.update_lifecycle_of_local_root(view, TargetState::PrePaintClean, cx)
    }

    /// Runs style, layout, and compositing for the local root of `view`.
    ///
    /// # Errors
    ///
    /// See [`update_lifecycle_phases`](Self::update_lifecycle_phases).
    pub fn update_lifecycle_to_compositing_clean(
        &mut self,
        view: ViewId,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.update_lifecycle_of_local_root(view, TargetState::CompositingClean, cx)
    }

    /// Runs style and layout for the local root of `view`.
    ///
    /// # Errors
    ///
    /// See [`update_lifecycle_phases`](Self::update_lifecycle_phases).
    pub fn update_lifecycle_to_layout_clean(
        &mut self,
        view: ViewId,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.update_lifecycle_of_local_root(view, TargetState::LayoutClean, cx)
    }

    /// Runs the post-layout tasks posted by earlier layouts, in posting
    /// order. Returns how many ran.
    ///
    /// Tasks only run between passes; called from inside a pass this does
    /// nothing.
    pub fn run_posted_tasks(&mut self, cx: &mut PassContext<'_>) -> usize {
        if !self.active_roots.is_empty() {
            return 0;
        }
        let mut ran = 0;
        while let Some((idx, kind)) = self.tasks.pop() {
            if !self.alive[idx as usize]
                || !self.is_local_idx(idx)
                || !self.document_is_active(idx)
            {
                continue;
            }
            match kind {
                TaskKind::PostLayout => self.perform_post_layout_tasks(idx, &mut *cx.client),
            }
            ran += 1;
        }
        ran
    }

    /// Returns `true` while posted tasks wait for
    /// [`run_posted_tasks`](Self::run_posted_tasks).
    #[must_use]
    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Returns `true` while a pass is running for `root`.
    #[must_use]
    pub fn is_updating_lifecycle(&self, root: ViewId) -> bool {
        self.validate(root);
        self.active_roots.contains(&root.idx)
    }

    fn update_lifecycle_of_local_root(
        &mut self,
        view: ViewId,
        target: TargetState,
        cx: &mut PassContext<'_>,
    ) -> Result<PassReport, InvariantError> {
        self.validate(view);
        let Some(root) = self.local_root_idx(view.idx) else {
            return Err(InvariantError::RemoteView { view });
        };
        let root = self.id_at(root);
        self.update_lifecycle_phases(root, target, cx)
    }

    // -- Pass bracketing --

    fn begin_pass(
        &mut self,
        root: u32,
        target: TargetState,
        begin: &PassBeginEvent,
    ) -> Result<PassToken, InvariantError> {
        if self.active_roots.contains(&root) {
            return Err(InvariantError::Reentrant {
                root: self.id_at(root),
            });
        }
        self.active_roots.push(root);
        let index = self.pass_count;
        self.pass_count += 1;
        Ok(PassToken {
            root,
            target,
            index,
            participants: Vec::new(),
            summary: PassSummaryBuilder::new(begin),
        })
    }

    fn end_pass(
        &mut self,
        token: PassToken,
        failed: bool,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) {
        for &view in &token.participants {
            if !self.is_alive(view) {
                continue;
            }
            self.in_pass[view.idx as usize] = false;
            if failed && self.state_at(view.idx).is_some_and(LifecycleState::is_in_phase) {
                self.lower_lifecycle(view.idx, LifecycleState::VisualUpdatePending);
            }
            self.reconcile_lifecycle(view.idx);
        }
        self.active_roots.retain(|&r| r != token.root);

        let transitions = core::mem::take(&mut self.throttle_transitions);
        for transition in &transitions {
            if let Some(observers) = cx.observers.as_deref_mut() {
                observers.throttling_changed(transition);
            }
            cx.tracer.throttle_change(&ThrottleChangeEvent {
                pass_index: token.index,
                view: transition.view,
                throttled: transition.throttled,
            });
        }
        report.throttle_transitions = transitions;

        #[cfg(feature = "trace-rich")]
        cx.tracer.view_work(token.index, &report.work);
        let mut summary = token.summary;
        summary.set_work(report.layouts, report.paints, report.throttled_skipped);
        cx.tracer.pass_summary(&summary.finish());

        if let Some(observers) = cx.observers.as_deref_mut() {
            observers.did_update_lifecycle(self, report.root, report);
        }
    }

    /// Pulls a view with work left over from a pass back down so the next
    /// pass picks it up.
    fn reconcile_lifecycle(&mut self, idx: u32) {
        let Some(state) = self.state_at(idx) else {
            return;
        };
        if !state.is_active() {
            return;
        }
        let layout = &self.layout[idx as usize];
        let paint = &self.paint[idx as usize];
        let lowered = if layout.needs_layout() {
            if layout.is_subtree_layout() {
                LifecycleState::StyleClean
            } else {
                LifecycleState::VisualUpdatePending
            }
        } else if (state >= LifecycleState::PrePaintClean && paint.needs_pre_paint())
            || (state >= LifecycleState::PaintClean && !paint.damage.is_empty())
        {
            LifecycleState::CompositingClean
        } else {
            return;
        };
        self.regress_lifecycle(idx, lowered);
        if !self.should_throttle_idx(idx) {
            self.request_visual_update(idx);
        }
    }

    // -- Pass body --

    fn run_pass(
        &mut self,
        token: &mut PassToken,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let root = token.root;
        let target = token.target;
        if let Some(observers) = cx.observers.as_deref_mut() {
            observers.will_update_lifecycle(self, report.root, target);
        }

        self.flush_throttling();
        if !self.document_is_active(root) {
            return Ok(());
        }
        if self.should_throttle_idx(root) {
            report.throttled_skipped += 1;
            self.viewport_intersection_phase(token, cx, report);
            return Ok(());
        }

        let mut participants = Vec::new();
        self.collect_participants(root, &mut participants, &mut report.throttled_skipped);
        for view in &participants {
            self.in_pass[view.idx as usize] = true;
        }
        token.participants = participants;

        token.begin_phase(cx, PhaseKind::StyleAndLayout);
        self.update_style_and_layout_recursive(root, cx, report)?;
        token.end_phase(cx, PhaseKind::StyleAndLayout);

        if target == TargetState::LayoutClean {
            self.viewport_intersection_phase(token, cx, report);
            return Ok(());
        }

        token.begin_phase(cx, PhaseKind::ScrollAnchoring);
        self.apply_scroll_anchoring(token.root, token.index, cx, report);
        token.end_phase(cx, PhaseKind::ScrollAnchoring);

        if target == TargetState::PaintClean {
            token.begin_phase(cx, PhaseKind::ResizeObservers);
            self.notify_resize_observers(token, cx, report)?;
            token.end_phase(cx, PhaseKind::ResizeObservers);
        }

        for &view in &token.participants {
            if self.participates(view) {
                self.check_layout_clean(view.idx)?;
            }
        }

        token.begin_phase(cx, PhaseKind::Compositing);
        for &view in &token.participants {
            if !self.participates(view) || !self.state_below(view.idx, LifecycleState::CompositingClean) {
                continue;
            }
            self.advance_lifecycle(view.idx, LifecycleState::InCompositingUpdate)?;
            cx.client.update_compositing(self, view);
            self.advance_lifecycle(view.idx, LifecycleState::CompositingClean)?;
            report.compositing_updates += 1;
            #[cfg(feature = "trace-rich")]
            report.work.push(ViewWork {
                view_index: view.idx,
                kind: WorkKind::Compositing,
            });
        }
        token.end_phase(cx, PhaseKind::Compositing);

        if target >= TargetState::PrePaintClean {
            token.begin_phase(cx, PhaseKind::PrePaint);
            self.pre_paint_phase(token, cx, report)?;
            token.end_phase(cx, PhaseKind::PrePaint);
        }

        if target == TargetState::PaintClean {
            token.begin_phase(cx, PhaseKind::Paint);
            for &view in &token.participants {
                if !self.participates(view) || !self.state_below(view.idx, LifecycleState::PaintClean) {
                    continue;
                }
                self.advance_lifecycle(view.idx, LifecycleState::InPaint)?;
                let damage = core::mem::take(&mut self.paint[view.idx as usize].damage);
                cx.client.paint(self, view, &damage);
                self.advance_lifecycle(view.idx, LifecycleState::PaintClean)?;
                report.paints += 1;
                #[cfg(feature = "trace-rich")]
                report.work.push(ViewWork {
                    view_index: view.idx,
                    kind: WorkKind::Paint,
                });
            }
            token.end_phase(cx, PhaseKind::Paint);
        }

        self.viewport_intersection_phase(token, cx, report);
        Ok(())
    }

    /// Collects the views that take part in a pass from `idx` down, in
    /// pre-order. Remote views end the walk; throttled views are counted and
    /// skipped together with their subtrees.
    fn collect_participants(&self, idx: u32, out: &mut Vec<ViewId>, skipped: &mut u32) {
        if !self.is_local_idx(idx) {
            return;
        }
        if self.should_throttle_idx(idx) {
            *skipped += 1;
            return;
        }
        if !self.document_is_active(idx) {
            return;
        }
        out.push(self.id_at(idx));
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_participants(child, out, skipped);
            child = self.next_sibling[child as usize];
        }
    }

    /// Whether a view collected for the running pass can still do work:
    /// script may have destroyed it, detached its document, or throttled it.
    fn participates(&self, view: ViewId) -> bool {
        self.is_alive(view)
            && self.in_pass[view.idx as usize]
            && self.document_is_active(view.idx)
            && !self.should_throttle_idx(view.idx)
    }

    fn update_style_and_layout_recursive(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let view = self.id_at(idx);
        if !self.participates(view) {
            return Ok(());
        }
        self.update_style_and_layout(idx, cx, report)?;

        for child in self.child_indices(idx) {
            if self.in_pass[child as usize] {
                self.update_style_and_layout_recursive(child, cx, report)?;
            }
        }

        // Children may have dirtied the parent again.
        if !self.participates(view) {
            return Ok(());
        }
        self.update_style_and_layout(idx, cx, report)?;
        self.check_layout_clean(idx)?;
        if self.state_below(idx, LifecycleState::LayoutClean)
            || self.state_at(idx) == Some(LifecycleState::AfterPerformLayout)
        {
            self.advance_lifecycle(idx, LifecycleState::LayoutClean)?;
        }
        Ok(())
    }

    fn update_style_and_layout(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        if self.state_below(idx, LifecycleState::StyleClean) {
            self.update_style(idx, cx, report)?;
        }
        if self.layout[idx as usize].needs_layout() {
            self.layout_view(idx, cx, report)?;
        }
        Ok(())
    }

    /// Runs style recalc unless the view is already at `StyleClean`.
    ///
    /// A view that needs style or layout again after it got past
    /// `LayoutClean` in this pass re-enters at `LayoutClean`.
    fn update_style(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let Some(state) = self.state_at(idx) else {
            return Ok(());
        };
        if state == LifecycleState::StyleClean {
            return Ok(());
        }
        if state > LifecycleState::LayoutClean {
            self.lower_lifecycle(idx, LifecycleState::LayoutClean);
        }
        let view = self.id_at(idx);
        self.advance_lifecycle(idx, LifecycleState::InStyleRecalc)?;
        cx.client.recalc_style(self, view);
        self.advance_lifecycle(idx, LifecycleState::StyleClean)?;
        report.style_recalcs += 1;
        #[cfg(feature = "trace-rich")]
        report.work.push(ViewWork {
            view_index: idx,
            kind: WorkKind::StyleRecalc,
        });
        Ok(())
    }

    fn check_layout_clean(&self, idx: u32) -> Result<(), InvariantError> {
        if self.should_throttle_idx(idx) {
            return Ok(());
        }
        self.check_does_not_need_layout(self.id_at(idx))
    }

    // -- Layout --

    /// Lays out one view, then runs or posts its post-layout tasks.
    ///
    /// Does nothing while the view is already in layout, throttled, or
    /// inactive.
    fn layout_view(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        if self.state_at(idx) == Some(LifecycleState::InPerformLayout)
            || self.should_throttle_idx(idx)
            || !self.document_is_active(idx)
        {
            return Ok(());
        }
        let i = idx as usize;
        self.layout[i].pending = false;

        // Pre-layout tasks: a posted post-layout task runs now, outside of any
        // layout.
        let layout = &self.layout[i];
        if layout.nested_layout_count == 0
            && !layout.in_synchronous_post_layout
            && self.tasks.contains(idx, TaskKind::PostLayout)
        {
            self.layout[i].in_synchronous_post_layout = true;
            self.perform_post_layout_tasks(idx, &mut *cx.client);
            self.layout[i].in_synchronous_post_layout = false;
            if !self.document_is_active(idx) || self.should_throttle_idx(idx) {
                return Ok(());
            }
        }
        self.update_style(idx, cx, report)?;
        self.save_scroll_anchor(idx, &*cx.client);

        self.layout[i].scheduling_enabled = false;
        self.layout[i].nested_layout_count += 1;
        let mut result = self.perform_layout(idx, cx, report);
        self.layout[i].scheduling_enabled = true;
        if result.is_ok() {
            result = self.schedule_or_perform_post_layout_tasks(idx, cx, report);
        }
        self.layout[i].nested_layout_count -= 1;
        result?;

        if self.state_at(idx) == Some(LifecycleState::AfterPerformLayout) {
            self.advance_lifecycle(idx, LifecycleState::LayoutClean)?;
        }
        Ok(())
    }

    fn perform_layout(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let i = idx as usize;
        let view = self.id_at(idx);
        self.advance_lifecycle(idx, LifecycleState::InPerformLayout)?;

        let scope = self.layout[i].take_scope();
        let output = cx.client.layout(self, view, &scope);
        report.layouts += 1;
        self.set_contents_size_idx(idx, output.contents_size);

        // Scrollbars that appeared or disappeared change the available space.
        let limit = self.config.scrollbar_pass_limit(false);
        let mut passes = 1;
        while self.layout[i].needs_full_layout && passes < limit {
            passes += 1;
            let scope = self.layout[i].take_scope();
            let output = cx.client.layout(self, view, &scope);
            report.layouts += 1;
            self.set_contents_size_idx(idx, output.contents_size);
        }
        // Out of passes: the last scrollbar decision stands.
        self.layout[i].needs_full_layout = false;
        #[cfg(feature = "trace-rich")]
        report.work.push(ViewWork {
            view_index: idx,
            kind: WorkKind::Layout,
        });

        self.layout[i].layout_count += 1;
        self.scroll[i].resize = None;
        self.advance_lifecycle(idx, LifecycleState::AfterPerformLayout)?;
        self.queue_scroll_anchoring(idx);
        Ok(())
    }

    /// Runs post-layout tasks right away unless they are already running;
    /// if layout is dirty again afterwards, or this call is nested in them,
    /// posts a task and lays out once more.
    fn schedule_or_perform_post_layout_tasks(
        &mut self,
        idx: u32,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let i = idx as usize;
        if self.tasks.contains(idx, TaskKind::PostLayout) {
            return Ok(());
        }
        if !self.layout[i].in_synchronous_post_layout {
            self.layout[i].in_synchronous_post_layout = true;
            self.perform_post_layout_tasks(idx, &mut *cx.client);
            self.layout[i].in_synchronous_post_layout = false;
        }
        let needs_layout = self.layout[i].needs_layout();
        if !self.tasks.contains(idx, TaskKind::PostLayout)
            && (needs_layout || self.layout[i].in_synchronous_post_layout)
        {
            self.tasks.post(idx, TaskKind::PostLayout);
            if needs_layout {
                self.layout_view(idx, cx, report)?;
            }
        }
        Ok(())
    }

    fn perform_post_layout_tasks(&mut self, idx: u32, client: &mut dyn FrameClient) {
        self.tasks.remove(idx, TaskKind::PostLayout);
        self.scroll_to_fragment_anchor_idx(idx, &*client);
        self.send_resize_event_if_needed(idx, client);
    }

    // -- Later phases --

    /// Delivers resize observations and reruns style and layout until
    /// nothing is delivered or the round limit is hit. Hitting the limit
    /// leaves the remaining observations for the next frame.
    fn notify_resize_observers(
        &mut self,
        token: &PassToken,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let max = u32::from(self.config.max_resize_observer_rounds);
        while report.resize_observer_rounds < max {
            let mut delivered = false;
            for &view in &token.participants {
                if self.participates(view) {
                    delivered |= cx.client.deliver_resize_observations(self, view);
                }
            }
            if !delivered {
                return Ok(());
            }
            report.resize_observer_rounds += 1;
            self.update_style_and_layout_recursive(token.root, cx, report)?;
            self.apply_scroll_anchoring(token.root, token.index, cx, report);
        }
        if max > 0 {
            self.request_visual_update(token.root);
        }
        Ok(())
    }

    /// Drains the anchoring queue under `root` into the report.
    fn apply_scroll_anchoring(
        &mut self,
        root: u32,
        pass_index: u64,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) {
        let adjustments = self.perform_scroll_anchoring(root, &*cx.client);
        for adjustment in &adjustments {
            cx.tracer.anchor_adjust(&AnchorAdjustEvent {
                pass_index,
                view: adjustment.view,
                node: adjustment.node,
                delta: adjustment.delta,
            });
        }
        report.anchor_adjustments.extend(adjustments);
    }

    fn pre_paint_phase(
        &mut self,
        token: &PassToken,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) -> Result<(), InvariantError> {
        let marked: Vec<u32> = self
            .dirty
            .drain(dirty::PAINT_PROPERTY)
            .deterministic()
            .run()
            .collect();
        for idx in marked {
            if !self.alive[idx as usize] || !self.is_local_idx(idx) {
                continue;
            }
            if self.in_pass[idx as usize] {
                self.paint[idx as usize].needs_paint_property_update = true;
            } else {
                // Throttled or owned by another local root.
                self.dirty.mark(idx, dirty::PAINT_PROPERTY);
            }
        }

        for &view in &token.participants {
            if !self.participates(view) || !self.state_below(view.idx, LifecycleState::PrePaintClean) {
                continue;
            }
            let i = view.idx as usize;
            self.advance_lifecycle(view.idx, LifecycleState::InPrePaint)?;
            let input = PrePaintInput {
                needs_paint_property_update: self.paint[i].needs_paint_property_update,
                candidates: core::mem::take(&mut self.paint[i].candidates)
                    .into_iter()
                    .collect(),
            };
            cx.client.pre_paint(self, view, &input);
            self.paint[i].needs_paint_property_update = false;
            self.advance_lifecycle(view.idx, LifecycleState::PrePaintClean)?;
            report.pre_paints += 1;
            #[cfg(feature = "trace-rich")]
            report.work.push(ViewWork {
                view_index: view.idx,
                kind: WorkKind::PrePaint,
            });
        }
        Ok(())
    }

    fn viewport_intersection_phase(
        &mut self,
        token: &mut PassToken,
        cx: &mut PassContext<'_>,
        report: &mut PassReport,
    ) {
        token.begin_phase(cx, PhaseKind::ViewportIntersection);
        report.remote_intersections = self.update_viewport_intersections(token.root);
        token.end_phase(cx, PhaseKind::ViewportIntersection);
    }

    // -- Lifecycle helpers --

    fn state_at(&self, idx: u32) -> Option<LifecycleState> {
        self.document[idx as usize]
            .as_ref()
            .map(|d| d.lifecycle.state())
    }

    fn state_below(&self, idx: u32, state: LifecycleState) -> bool {
        self.state_at(idx).is_some_and(|s| s < state)
    }

    fn advance_lifecycle(&mut self, idx: u32, state: LifecycleState) -> Result<(), InvariantError> {
        match &mut self.document[idx as usize] {
            Some(document) => document.lifecycle.advance_to(state),
            None => Ok(()),
        }
    }

    /// Lowers the state regardless of pass participation.
    fn lower_lifecycle(&mut self, idx: u32, state: LifecycleState) {
        if let Some(document) = &mut self.document[idx as usize] {
            document.lifecycle.ensure_state_at_most(state);
        }
    }
}
