// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document lifecycle states.
//!
//! A document moves through an ordered sequence of states as rendering work
//! completes. The `In*` states mark a phase that is running; the `*Clean`
//! states mark a phase whose output is up to date:
//!
//! ```text
//!   Uninitialized ─► Inactive ─► VisualUpdatePending
//!        ─► InStyleRecalc ─► StyleClean
//!        ─► InPerformLayout ─► AfterPerformLayout ─► LayoutClean
//!        ─► InCompositingUpdate ─► CompositingClean
//!        ─► InPrePaint ─► PrePaintClean
//!        ─► InPaint ─► PaintClean
//!   (any) ─► Stopping ─► Stopped
//! ```
//!
//! Inside a coordinated pass a document only moves forward, with one
//! exception: a view whose layout was dirtied again by script during the
//! pass (post-layout work, resize observers) goes from `AfterPerformLayout`
//! or `LayoutClean` back into style recalc and layout. A view that had
//! already got further is first dropped to `LayoutClean`. Between passes,
//! invalidations pull the state back down with
//! [`DocumentLifecycle::ensure_state_at_most`].

use crate::error::InvariantError;

/// How far rendering preparation has progressed for a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// The document has not been set up.
    Uninitialized,
    /// The document exists but is not attached to a view.
    Inactive,
    /// Attached and waiting for the next lifecycle pass.
    VisualUpdatePending,
    /// Style recalculation is running.
    InStyleRecalc,
    /// Computed style is up to date.
    StyleClean,
    /// Layout is running.
    InPerformLayout,
    /// Layout finished; post-layout work may still be pending.
    AfterPerformLayout,
    /// Layout is up to date.
    LayoutClean,
    /// The compositing update is running.
    InCompositingUpdate,
    /// Compositing inputs are up to date.
    CompositingClean,
    /// The paint invalidation walk is running.
    InPrePaint,
    /// Paint invalidation and paint properties are up to date.
    PrePaintClean,
    /// Paint is running.
    InPaint,
    /// Everything is up to date.
    PaintClean,
    /// The document is being torn down.
    Stopping,
    /// The document has been torn down.
    Stopped,
}

impl LifecycleState {
    /// Returns `true` for the states in which lifecycle work may run.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        let v = self as u8;
        v >= Self::VisualUpdatePending as u8 && v <= Self::PaintClean as u8
    }

    /// Returns `true` for the transitional `In*` states.
    #[must_use]
    pub const fn is_in_phase(self) -> bool {
        matches!(
            self,
            Self::InStyleRecalc
                | Self::InPerformLayout
                | Self::AfterPerformLayout
                | Self::InCompositingUpdate
                | Self::InPrePaint
                | Self::InPaint
        )
    }
}

/// The state a coordinated pass is asked to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetState {
    /// Stop after style and layout.
    LayoutClean,
    /// Also run the compositing update.
    CompositingClean,
    /// Also run the paint invalidation walk.
    PrePaintClean,
    /// Run every phase.
    PaintClean,
}

impl TargetState {
    /// Returns the lifecycle state reached when this target is met.
    #[inline]
    #[must_use]
    pub const fn state(self) -> LifecycleState {
        match self {
            Self::LayoutClean => LifecycleState::LayoutClean,
            Self::CompositingClean => LifecycleState::CompositingClean,
            Self::PrePaintClean => LifecycleState::PrePaintClean,
            Self::PaintClean => LifecycleState::PaintClean,
        }
    }
}

/// Lifecycle bookkeeping owned by one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentLifecycle {
    state: LifecycleState,
}

impl Default for DocumentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLifecycle {
    /// Creates a lifecycle in [`LifecycleState::Uninitialized`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns `true` while lifecycle work may run for this document.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Returns whether moving to `next` is a legal transition.
    #[must_use]
    pub fn can_advance_to(&self, next: LifecycleState) -> bool {
        use LifecycleState as S;
        match (self.state, next) {
            (S::Stopped, _) => false,
            (_, S::Stopping) => self.state != S::Stopping,
            (S::Stopping, S::Stopped) => true,
            (_, S::Stopped) => false,
            (S::Uninitialized, S::Inactive) => true,
            (S::Inactive, S::VisualUpdatePending) => true,
            (
                S::AfterPerformLayout | S::LayoutClean,
                S::InStyleRecalc | S::InPerformLayout,
            ) => true,
            (from, to) => from.is_active() && to.is_active() && to > from,
        }
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError::InvalidTransition`] if the transition is not
    /// allowed; the state is left unchanged.
    pub fn advance_to(&mut self, next: LifecycleState) -> Result<(), InvariantError> {
        if !self.can_advance_to(next) {
            return Err(InvariantError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Pulls an active document back to at most `state`.
    ///
    /// Has no effect on inactive documents or when already at or below
    /// `state`.
    pub fn ensure_state_at_most(&mut self, state: LifecycleState) {
        if self.state.is_active() && self.state > state {
            self.state = state;
        }
    }

    /// Attaches a fresh document: `Uninitialized → Inactive →
    /// VisualUpdatePending`.
    pub(crate) fn attach(&mut self) {
        self.state = LifecycleState::VisualUpdatePending;
    }

    /// Tears the document down.
    pub fn shutdown(&mut self) {
        self.state = LifecycleState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> DocumentLifecycle {
        let mut lc = DocumentLifecycle::new();
        lc.advance_to(LifecycleState::Inactive).unwrap();
        lc.advance_to(LifecycleState::VisualUpdatePending).unwrap();
        lc
    }

    #[test]
    fn states_are_totally_ordered() {
        assert!(LifecycleState::StyleClean < LifecycleState::LayoutClean);
        assert!(LifecycleState::LayoutClean < LifecycleState::CompositingClean);
        assert!(LifecycleState::CompositingClean < LifecycleState::PrePaintClean);
        assert!(LifecycleState::PrePaintClean < LifecycleState::PaintClean);
        assert!(TargetState::LayoutClean < TargetState::PaintClean);
    }

    #[test]
    fn walks_forward_through_every_phase() {
        let mut lc = active();
        for next in [
            LifecycleState::InStyleRecalc,
            LifecycleState::StyleClean,
            LifecycleState::InPerformLayout,
            LifecycleState::AfterPerformLayout,
            LifecycleState::LayoutClean,
            LifecycleState::InCompositingUpdate,
            LifecycleState::CompositingClean,
            LifecycleState::InPrePaint,
            LifecycleState::PrePaintClean,
            LifecycleState::InPaint,
            LifecycleState::PaintClean,
        ] {
            lc.advance_to(next).unwrap();
        }
        assert_eq!(lc.state(), LifecycleState::PaintClean);
    }

    #[test]
    fn backwards_transition_is_rejected() {
        let mut lc = active();
        lc.advance_to(LifecycleState::PrePaintClean).unwrap();
        let err = lc.advance_to(LifecycleState::InCompositingUpdate).unwrap_err();
        assert_eq!(
            err,
            InvariantError::InvalidTransition {
                from: LifecycleState::PrePaintClean,
                to: LifecycleState::InCompositingUpdate,
            }
        );
        assert_eq!(lc.state(), LifecycleState::PrePaintClean);
    }

    #[test]
    fn relayout_may_reenter_layout() {
        let mut lc = active();
        lc.advance_to(LifecycleState::AfterPerformLayout).unwrap();
        lc.advance_to(LifecycleState::InPerformLayout).unwrap();
        lc.advance_to(LifecycleState::LayoutClean).unwrap();
        lc.advance_to(LifecycleState::InStyleRecalc).unwrap();
    }

    #[test]
    fn same_state_is_not_a_transition() {
        let mut lc = active();
        lc.advance_to(LifecycleState::StyleClean).unwrap();
        assert!(lc.advance_to(LifecycleState::StyleClean).is_err());
    }

    #[test]
    fn ensure_state_at_most_only_lowers() {
        let mut lc = active();
        lc.advance_to(LifecycleState::PaintClean).unwrap();
        lc.ensure_state_at_most(LifecycleState::CompositingClean);
        assert_eq!(lc.state(), LifecycleState::CompositingClean);
        lc.ensure_state_at_most(LifecycleState::PaintClean);
        assert_eq!(lc.state(), LifecycleState::CompositingClean);
    }

    #[test]
    fn stopped_document_is_inert() {
        let mut lc = active();
        lc.shutdown();
        assert_eq!(lc.state(), LifecycleState::Stopped);
        assert!(!lc.is_active());
        lc.ensure_state_at_most(LifecycleState::VisualUpdatePending);
        assert_eq!(lc.state(), LifecycleState::Stopped);
        assert!(lc.advance_to(LifecycleState::InStyleRecalc).is_err());
    }
}
