// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout and paint invalidation tracking.
//!
//! Each local view owns a [`LayoutInvalidation`] and a
//! [`PaintInvalidation`]. They record what has to be recomputed before the
//! view's document can be clean again, and are emptied by the corresponding
//! coordinator phase:
//!
//! - Layout: either the whole view needs layout, or only a set of layout
//!   subtree roots does. Structural changes that make partial tracking
//!   unsound fall back to a full layout.
//! - Paint: accumulated [`DamageRegion`], candidate nodes for the paint
//!   invalidation walk, and paint property rebuilds. Subtree-wide paint
//!   property updates go through [`dirty::PAINT_PROPERTY`] so they reach
//!   nested views.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::Rect;
use understory_dirty::EagerPolicy;

use crate::dirty;
use crate::error::InvariantError;
use crate::lifecycle::LifecycleState;
use crate::view::{NodeId, ViewId, ViewTree};

/// Layout bookkeeping for one local view.
#[derive(Clone, Debug)]
pub struct LayoutInvalidation {
    pub(crate) needs_full_layout: bool,
    pub(crate) subtree_roots: BTreeSet<NodeId>,
    pub(crate) orthogonal_roots: BTreeSet<NodeId>,
    pub(crate) pending: bool,
    pub(crate) scheduling_enabled: bool,
    pub(crate) nested_layout_count: u32,
    pub(crate) in_synchronous_post_layout: bool,
    pub(crate) layout_count: u32,
}

impl Default for LayoutInvalidation {
    fn default() -> Self {
        Self {
            needs_full_layout: false,
            subtree_roots: BTreeSet::new(),
            orthogonal_roots: BTreeSet::new(),
            pending: false,
            scheduling_enabled: true,
            nested_layout_count: 0,
            in_synchronous_post_layout: false,
            layout_count: 0,
        }
    }
}

impl LayoutInvalidation {
    /// A fresh document has never been laid out.
    pub(crate) fn reset_for_new_document(&mut self) {
        *self = Self {
            needs_full_layout: true,
            ..Self::default()
        };
    }

    /// Returns `true` if any layout work is outstanding.
    #[must_use]
    pub fn needs_layout(&self) -> bool {
        self.pending || self.needs_full_layout || !self.subtree_roots.is_empty()
    }

    /// Returns `true` if only subtrees need layout.
    #[must_use]
    pub fn is_subtree_layout(&self) -> bool {
        !self.needs_full_layout && !self.subtree_roots.is_empty()
    }

    /// Drops partial tracking in favour of a whole-view layout.
    fn fall_back_to_full_layout(&mut self) {
        self.subtree_roots.clear();
        self.needs_full_layout = true;
    }

    /// Returns the scope of the next layout and clears the dirty state.
    pub(crate) fn take_scope(&mut self) -> LayoutScope {
        let scope = if self.needs_full_layout || self.subtree_roots.is_empty() {
            LayoutScope::Full
        } else {
            let mut roots: Vec<NodeId> = self.orthogonal_roots.iter().copied().collect();
            for &root in &self.subtree_roots {
                if !self.orthogonal_roots.contains(&root) {
                    roots.push(root);
                }
            }
            LayoutScope::Subtrees(roots)
        };
        self.needs_full_layout = false;
        self.subtree_roots.clear();
        self.pending = false;
        scope
    }
}

/// What a single layout call has to cover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutScope {
    /// Lay out the whole view from its root.
    Full,
    /// Lay out only these roots: orthogonal writing-mode roots first, then
    /// the recorded layout subtree roots.
    Subtrees(Vec<NodeId>),
}

/// A region of a view that needs repainting.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// Nothing changed; the previous paint can be reused.
    #[default]
    None,
    /// Axis-aligned rectangles in the view's content coordinates.
    Rects(Vec<Rect>),
    /// The whole view needs repainting.
    Full,
}

impl DamageRegion {
    /// Returns `true` if no region needs repainting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match other {
            Self::None => {}
            Self::Full => *self = Self::Full,
            Self::Rects(b) => match self {
                Self::Full => {}
                Self::None => *self = Self::Rects(b.clone()),
                Self::Rects(a) => a.extend_from_slice(b),
            },
        }
    }

    /// Adds a single rectangle. Empty rectangles are ignored.
    pub fn add_rect(&mut self, rect: Rect) {
        if rect.is_zero_area() {
            return;
        }
        match self {
            Self::Full => {}
            Self::None => *self = Self::Rects(alloc::vec![rect]),
            Self::Rects(rects) => rects.push(rect),
        }
    }
}

/// Paint bookkeeping for one local view.
#[derive(Clone, Debug, Default)]
pub struct PaintInvalidation {
    pub(crate) damage: DamageRegion,
    pub(crate) candidates: BTreeSet<NodeId>,
    pub(crate) needs_paint_property_update: bool,
}

impl PaintInvalidation {
    pub(crate) fn invalidate_full(&mut self) {
        self.damage = DamageRegion::Full;
    }

    /// Returns the damage accumulated since the last paint.
    #[must_use]
    pub fn damage(&self) -> &DamageRegion {
        &self.damage
    }

    /// Returns `true` if the pre-paint walk has work for this view.
    #[must_use]
    pub fn needs_pre_paint(&self) -> bool {
        self.needs_paint_property_update || !self.candidates.is_empty()
    }
}

impl ViewTree {
    // -- Layout --

    /// Schedules a layout of the whole view.
    ///
    /// Does nothing while layout scheduling is disabled (a layout is running
    /// for this view) or when the document is inactive. Otherwise partial
    /// subtree tracking is discarded, and the first call since the last
    /// layout requests a visual update unless the view is throttled.
    pub fn schedule_relayout(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        if !self.layout[idx as usize].scheduling_enabled || !self.document_is_active(idx) {
            return;
        }
        self.layout[idx as usize].fall_back_to_full_layout();
        self.regress_lifecycle(idx, LifecycleState::VisualUpdatePending);
        if self.layout[idx as usize].pending {
            return;
        }
        self.layout[idx as usize].pending = true;
        if !self.should_throttle_idx(idx) {
            self.request_visual_update(idx);
        }
    }

    /// Schedules layout of the subtree rooted at `node`.
    ///
    /// If the whole view already needs layout the subtree is covered by it
    /// and nothing is recorded.
    pub fn schedule_relayout_of_subtree(&mut self, view: ViewId, node: NodeId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        if !self.document_is_active(idx) {
            return;
        }
        let layout = &mut self.layout[idx as usize];
        if layout.needs_full_layout {
            return;
        }
        layout.subtree_roots.insert(node);
        if !layout.scheduling_enabled {
            return;
        }
        layout.pending = true;
        if !self.should_throttle_idx(idx) {
            self.request_visual_update(idx);
        }
        self.regress_lifecycle(idx, LifecycleState::StyleClean);
    }

    /// Discards the recorded layout subtree roots and marks the whole view
    /// for layout instead.
    pub fn clear_and_mark_containing_blocks_for_layout(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.layout[idx as usize].fall_back_to_full_layout();
        self.regress_lifecycle(idx, LifecycleState::VisualUpdatePending);
    }

    /// Records a structural change (anonymous boxes, writing-mode roots)
    /// that makes partial layout tracking unsound, and schedules a full
    /// layout.
    pub fn note_layout_structure_change(&mut self, view: ViewId) {
        self.clear_and_mark_containing_blocks_for_layout(view);
        self.schedule_relayout(view);
    }

    /// Registers an orthogonal writing-mode root. These are laid out ahead
    /// of the subtree roots on every subtree layout.
    pub fn add_orthogonal_writing_mode_root(&mut self, view: ViewId, node: NodeId) {
        if let Some(idx) = self.local_idx(view) {
            self.layout[idx as usize].orthogonal_roots.insert(node);
        }
    }

    /// Unregisters an orthogonal writing-mode root.
    pub fn remove_orthogonal_writing_mode_root(&mut self, view: ViewId, node: NodeId) {
        if let Some(idx) = self.local_idx(view) {
            self.layout[idx as usize].orthogonal_roots.remove(&node);
        }
    }

    /// Marks the whole view as needing layout without scheduling it.
    pub fn set_needs_layout(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        if !self.document_is_active(idx) {
            return;
        }
        self.layout[idx as usize].needs_full_layout = true;
        self.regress_lifecycle(idx, LifecycleState::VisualUpdatePending);
    }

    /// Returns `true` if the view has outstanding layout work.
    #[must_use]
    pub fn needs_layout(&self, view: ViewId) -> bool {
        self.local_idx(view)
            .is_some_and(|idx| self.layout[idx as usize].needs_layout())
    }

    /// Returns `true` if a layout has been scheduled and not yet run.
    #[must_use]
    pub fn layout_pending(&self, view: ViewId) -> bool {
        self.local_idx(view)
            .is_some_and(|idx| self.layout[idx as usize].pending)
    }

    /// Returns the recorded layout subtree roots, in ascending order.
    #[must_use]
    pub fn layout_subtree_roots(&self, view: ViewId) -> Vec<NodeId> {
        self.local_idx(view)
            .map(|idx| {
                self.layout[idx as usize]
                    .subtree_roots
                    .iter()
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns how many layouts have run for the view's current document.
    #[must_use]
    pub fn layout_count(&self, view: ViewId) -> u32 {
        self.local_idx(view)
            .map_or(0, |idx| self.layout[idx as usize].layout_count)
    }

    /// Checks that the view has no outstanding layout work.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError::DirtyLayout`] if it does.
    pub fn check_does_not_need_layout(&self, view: ViewId) -> Result<(), InvariantError> {
        if self.needs_layout(view) {
            return Err(InvariantError::DirtyLayout { view });
        }
        Ok(())
    }

    // -- Paint --

    /// Adds `rect` (view content coordinates) to the view's paint damage.
    pub fn invalidate_rect(&mut self, view: ViewId, rect: Rect) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.paint[idx as usize].damage.add_rect(rect);
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
    }

    /// Marks the whole view for repaint.
    pub fn invalidate_paint_for_view(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.paint[idx as usize].invalidate_full();
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
    }

    /// Records `node` as a candidate for the next paint invalidation walk.
    pub fn mark_for_paint_invalidation(&mut self, view: ViewId, node: NodeId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.paint[idx as usize].candidates.insert(node);
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
    }

    /// Marks the view's own paint properties for rebuilding.
    pub fn set_needs_paint_property_update(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.dirty.mark(idx, dirty::PAINT_PROPERTY);
        self.paint[idx as usize].needs_paint_property_update = true;
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
    }

    /// Marks the paint properties of the view and every view nested in it
    /// for rebuilding.
    pub fn set_subtree_needs_paint_property_update(&mut self, view: ViewId) {
        self.validate(view);
        self.mark_subtree_paint_properties(view.idx);
    }

    /// Returns the paint damage accumulated since the last paint.
    #[must_use]
    pub fn paint_damage(&self, view: ViewId) -> DamageRegion {
        self.local_idx(view)
            .map(|idx| self.paint[idx as usize].damage.clone())
            .unwrap_or_default()
    }

    pub(crate) fn mark_subtree_paint_properties(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::PAINT_PROPERTY, &EagerPolicy);
        let mut subtree = Vec::new();
        self.collect_pre_order(idx, &mut subtree);
        for i in subtree {
            if self.is_local_idx(i) {
                self.paint[i as usize].needs_paint_property_update = true;
                self.regress_lifecycle(i, LifecycleState::CompositingClean);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(tree: &mut ViewTree) -> ViewId {
        tree.create_local_view(Rect::new(0.0, 0.0, 200.0, 100.0))
    }

    /// A view as it looks after its first layout.
    fn laid_out(tree: &mut ViewTree) -> ViewId {
        let v = view(tree);
        let _ = tree.layout[v.idx as usize].take_scope();
        v
    }

    #[test]
    fn new_document_needs_full_layout() {
        let mut tree = ViewTree::default();
        let v = view(&mut tree);
        assert!(tree.needs_layout(v));
        assert_eq!(tree.layout[v.idx as usize].take_scope(), LayoutScope::Full);
        assert!(!tree.needs_layout(v));
    }

    #[test]
    fn schedule_relayout_is_idempotent() {
        let mut tree = ViewTree::default();
        let v = laid_out(&mut tree);
        let _ = tree.take_visual_update_requests();

        tree.schedule_relayout(v);
        tree.schedule_relayout(v);
        assert!(tree.layout_pending(v));
        assert_eq!(tree.take_visual_update_requests(), alloc::vec![v]);
    }

    #[test]
    fn schedule_relayout_is_ignored_while_disabled() {
        let mut tree = ViewTree::default();
        let v = laid_out(&mut tree);
        tree.layout[v.idx as usize].scheduling_enabled = false;
        tree.schedule_relayout(v);
        assert!(!tree.needs_layout(v));
    }

    #[test]
    fn subtree_roots_are_collected() {
        let mut tree = ViewTree::default();
        let v = laid_out(&mut tree);
        tree.schedule_relayout_of_subtree(v, NodeId(4));
        tree.schedule_relayout_of_subtree(v, NodeId(2));
        tree.schedule_relayout_of_subtree(v, NodeId(4));
        assert_eq!(tree.layout_subtree_roots(v), alloc::vec![NodeId(2), NodeId(4)]);
        assert!(tree.layout[v.idx as usize].is_subtree_layout());
    }

    #[test]
    fn subtree_root_is_covered_by_full_layout() {
        let mut tree = ViewTree::default();
        let v = view(&mut tree);
        tree.schedule_relayout_of_subtree(v, NodeId(1));
        assert!(tree.layout_subtree_roots(v).is_empty());
    }

    #[test]
    fn structure_change_falls_back_to_full_layout() {
        let mut tree = ViewTree::default();
        let v = laid_out(&mut tree);
        tree.schedule_relayout_of_subtree(v, NodeId(3));
        tree.note_layout_structure_change(v);
        assert!(tree.layout_subtree_roots(v).is_empty());
        assert_eq!(tree.layout[v.idx as usize].take_scope(), LayoutScope::Full);
    }

    #[test]
    fn orthogonal_roots_lead_subtree_scope() {
        let mut tree = ViewTree::default();
        let v = laid_out(&mut tree);
        tree.add_orthogonal_writing_mode_root(v, NodeId(9));
        tree.schedule_relayout_of_subtree(v, NodeId(3));
        tree.schedule_relayout_of_subtree(v, NodeId(9));
        assert_eq!(
            tree.layout[v.idx as usize].take_scope(),
            LayoutScope::Subtrees(alloc::vec![NodeId(9), NodeId(3)])
        );
    }

    #[test]
    fn dirty_layout_is_reported() {
        let mut tree = ViewTree::default();
        let v = view(&mut tree);
        assert_eq!(
            tree.check_does_not_need_layout(v),
            Err(InvariantError::DirtyLayout { view: v })
        );
        let _ = tree.layout[v.idx as usize].take_scope();
        assert_eq!(tree.check_does_not_need_layout(v), Ok(()));
    }

    #[test]
    fn damage_merges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 20.0);
        let mut damage = DamageRegion::None;
        damage.add_rect(Rect::ZERO);
        assert!(damage.is_empty());
        damage.add_rect(a);
        damage.merge(&DamageRegion::Rects(alloc::vec![b]));
        assert_eq!(damage, DamageRegion::Rects(alloc::vec![a, b]));
        damage.merge(&DamageRegion::Full);
        assert_eq!(damage, DamageRegion::Full);
        damage.add_rect(a);
        assert_eq!(damage, DamageRegion::Full);
    }

    #[test]
    fn invalidate_rect_regresses_lifecycle() {
        let mut tree = ViewTree::default();
        let v = view(&mut tree);
        let idx = v.idx as usize;
        let lifecycle = &mut tree.document[idx].as_mut().unwrap().lifecycle;
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
            lifecycle.advance_to(next).unwrap();
        }
        tree.invalidate_rect(v, Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(
            tree.lifecycle_state(v),
            Some(LifecycleState::CompositingClean)
        );
        assert!(!tree.paint_damage(v).is_empty());
    }

    #[test]
    fn remote_views_ignore_invalidation() {
        let mut tree = ViewTree::default();
        let remote = tree.create_remote_view(Rect::new(0.0, 0.0, 10.0, 10.0));
        tree.schedule_relayout(remote);
        tree.invalidate_paint_for_view(remote);
        assert!(!tree.needs_layout(remote));
        assert!(tree.paint_damage(remote).is_empty());
    }
}
