// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render throttling.
//!
//! A local view may skip lifecycle work while it is throttled. A view can be
//! throttled for three reasons, checked in this order:
//!
//! 1. Its lifecycle updates are held back because the document is still
//!    loading (see [`ViewTree::begin_lifecycle_updates`]).
//! 2. An ancestor is throttled (`subtree_throttled`).
//! 3. It is hidden and cross-origin to its parent. Same-origin content is
//!    never throttled for being hidden, since script in the parent may
//!    depend on its layout synchronously.
//!
//! Reasons 2 and 3 only apply while
//! [`throttling_enabled`](crate::config::LifecycleConfig::throttling_enabled)
//! is set.
//!
//! Changes propagate to descendants through [`dirty::THROTTLING`]: the
//! changed view is marked and the channel is drained parent-first, so each
//! view recomputes `subtree_throttled` from an already up to date parent.
//! Every flip of a view's throttled status is queued as a
//! [`ThrottleTransition`].

use alloc::vec::Vec;

use kurbo::Rect;

use crate::dirty;
use crate::error::InvariantError;
use crate::lifecycle::LifecycleState;
use crate::view::{INVALID, ViewId, ViewTree};

/// Throttling flags of one local view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrottleState {
    pub(crate) hidden_for_throttling: bool,
    pub(crate) subtree_throttled: bool,
    pub(crate) lifecycle_updates_throttled: bool,
    /// Last value of `can_throttle_rendering`, used to detect flips.
    pub(crate) throttled: bool,
}

/// Why (or whether) a view is throttled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThrottleStatus {
    /// The view renders normally.
    Unthrottled,
    /// The view is throttled on its own account.
    Throttled,
    /// The view is throttled because an ancestor is.
    SubtreeThrottled,
}

/// A change of a view's throttled status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleTransition {
    /// The view whose status flipped.
    pub view: ViewId,
    /// Whether the view is throttled now.
    pub throttled: bool,
}

impl ViewTree {
    /// Returns whether the view may skip lifecycle work.
    ///
    /// Remote views are never throttled here; their own tree decides.
    #[must_use]
    pub fn can_throttle_rendering(&self, view: ViewId) -> bool {
        self.validate(view);
        self.can_throttle_idx(view.idx)
    }

    /// Returns whether the view actually skips lifecycle work: it can be
    /// throttled and has a document.
    #[must_use]
    pub fn should_throttle_rendering(&self, view: ViewId) -> bool {
        self.validate(view);
        self.should_throttle_idx(view.idx)
    }

    /// Returns the view's throttling status.
    #[must_use]
    pub fn throttle_status(&self, view: ViewId) -> ThrottleStatus {
        self.validate(view);
        let idx = view.idx;
        if !self.can_throttle_idx(idx) {
            ThrottleStatus::Unthrottled
        } else if self.throttle[idx as usize].subtree_throttled {
            ThrottleStatus::SubtreeThrottled
        } else {
            ThrottleStatus::Throttled
        }
    }

    /// Returns whether the view's owner element counts as hidden for
    /// throttling purposes.
    #[must_use]
    pub fn is_hidden_for_throttling(&self, view: ViewId) -> bool {
        self.validate(view);
        self.throttle[view.idx as usize].hidden_for_throttling
    }

    /// Visibility observer callback for the view's owner element.
    pub fn notify_visibility(&mut self, view: ViewId, visible: bool) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.update_throttling_status(idx, !visible, false);
    }

    /// Lets a subframe that finished its first real load run lifecycle
    /// updates. Before the first real load commits this does nothing, so
    /// the initial empty document never pumps frames.
    pub fn begin_lifecycle_updates(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        let committed = self.document[idx as usize]
            .as_ref()
            .is_some_and(|d| d.committed_first_real_load);
        if !committed {
            return;
        }
        self.throttle[idx as usize].lifecycle_updates_throttled = false;
        let hidden = self.throttle[idx as usize].hidden_for_throttling;
        self.update_throttling_status(idx, hidden, false);
    }

    /// Records the viewport intersection pushed to `view` by its embedder.
    ///
    /// For a local view (typically a local root under a remote parent) an
    /// empty intersection means the view is hidden.
    pub fn set_viewport_intersection(&mut self, view: ViewId, rect: Rect) {
        self.validate(view);
        let idx = view.idx;
        self.viewport_intersection[idx as usize] = Some(rect);
        if self.is_local_idx(idx) {
            self.update_throttling_status(idx, rect.is_zero_area(), false);
        }
    }

    /// Returns the last viewport intersection computed for or pushed to the
    /// view.
    #[must_use]
    pub fn viewport_intersection(&self, view: ViewId) -> Option<Rect> {
        self.validate(view);
        self.viewport_intersection[view.idx as usize]
    }

    /// Re-evaluates throttling after the view's cross-origin status changed.
    ///
    /// The origin is not tracked as a dirty bit, so the unthrottle side
    /// effects are applied whether or not the status flipped.
    pub fn cross_origin_status_changed(&mut self, view: ViewId) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        let hidden = self.throttle[idx as usize].hidden_for_throttling;
        self.update_throttling_status(idx, hidden, true);
    }

    /// Takes the throttling transitions queued since the last call.
    ///
    /// Coordinated passes deliver queued transitions to observers and take
    /// them as well.
    pub fn take_throttle_transitions(&mut self) -> Vec<ThrottleTransition> {
        core::mem::take(&mut self.throttle_transitions)
    }

    /// Checks that no view under `root` renders while an ancestor is
    /// throttled.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError::ThrottledAncestor`] for the first offending
    /// view in pre-order.
    pub fn check_throttling_invariant(&self, root: ViewId) -> Result<(), InvariantError> {
        self.validate(root);
        let mut order = Vec::new();
        self.collect_pre_order(root.idx, &mut order);
        for idx in order {
            if !self.is_local_idx(idx) || self.can_throttle_idx(idx) {
                continue;
            }
            let mut ancestor = self.local_parent_idx(idx);
            while let Some(a) = ancestor {
                if self.can_throttle_idx(a) {
                    return Err(InvariantError::ThrottledAncestor {
                        view: self.id_at(idx),
                        ancestor: self.id_at(a),
                    });
                }
                ancestor = self.local_parent_idx(a);
            }
        }
        Ok(())
    }

    // -- Internal --

    pub(crate) fn can_throttle_idx(&self, idx: u32) -> bool {
        if !self.is_local_idx(idx) {
            return false;
        }
        let t = &self.throttle[idx as usize];
        if t.lifecycle_updates_throttled || t.subtree_throttled {
            return true;
        }
        if !self.config.throttling_enabled {
            return false;
        }
        t.hidden_for_throttling && self.is_cross_origin_idx(idx)
    }

    pub(crate) fn should_throttle_idx(&self, idx: u32) -> bool {
        self.can_throttle_idx(idx) && self.document[idx as usize].is_some()
    }

    /// Applies a new hidden state and propagates the result.
    ///
    /// Zero-area frames and frames whose owner is not rendered are never
    /// hidden for throttling; some pages drive UI logic from them.
    pub(crate) fn update_throttling_status(&mut self, idx: u32, hidden: bool, force: bool) {
        let hidden = hidden
            && !self.frame_rect[idx as usize].is_zero_area()
            && self.owner_rendered[idx as usize];
        self.throttle[idx as usize].hidden_for_throttling = hidden;
        self.dirty.mark(idx, dirty::THROTTLING);
        self.propagate_throttling(force.then_some(idx));
    }

    /// Drains pending throttling marks without forcing invalidation.
    pub(crate) fn flush_throttling(&mut self) {
        self.propagate_throttling(None);
    }

    fn propagate_throttling(&mut self, forced: Option<u32>) {
        let order: Vec<u32> = self
            .dirty
            .drain(dirty::THROTTLING)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in order {
            if !self.is_local_idx(idx) || !self.alive[idx as usize] {
                continue;
            }
            let inherited = self
                .local_parent_idx(idx)
                .is_some_and(|p| self.can_throttle_idx(p));
            self.throttle[idx as usize].subtree_throttled = inherited;

            let was = self.throttle[idx as usize].throttled;
            let now = self.can_throttle_idx(idx);
            self.throttle[idx as usize].throttled = now;
            if (was && !now) || forced == Some(idx) {
                self.did_unthrottle(idx);
            }
            if was != now {
                self.throttle_transitions.push(ThrottleTransition {
                    view: self.id_at(idx),
                    throttled: now,
                });
            }
        }
    }

    /// Content painted before throttling may be stale, and paint properties
    /// were not kept up to date while throttled.
    fn did_unthrottle(&mut self, idx: u32) {
        self.paint[idx as usize].invalidate_full();
        self.mark_subtree_paint_properties(idx);
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
        self.request_visual_update(idx);
    }

    /// Recomputes child visibility for views under `root` whose geometry
    /// changed, throttled subtrees included.
    ///
    /// A local child is hidden when its frame rect misses the parent's
    /// visible content rect. Remote children get the intersection recorded
    /// so the embedder can push it; their handles are returned.
    pub(crate) fn update_viewport_intersections(&mut self, root: u32) -> Vec<(ViewId, Rect)> {
        let marked: Vec<u32> = self
            .dirty
            .drain(dirty::VIEWPORT)
            .deterministic()
            .run()
            .collect();

        let mut targets = Vec::new();
        for idx in marked {
            if !self.alive[idx as usize] {
                continue;
            }
            if !self.is_in_subtree(idx, root) {
                self.dirty.mark(idx, dirty::VIEWPORT);
                continue;
            }
            if idx != root && !targets.contains(&idx) {
                targets.push(idx);
            }
            for child in self.child_indices(idx) {
                if !targets.contains(&child) {
                    targets.push(child);
                }
            }
        }

        let mut remote = Vec::new();
        for idx in targets {
            let p = self.parent[idx as usize];
            if p == INVALID || !self.is_local_idx(p) || !self.document_is_active(p) {
                continue;
            }
            let visible = self.visible_content_rect_idx(p);
            let intersection = self.frame_rect[idx as usize].intersect(visible);
            if self.is_local_idx(idx) {
                self.viewport_intersection[idx as usize] = Some(intersection);
                self.update_throttling_status(idx, intersection.is_zero_area(), false);
            } else if self.viewport_intersection[idx as usize] != Some(intersection) {
                self.viewport_intersection[idx as usize] = Some(intersection);
                remote.push((self.id_at(idx), intersection));
            }
        }
        remote
    }
}
