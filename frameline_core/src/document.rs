// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Documents hosted by local views.
//!
//! Each local view owns at most one [`Document`]. A view starts out with an
//! initial empty document; [`ViewTree::commit_navigation`] replaces it with
//! a real one. Detaching a document stops its lifecycle, after which every
//! coordinated pass that reaches the view is a no-op.

use crate::error::InvariantError;
use crate::lifecycle::{DocumentLifecycle, LifecycleState};
use crate::view::{DocumentId, OriginId, ViewId, ViewTree};
use crate::{dirty, lifecycle};

use understory_dirty::EagerPolicy;

/// A document attached to a local view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) origin: OriginId,
    pub(crate) lifecycle: DocumentLifecycle,
    pub(crate) committed_first_real_load: bool,
    pub(crate) load_completed: bool,
}

impl Document {
    /// Creates a document that is attached and waiting for its first pass.
    pub(crate) fn attached(id: DocumentId, origin: OriginId, real_load: bool) -> Self {
        let mut lifecycle = DocumentLifecycle::new();
        lifecycle.attach();
        Self {
            id,
            origin,
            lifecycle,
            committed_first_real_load: real_load,
            load_completed: false,
        }
    }

    /// Returns the document's identity.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the document's origin.
    #[must_use]
    pub fn origin(&self) -> OriginId {
        self.origin
    }

    /// Returns the document's lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &DocumentLifecycle {
        &self.lifecycle
    }

    /// Returns `true` while lifecycle work may run.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Returns whether a navigation has committed a real (non-initial)
    /// document.
    #[must_use]
    pub fn committed_first_real_load(&self) -> bool {
        self.committed_first_real_load
    }

    /// Returns whether the document finished loading.
    #[must_use]
    pub fn load_completed(&self) -> bool {
        self.load_completed
    }
}

impl ViewTree {
    /// Returns the document of a local view.
    #[must_use]
    pub fn document(&self, view: ViewId) -> Option<&Document> {
        self.validate(view);
        self.document[view.idx as usize].as_ref()
    }

    /// Returns the lifecycle state of the view's document, if it has one.
    #[must_use]
    pub fn lifecycle_state(&self, view: ViewId) -> Option<LifecycleState> {
        self.document(view).map(|d| d.lifecycle.state())
    }

    /// Commits a navigation in `view`, replacing its document.
    ///
    /// The new document needs a full layout and a full repaint. Scroll
    /// position, the scroll anchor, the fragment anchor, and pending
    /// post-layout work of the old document are dropped. With
    /// [`throttle_loading_frames`](crate::config::LifecycleConfig::throttle_loading_frames)
    /// set, a subframe stays lifecycle-throttled until
    /// [`begin_lifecycle_updates`](Self::begin_lifecycle_updates).
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError::RemoteView`] for remote views.
    pub fn commit_navigation(
        &mut self,
        view: ViewId,
        origin: OriginId,
    ) -> Result<DocumentId, InvariantError> {
        self.validate(view);
        let idx = view.idx;
        if !self.is_local_idx(idx) {
            return Err(InvariantError::RemoteView { view });
        }
        if let Some(old) = &mut self.document[idx as usize] {
            old.lifecycle.shutdown();
        }
        let document = self.new_document(origin, true);
        let id = document.id;
        self.document[idx as usize] = Some(document);

        let size = self.frame_rect[idx as usize].size();
        self.layout[idx as usize].reset_for_new_document();
        self.paint[idx as usize].invalidate_full();
        self.scroll[idx as usize].reset_for_new_document(size);
        self.anchoring_queue.retain(|&i| i != idx);
        self.tasks.cancel_view(idx);

        let is_subframe = self.parent[idx as usize] != crate::view::INVALID;
        self.throttle[idx as usize].lifecycle_updates_throttled =
            self.config.throttle_loading_frames && is_subframe;

        // The origin feeds cross-origin checks for this view and its children.
        self.dirty.mark_with(idx, dirty::THROTTLING, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::PAINT_PROPERTY, &EagerPolicy);
        self.flush_throttling();
        if !self.should_throttle_idx(idx) {
            self.request_visual_update(idx);
        }
        Ok(id)
    }

    /// Records that the view's document finished loading.
    ///
    /// A fragment anchor is only held on to while the document is loading.
    pub fn set_load_completed(&mut self, view: ViewId) {
        self.validate(view);
        if let Some(document) = &mut self.document[view.idx as usize] {
            document.load_completed = true;
        }
    }

    /// Stops the view's document. Passes reaching the view become no-ops
    /// until another navigation commits.
    pub fn detach_document(&mut self, view: ViewId) {
        self.validate(view);
        let idx = view.idx;
        if let Some(document) = &mut self.document[idx as usize] {
            document.lifecycle.shutdown();
        }
        self.anchoring_queue.retain(|&i| i != idx);
        self.tasks.cancel_view(idx);
    }

    /// Returns whether `view` is a subframe whose document is not
    /// same-origin with its parent's. Children of remote views always count
    /// as cross-origin.
    #[must_use]
    pub fn is_cross_origin_subframe(&self, view: ViewId) -> bool {
        self.validate(view);
        self.is_cross_origin_idx(view.idx)
    }

    pub(crate) fn is_cross_origin_idx(&self, idx: u32) -> bool {
        let p = self.parent[idx as usize];
        if p == crate::view::INVALID {
            return false;
        }
        if !self.is_local_idx(p) {
            return true;
        }
        match (&self.document[idx as usize], &self.document[p as usize]) {
            (Some(child), Some(parent)) => child.origin != parent.origin,
            _ => false,
        }
    }

    /// Returns whether the view has an active document.
    pub(crate) fn document_is_active(&self, idx: u32) -> bool {
        self.document[idx as usize]
            .as_ref()
            .is_some_and(Document::is_active)
    }

    /// Lowers the view's lifecycle state for a new invalidation.
    ///
    /// Views taking part in a running pass are left alone; the pass picks the
    /// invalidation up from the trackers instead of regressing mid-pass.
    pub(crate) fn regress_lifecycle(&mut self, idx: u32, state: lifecycle::LifecycleState) {
        if self.in_pass[idx as usize] {
            return;
        }
        if let Some(document) = &mut self.document[idx as usize] {
            document.lifecycle.ensure_state_at_most(state);
        }
    }
}
