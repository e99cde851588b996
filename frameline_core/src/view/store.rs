// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays view storage with allocation and topology management.

use alloc::vec::Vec;

use kurbo::Rect;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{DocumentId, INVALID, OriginId, ViewId};
use super::traverse::Children;
use crate::config::LifecycleConfig;
use crate::coordinator::TaskQueue;
use crate::dirty;
use crate::document::Document;
use crate::invalidation::{LayoutInvalidation, PaintInvalidation};
use crate::scroll::ScrollableArea;
use crate::throttle::{ThrottleState, ThrottleTransition};

/// Whether a view renders in this tree or elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// A frame whose document lives in this tree. Owns a document, a
    /// scrollable area, invalidation trackers, and throttling state.
    Local,
    /// A placeholder for a frame rendered by another tree (typically another
    /// process). Only its frame rect and the viewport intersection pushed to
    /// it are tracked here.
    Remote,
}

/// Struct-of-arrays storage for a tree of frame views.
///
/// Views are addressed by [`ViewId`] handles. Each view occupies a slot in
/// parallel arrays; destroyed views are recycled through a free list, and
/// generation counters reject stale handles.
///
/// Per-concern operations are spread over several modules:
/// [`document`](crate::document), [`invalidation`](crate::invalidation),
/// [`throttle`](crate::throttle), [`scroll`](crate::scroll), and
/// [`coordinator`](crate::coordinator).
#[derive(Debug)]
pub struct ViewTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Per-view state --
    pub(crate) kind: Vec<ViewKind>,
    pub(crate) frame_rect: Vec<Rect>,
    pub(crate) owner_rendered: Vec<bool>,
    pub(crate) document: Vec<Option<Document>>,
    pub(crate) layout: Vec<LayoutInvalidation>,
    pub(crate) paint: Vec<PaintInvalidation>,
    pub(crate) throttle: Vec<ThrottleState>,
    pub(crate) scroll: Vec<ScrollableArea>,
    pub(crate) viewport_intersection: Vec<Option<Rect>>,
    pub(crate) in_pass: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Scheduling --
    pub(crate) config: LifecycleConfig,
    pub(crate) next_document: u32,
    pub(crate) active_roots: Vec<u32>,
    pub(crate) pass_count: u64,
    pub(crate) anchoring_queue: Vec<u32>,
    pub(crate) tasks: TaskQueue,
    pub(crate) visual_update_requests: Vec<u32>,
    pub(crate) throttle_transitions: Vec<ThrottleTransition>,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

impl ViewTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            frame_rect: Vec::new(),
            owner_rendered: Vec::new(),
            document: Vec::new(),
            layout: Vec::new(),
            paint: Vec::new(),
            throttle: Vec::new(),
            scroll: Vec::new(),
            viewport_intersection: Vec::new(),
            in_pass: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            config,
            next_document: 0,
            active_roots: Vec::new(),
            pass_count: 0,
            anchoring_queue: Vec::new(),
            tasks: TaskQueue::default(),
            visual_update_requests: Vec::new(),
            throttle_transitions: Vec::new(),
        }
    }

    /// Returns the configuration this tree was created with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns the number of coordinated passes started so far.
    #[inline]
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    // -- Allocation API --

    /// Creates a local view with an initial empty document.
    ///
    /// The initial document is active and needs a full layout, but does not
    /// count as a real load: lifecycle throttling of loading frames only
    /// applies once [`commit_navigation`](Self::commit_navigation) runs.
    pub fn create_local_view(&mut self, frame_rect: Rect) -> ViewId {
        let idx = self.alloc(ViewKind::Local, frame_rect);
        let document = self.new_document(OriginId::OPAQUE, false);
        self.document[idx as usize] = Some(document);
        self.layout[idx as usize].reset_for_new_document();
        self.scroll[idx as usize].reset_for_new_document(frame_rect.size());
        self.dirty.mark(idx, dirty::PAINT_PROPERTY);
        self.request_visual_update(idx);
        self.id_at(idx)
    }

    /// Creates a remote view placeholder.
    pub fn create_remote_view(&mut self, frame_rect: Rect) -> ViewId {
        let idx = self.alloc(ViewKind::Remote, frame_rect);
        self.id_at(idx)
    }

    /// Destroys a view, freeing its slot for reuse.
    ///
    /// A local view's document is shut down first.
    ///
    /// # Panics
    ///
    /// Panics if the view has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_view(&mut self, id: ViewId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy view with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        if let Some(document) = &mut self.document[idx as usize] {
            document.lifecycle.shutdown();
        }
        self.document[idx as usize] = None;

        self.dirty.remove_key(idx);
        self.anchoring_queue.retain(|&i| i != idx);
        self.visual_update_requests.retain(|&i| i != idx);
        self.tasks.cancel_view(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.alive[idx as usize] = false;
        self.free_list.push(idx);
    }

    /// Returns whether the handle refers to a live view.
    #[must_use]
    pub fn is_alive(&self, id: ViewId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// The child subtree's inherited throttling is recomputed at the next
    /// pass, and its paint properties and viewport intersection are marked
    /// dirty.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `parent` lies inside `child`'s subtree.
    pub fn add_child(&mut self, parent: ViewId, child: ViewId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(!self.is_in_subtree(p, c), "add_child would create a cycle");

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        for channel in [dirty::PAINT_PROPERTY, dirty::THROTTLING, dirty::VIEWPORT] {
            let _ = self.dirty.add_dependency(c, p, channel);
        }
        self.mark_reattached(c);
    }

    /// Detaches `child` from its parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the view has no parent.
    pub fn remove_from_parent(&mut self, child: ViewId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "view has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        for channel in [dirty::PAINT_PROPERTY, dirty::THROTTLING, dirty::VIEWPORT] {
            self.dirty.remove_dependency(c, p, channel);
        }
        self.viewport_intersection[c as usize] = None;
        self.mark_reattached(c);
    }

    /// Returns the parent of a view, if any.
    #[must_use]
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a view.
    #[must_use]
    pub fn children(&self, id: ViewId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns every live view without a parent.
    #[must_use]
    pub fn roots(&self) -> Vec<ViewId> {
        (0..self.len)
            .filter(|&idx| self.alive[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| self.id_at(idx))
            .collect()
    }

    /// Returns whether the view is local or remote.
    #[must_use]
    pub fn kind(&self, id: ViewId) -> ViewKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the local root that owns `id`: the nearest local ancestor
    /// (or `id` itself) whose parent is absent or remote.
    ///
    /// Remote views have no local root; `None` is returned for them.
    #[must_use]
    pub fn local_root(&self, id: ViewId) -> Option<ViewId> {
        self.validate(id);
        self.local_root_idx(id.idx).map(|idx| self.id_at(idx))
    }

    /// Returns whether `id` is a local view whose parent is absent or remote.
    #[must_use]
    pub fn is_local_root(&self, id: ViewId) -> bool {
        self.local_root(id) == Some(id)
    }

    /// Returns the view's rect in its parent's content coordinates.
    #[must_use]
    pub fn frame_rect(&self, id: ViewId) -> Rect {
        self.validate(id);
        self.frame_rect[id.idx as usize]
    }

    /// Records whether the element hosting this view in its parent document
    /// currently has a layout box (`display: none` owners do not).
    ///
    /// Views with an unrendered owner are never throttled for being hidden.
    pub fn set_owner_rendered(&mut self, id: ViewId, rendered: bool) {
        self.validate(id);
        if self.owner_rendered[id.idx as usize] != rendered {
            self.owner_rendered[id.idx as usize] = rendered;
            self.dirty.mark(id.idx, dirty::VIEWPORT);
        }
    }

    /// Returns whether the view's owner element has a layout box.
    #[must_use]
    pub fn owner_rendered(&self, id: ViewId) -> bool {
        self.validate(id);
        self.owner_rendered[id.idx as usize]
    }

    /// Returns the views of the subtree rooted at `id`, in depth-first
    /// pre-order.
    #[must_use]
    pub fn pre_order(&self, id: ViewId) -> Vec<ViewId> {
        self.validate(id);
        let mut order = Vec::new();
        self.collect_pre_order(id.idx, &mut order);
        order.into_iter().map(|idx| self.id_at(idx)).collect()
    }

    /// Takes the views that asked for a visual update since the last call.
    ///
    /// Embedders schedule a lifecycle pass for the local roots of the
    /// returned views.
    pub fn take_visual_update_requests(&mut self) -> Vec<ViewId> {
        let requests = core::mem::take(&mut self.visual_update_requests);
        requests
            .into_iter()
            .filter(|&idx| self.alive[idx as usize])
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: ViewId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale ViewId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds a handle for a live slot.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> ViewId {
        ViewId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Validates `view` and returns its slot if it is local.
    pub(crate) fn local_idx(&self, view: ViewId) -> Option<u32> {
        self.validate(view);
        self.is_local_idx(view.idx).then_some(view.idx)
    }

    #[inline]
    pub(crate) fn is_local_idx(&self, idx: u32) -> bool {
        self.kind[idx as usize] == ViewKind::Local
    }

    /// Returns the parent slot if it holds a local view.
    #[inline]
    pub(crate) fn local_parent_idx(&self, idx: u32) -> Option<u32> {
        let p = self.parent[idx as usize];
        (p != INVALID && self.is_local_idx(p)).then_some(p)
    }

    pub(crate) fn local_root_idx(&self, idx: u32) -> Option<u32> {
        if !self.is_local_idx(idx) {
            return None;
        }
        let mut current = idx;
        while let Some(p) = self.local_parent_idx(current) {
            current = p;
        }
        Some(current)
    }

    /// Records that `idx` wants a lifecycle pass, once.
    pub(crate) fn request_visual_update(&mut self, idx: u32) {
        if !self.visual_update_requests.contains(&idx) {
            self.visual_update_requests.push(idx);
        }
    }

    pub(crate) fn new_document(&mut self, origin: OriginId, real_load: bool) -> Document {
        let id = DocumentId(self.next_document);
        self.next_document += 1;
        Document::attached(id, origin, real_load)
    }

    fn alloc(&mut self, kind: ViewKind, frame_rect: Rect) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.frame_rect[i] = frame_rect;
            self.owner_rendered[i] = true;
            self.document[i] = None;
            self.layout[i] = LayoutInvalidation::default();
            self.paint[i] = PaintInvalidation::default();
            self.throttle[i] = ThrottleState::default();
            self.scroll[i] = ScrollableArea::default();
            self.viewport_intersection[i] = None;
            self.in_pass[i] = false;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.frame_rect.push(frame_rect);
            self.owner_rendered.push(true);
            self.document.push(None);
            self.layout.push(LayoutInvalidation::default());
            self.paint.push(PaintInvalidation::default());
            self.throttle.push(ThrottleState::default());
            self.scroll.push(ScrollableArea::default());
            self.viewport_intersection.push(None);
            self.in_pass.push(false);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.dirty.mark(idx, dirty::VIEWPORT);
        idx
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Marks everything that depends on ancestry after `idx` moved.
    fn mark_reattached(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::THROTTLING, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::PAINT_PROPERTY, &EagerPolicy);
        self.dirty.mark(idx, dirty::VIEWPORT);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn rect(w: f64, h: f64) -> Rect {
        Rect::new(0.0, 0.0, w, h)
    }

    #[test]
    fn create_and_destroy() {
        let mut tree = ViewTree::default();
        let id = tree.create_local_view(rect(800.0, 600.0));
        assert!(tree.is_alive(id));
        assert_eq!(tree.kind(id), ViewKind::Local);
        tree.destroy_view(id);
        assert!(!tree.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = ViewTree::default();
        let first = tree.create_remote_view(rect(10.0, 10.0));
        tree.destroy_view(first);
        let second = tree.create_local_view(rect(10.0, 10.0));
        assert!(!tree.is_alive(first));
        assert!(tree.is_alive(second));
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert_eq!(tree.kind(second), ViewKind::Local);
    }

    #[test]
    #[should_panic(expected = "stale ViewId")]
    fn stale_handle_panics() {
        let mut tree = ViewTree::default();
        let id = tree.create_local_view(rect(10.0, 10.0));
        tree.destroy_view(id);
        let _ = tree.frame_rect(id);
    }

    #[test]
    #[should_panic(expected = "cannot destroy view with children")]
    fn destroying_a_parent_panics() {
        let mut tree = ViewTree::default();
        let parent = tree.create_local_view(rect(10.0, 10.0));
        let child = tree.create_local_view(rect(5.0, 5.0));
        tree.add_child(parent, child);
        tree.destroy_view(parent);
    }

    #[test]
    #[should_panic(expected = "add_child would create a cycle")]
    fn adding_an_ancestor_below_its_descendant_panics() {
        let mut tree = ViewTree::default();
        let top = tree.create_local_view(rect(10.0, 10.0));
        let mid = tree.create_local_view(rect(5.0, 5.0));
        tree.add_child(top, mid);
        tree.add_child(mid, top);
    }

    #[test]
    #[should_panic(expected = "add_child would create a cycle")]
    fn adding_a_view_below_itself_panics() {
        let mut tree = ViewTree::default();
        let view = tree.create_local_view(rect(10.0, 10.0));
        tree.add_child(view, view);
    }

    #[test]
    fn destroyed_slot_is_skipped_until_reused() {
        let mut tree = ViewTree::default();
        let a = tree.create_local_view(rect(10.0, 10.0));
        let b = tree.create_local_view(rect(10.0, 10.0));
        tree.destroy_view(a);
        assert_eq!(tree.roots(), vec![b]);

        let c = tree.create_remote_view(rect(10.0, 10.0));
        assert_eq!(c.index(), a.index());
        assert!(tree.is_alive(c));
        assert_eq!(tree.roots(), vec![c, b]);
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut tree = ViewTree::default();
        let root = tree.create_local_view(rect(100.0, 100.0));
        let a = tree.create_local_view(rect(10.0, 10.0));
        let b = tree.create_remote_view(rect(10.0, 10.0));
        let c = tree.create_local_view(rect(10.0, 10.0));
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(root, c);

        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(root));

        tree.remove_from_parent(b);
        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![a, c]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.roots(), vec![root, b]);
    }

    #[test]
    fn local_root_stops_at_remote_parent() {
        let mut tree = ViewTree::default();
        let top = tree.create_local_view(rect(100.0, 100.0));
        let remote = tree.create_remote_view(rect(50.0, 50.0));
        let inner = tree.create_local_view(rect(50.0, 50.0));
        let leaf = tree.create_local_view(rect(20.0, 20.0));
        tree.add_child(top, remote);
        tree.add_child(remote, inner);
        tree.add_child(inner, leaf);

        assert!(tree.is_local_root(top));
        assert!(tree.is_local_root(inner));
        assert!(!tree.is_local_root(leaf));
        assert_eq!(tree.local_root(leaf), Some(inner));
        assert_eq!(tree.local_root(remote), None);
    }

    #[test]
    fn pre_order_visits_parents_first() {
        let mut tree = ViewTree::default();
        let root = tree.create_local_view(rect(100.0, 100.0));
        let a = tree.create_local_view(rect(10.0, 10.0));
        let a1 = tree.create_local_view(rect(10.0, 10.0));
        let b = tree.create_local_view(rect(10.0, 10.0));
        tree.add_child(root, a);
        tree.add_child(a, a1);
        tree.add_child(root, b);
        assert_eq!(tree.pre_order(root), vec![root, a, a1, b]);
    }

    #[test]
    fn visual_update_requests_are_deduplicated() {
        let mut tree = ViewTree::default();
        let root = tree.create_local_view(rect(100.0, 100.0));
        tree.request_visual_update(root.idx);
        assert_eq!(tree.take_visual_update_requests(), vec![root]);
        assert!(tree.take_visual_update_requests().is_empty());
    }
}
