// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Embedder contract.
//!
//! `frameline_core` decides *when* each phase of rendering runs for each
//! view. The embedder does the actual work (style, layout, compositing,
//! painting) by implementing [`FrameClient`]. The coordinator calls into it
//! phase by phase while it walks the view tree.
//!
//! # Script-forbidden scopes
//!
//! Style, layout, compositing, pre-paint, and paint callbacks receive
//! `&ViewTree`, so they cannot invalidate anything while a phase is running.
//! Only the callbacks that stand in for script (resize observer delivery and
//! resize event dispatch) receive `&mut ViewTree`. Invalidations made there
//! are picked up by the same pass where possible and otherwise by the next
//! one.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_begin_frame(tree: &mut ViewTree, client: &mut MyClient) {
//!     for view in tree.take_visual_update_requests() {
//!         if let Some(root) = tree.local_root(view) {
//!             roots.insert(root);
//!         }
//!     }
//!     for root in roots {
//!         let mut cx = PassContext::new(client);
//!         let report = tree.update_lifecycle_phases(root, TargetState::PaintClean, &mut cx)?;
//!         for (remote, rect) in &report.remote_intersections {
//!             ipc.send_viewport_intersection(*remote, *rect);
//!         }
//!     }
//!     tree.run_posted_tasks(&mut PassContext::new(client));
//! }
//! ```

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};

use crate::invalidation::{DamageRegion, LayoutScope};
use crate::time::HostTime;
use crate::view::{NodeId, ViewId, ViewTree};

/// Result of laying out one view.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutOutput {
    /// Size of the laid out contents. Drives scrollbar existence and the
    /// scrollable extent.
    pub contents_size: Size,
}

/// What the pre-paint walk has to cover for one view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrePaintInput {
    /// Paint properties (scroll translation, clips) must be rebuilt.
    pub needs_paint_property_update: bool,
    /// Nodes marked for paint invalidation since the last walk, in
    /// ascending order.
    pub candidates: Vec<NodeId>,
}

/// Does the rendering work for the views of a [`ViewTree`].
///
/// Everything except [`layout`](Self::layout) has a no-op default.
pub trait FrameClient {
    /// Returns the current monotonic time, used for trace timestamps.
    fn now(&self) -> HostTime {
        HostTime(0)
    }

    /// Recalculates style for the view's document.
    fn recalc_style(&mut self, tree: &ViewTree, view: ViewId) {
        _ = (tree, view);
    }

    /// Lays out the view's document.
    ///
    /// [`ViewTree::pending_resize`] tells which viewport dimensions changed
    /// since the last layout.
    fn layout(&mut self, tree: &ViewTree, view: ViewId, scope: &LayoutScope) -> LayoutOutput;

    /// Picks a scroll anchor for a scrolled view that has none.
    fn select_scroll_anchor(&self, tree: &ViewTree, view: ViewId) -> Option<NodeId> {
        _ = (tree, view);
        None
    }

    /// Returns the position of `node` in the view's content coordinates, or
    /// `None` if it no longer has a layout box.
    fn anchor_position(&self, tree: &ViewTree, view: ViewId, node: NodeId) -> Option<Point> {
        _ = (tree, view, node);
        None
    }

    /// Returns the rect of `node` in the view's content coordinates.
    fn node_rect(&self, tree: &ViewTree, view: ViewId, node: NodeId) -> Option<Rect> {
        _ = (tree, view, node);
        None
    }

    /// Updates compositing inputs for the view.
    fn update_compositing(&mut self, tree: &ViewTree, view: ViewId) {
        _ = (tree, view);
    }

    /// Runs the paint invalidation walk for the view.
    fn pre_paint(&mut self, tree: &ViewTree, view: ViewId, input: &PrePaintInput) {
        _ = (tree, view, input);
    }

    /// Paints the damaged part of the view.
    fn paint(&mut self, tree: &ViewTree, view: ViewId, damage: &DamageRegion) {
        _ = (tree, view, damage);
    }

    /// Delivers pending resize observations for the view's document.
    ///
    /// Returns `true` if anything was delivered; style and layout then run
    /// again before the next round.
    fn deliver_resize_observations(&mut self, tree: &mut ViewTree, view: ViewId) -> bool {
        _ = (tree, view);
        false
    }

    /// Fires a `resize` event at the view's document.
    fn dispatch_resize_event(&mut self, tree: &mut ViewTree, view: ViewId) {
        _ = (tree, view);
    }
}
