// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll anchors and fragment anchors.

use alloc::vec::Vec;

use kurbo::Vec2;

use super::{ScrollAnchor, ScrollType};
use crate::client::FrameClient;
use crate::view::{NodeId, ViewId, ViewTree};

/// A scroll offset change made to keep an anchor node in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorAdjustment {
    /// The scrolled view.
    pub view: ViewId,
    /// The anchor node.
    pub node: NodeId,
    /// How far the view scrolled.
    pub delta: Vec2,
}

impl ViewTree {
    /// Registers `node` as the view's scroll anchor.
    pub fn set_scroll_anchor(&mut self, view: ViewId, node: NodeId) {
        if let Some(idx) = self.local_idx(view) {
            self.scroll[idx as usize].anchor = ScrollAnchor {
                node: Some(node),
                ..ScrollAnchor::default()
            };
        }
    }

    /// Forgets the view's scroll anchor.
    pub fn clear_scroll_anchor(&mut self, view: ViewId) {
        if let Some(idx) = self.local_idx(view) {
            self.clear_scroll_anchor_idx(idx);
        }
    }

    /// Returns the view's scroll anchor node.
    #[must_use]
    pub fn scroll_anchor(&self, view: ViewId) -> Option<NodeId> {
        self.local_idx(view)
            .and_then(|idx| self.scroll[idx as usize].anchor.node)
    }

    /// Enables or disables scroll anchoring for this view alone
    /// (`overflow-anchor`). Disabling drops the current anchor.
    pub fn set_overflow_anchor(&mut self, view: ViewId, enabled: bool) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.scroll[idx as usize].overflow_anchor = enabled;
        if !enabled {
            self.clear_scroll_anchor_idx(idx);
        }
    }

    /// Sets the target of a URL fragment.
    ///
    /// If the view's layout is clean it scrolls there right away. Otherwise
    /// a visual update is requested and the scroll happens in the post-layout
    /// tasks of the next layout.
    pub fn set_fragment_anchor(&mut self, view: ViewId, node: NodeId, client: &dyn FrameClient) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        self.scroll[idx as usize].fragment_anchor = Some(node);
        if self.layout[idx as usize].needs_layout() {
            if !self.should_throttle_idx(idx) {
                self.request_visual_update(idx);
            }
            return;
        }
        self.scroll_to_fragment_anchor_idx(idx, client);
    }

    /// Scrolls the view so the fragment anchor's top-left corner is at the
    /// top-left of the viewport.
    ///
    /// Does nothing while layout is dirty. The anchor is kept while the
    /// document is loading, so later layouts can scroll to it again, and
    /// dropped once loading completed.
    pub fn scroll_to_fragment_anchor(&mut self, view: ViewId, client: &dyn FrameClient) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        if self.layout[idx as usize].needs_layout() {
            return;
        }
        self.scroll_to_fragment_anchor_idx(idx, client);
    }

    /// Returns the pending fragment anchor.
    #[must_use]
    pub fn fragment_anchor(&self, view: ViewId) -> Option<NodeId> {
        self.local_idx(view)
            .and_then(|idx| self.scroll[idx as usize].fragment_anchor)
    }

    // -- Internal --

    pub(crate) fn scroll_to_fragment_anchor_idx(&mut self, idx: u32, client: &dyn FrameClient) {
        let area = &self.scroll[idx as usize];
        let Some(node) = area.fragment_anchor else {
            return;
        };
        if area.in_update_scrollbars {
            return;
        }
        let view = self.id_at(idx);
        if let Some(rect) = client.node_rect(self, view, node) {
            self.set_scroll_offset_idx(idx, rect.origin().to_vec2(), ScrollType::Programmatic);
        }
        let loaded = self.document[idx as usize]
            .as_ref()
            .is_some_and(|d| d.load_completed);
        if loaded {
            self.scroll[idx as usize].fragment_anchor = None;
        }
    }

    fn clear_scroll_anchor_idx(&mut self, idx: u32) {
        self.scroll[idx as usize].anchor = ScrollAnchor::default();
        self.anchoring_queue.retain(|&i| i != idx);
    }

    /// Records where the anchor node is before layout moves it.
    ///
    /// Without a registered anchor, a scrolled view asks the client to
    /// pick one. A node the client can no longer place clears the anchor.
    /// While an adjustment is queued the earlier position is kept, so
    /// repeated layouts before the drain add up.
    pub(crate) fn save_scroll_anchor(&mut self, idx: u32, client: &dyn FrameClient) {
        let area = &self.scroll[idx as usize];
        if !self.config.scroll_anchoring_enabled || !area.overflow_anchor || area.anchor.queued {
            return;
        }
        let view = self.id_at(idx);
        let node = match area.anchor.node {
            Some(node) => Some(node),
            None if area.offset != Vec2::ZERO => client.select_scroll_anchor(self, view),
            None => None,
        };
        let Some(node) = node else {
            return;
        };
        match client.anchor_position(self, view, node) {
            Some(position) => {
                let anchor = &mut self.scroll[idx as usize].anchor;
                anchor.node = Some(node);
                anchor.saved = Some(position);
            }
            None => self.clear_scroll_anchor_idx(idx),
        }
    }

    /// Queues the view for an anchoring adjustment after layout.
    pub(crate) fn queue_scroll_anchoring(&mut self, idx: u32) {
        let anchor = &mut self.scroll[idx as usize].anchor;
        if anchor.saved.is_none() || anchor.queued {
            return;
        }
        anchor.queued = true;
        self.anchoring_queue.push(idx);
    }

    /// Drains the anchoring queue for views under `root`, scrolling each by
    /// however far its anchor moved since it was saved.
    ///
    /// Entries for views outside `root` stay queued for their own pass.
    pub(crate) fn perform_scroll_anchoring(
        &mut self,
        root: u32,
        client: &dyn FrameClient,
    ) -> Vec<AnchorAdjustment> {
        let queue = core::mem::take(&mut self.anchoring_queue);
        let mut adjustments = Vec::new();
        for idx in queue {
            if !self.alive[idx as usize] || !self.is_local_idx(idx) {
                continue;
            }
            if !self.is_in_subtree(idx, root) {
                self.anchoring_queue.push(idx);
                continue;
            }
            let anchor = &mut self.scroll[idx as usize].anchor;
            anchor.queued = false;
            let (Some(node), Some(saved)) = (anchor.node, anchor.saved.take()) else {
                continue;
            };
            let view = self.id_at(idx);
            let Some(now) = client.anchor_position(self, view, node) else {
                self.clear_scroll_anchor_idx(idx);
                continue;
            };
            let delta = now - saved;
            if delta == Vec2::ZERO {
                continue;
            }
            let before = self.scroll[idx as usize].offset;
            self.set_scroll_offset_idx(idx, before + delta, ScrollType::Anchoring);
            let applied = self.scroll[idx as usize].offset - before;
            if applied != Vec2::ZERO {
                adjustments.push(AnchorAdjustment {
                    view,
                    node,
                    delta: applied,
                });
            }
        }
        adjustments
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;

    use kurbo::{Point, Rect, Size};

    use super::*;
    use crate::client::LayoutOutput;
    use crate::invalidation::LayoutScope;

    /// Places nodes at fixed content positions.
    #[derive(Default)]
    struct Positions {
        at: BTreeMap<NodeId, Point>,
        pick: Option<NodeId>,
    }

    impl FrameClient for Positions {
        fn layout(&mut self, _: &ViewTree, _: ViewId, _: &LayoutScope) -> LayoutOutput {
            LayoutOutput::default()
        }

        fn select_scroll_anchor(&self, _: &ViewTree, _: ViewId) -> Option<NodeId> {
            self.pick
        }

        fn anchor_position(&self, _: &ViewTree, _: ViewId, node: NodeId) -> Option<Point> {
            self.at.get(&node).copied()
        }

        fn node_rect(&self, _: &ViewTree, _: ViewId, node: NodeId) -> Option<Rect> {
            self.at
                .get(&node)
                .map(|&p| Rect::from_origin_size(p, Size::new(10.0, 10.0)))
        }
    }

    fn scrolled_view(tree: &mut ViewTree) -> ViewId {
        let v = tree.create_local_view(Rect::new(0.0, 0.0, 400.0, 300.0));
        tree.set_contents_size(v, Size::new(300.0, 2000.0));
        let _ = tree.layout[v.idx as usize].take_scope();
        tree.set_scroll_offset(v, Vec2::new(0.0, 400.0), ScrollType::User);
        v
    }

    #[test]
    fn anchor_delta_is_applied_once() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(3), Point::new(0.0, 500.0));
        tree.set_scroll_anchor(v, NodeId(3));

        tree.save_scroll_anchor(v.idx, &client);
        tree.queue_scroll_anchoring(v.idx);
        tree.queue_scroll_anchoring(v.idx);
        client.at.insert(NodeId(3), Point::new(0.0, 620.0));

        let adjustments = tree.perform_scroll_anchoring(v.idx, &client);
        assert_eq!(
            adjustments,
            alloc::vec![AnchorAdjustment {
                view: v,
                node: NodeId(3),
                delta: Vec2::new(0.0, 120.0),
            }]
        );
        assert_eq!(tree.scroll_offset(v), Vec2::new(0.0, 520.0));
        assert_eq!(tree.scroll_anchor(v), Some(NodeId(3)));
        assert!(tree.perform_scroll_anchoring(v.idx, &client).is_empty());
    }

    #[test]
    fn layouts_before_the_drain_add_up() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(3), Point::new(0.0, 500.0));
        tree.set_scroll_anchor(v, NodeId(3));

        tree.save_scroll_anchor(v.idx, &client);
        client.at.insert(NodeId(3), Point::new(0.0, 600.0));
        tree.queue_scroll_anchoring(v.idx);

        // A second layout before the drain must not move the saved position.
        tree.save_scroll_anchor(v.idx, &client);
        client.at.insert(NodeId(3), Point::new(0.0, 650.0));
        tree.queue_scroll_anchoring(v.idx);

        let adjustments = tree.perform_scroll_anchoring(v.idx, &client);
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].delta, Vec2::new(0.0, 150.0));
        assert_eq!(tree.scroll_offset(v), Vec2::new(0.0, 550.0));

        // Drained: the next layout saves afresh.
        tree.save_scroll_anchor(v.idx, &client);
        client.at.insert(NodeId(3), Point::new(0.0, 660.0));
        tree.queue_scroll_anchoring(v.idx);
        let adjustments = tree.perform_scroll_anchoring(v.idx, &client);
        assert_eq!(adjustments[0].delta, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn vanished_anchor_is_cleared() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(3), Point::new(0.0, 500.0));
        tree.set_scroll_anchor(v, NodeId(3));
        tree.save_scroll_anchor(v.idx, &client);
        tree.queue_scroll_anchoring(v.idx);

        client.at.clear();
        assert!(tree.perform_scroll_anchoring(v.idx, &client).is_empty());
        assert_eq!(tree.scroll_anchor(v), None);
        assert_eq!(tree.scroll_offset(v), Vec2::new(0.0, 400.0));
    }

    #[test]
    fn scrolled_view_picks_an_anchor() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(9), Point::new(0.0, 450.0));
        client.pick = Some(NodeId(9));
        tree.save_scroll_anchor(v.idx, &client);
        assert_eq!(tree.scroll_anchor(v), Some(NodeId(9)));
    }

    #[test]
    fn overflow_anchor_none_disables_anchoring() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(3), Point::new(0.0, 500.0));
        tree.set_scroll_anchor(v, NodeId(3));
        tree.set_overflow_anchor(v, false);
        assert_eq!(tree.scroll_anchor(v), None);

        client.pick = Some(NodeId(3));
        tree.save_scroll_anchor(v.idx, &client);
        tree.queue_scroll_anchoring(v.idx);
        assert!(tree.anchoring_queue.is_empty());
    }

    #[test]
    fn fragment_anchor_waits_for_layout() {
        let mut tree = ViewTree::default();
        let v = tree.create_local_view(Rect::new(0.0, 0.0, 400.0, 300.0));
        let mut client = Positions::default();
        client.at.insert(NodeId(5), Point::new(0.0, 800.0));

        tree.set_fragment_anchor(v, NodeId(5), &client);
        assert_eq!(tree.scroll_offset(v), Vec2::ZERO);
        assert_eq!(tree.fragment_anchor(v), Some(NodeId(5)));

        tree.set_contents_size(v, Size::new(300.0, 2000.0));
        let _ = tree.layout[v.idx as usize].take_scope();
        tree.scroll_to_fragment_anchor(v, &client);
        assert_eq!(tree.scroll_offset(v), Vec2::new(0.0, 800.0));
        assert_eq!(tree.fragment_anchor(v), Some(NodeId(5)));
    }

    #[test]
    fn fragment_anchor_is_dropped_after_load() {
        let mut tree = ViewTree::default();
        let v = scrolled_view(&mut tree);
        let mut client = Positions::default();
        client.at.insert(NodeId(5), Point::new(0.0, 100.0));
        tree.set_load_completed(v);
        tree.set_fragment_anchor(v, NodeId(5), &client);
        assert_eq!(tree.scroll_offset(v), Vec2::new(0.0, 100.0));
        assert_eq!(tree.fragment_anchor(v), None);
    }
}
