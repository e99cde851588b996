// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated embedder for end-to-end lifecycle scenarios.
//!
//! [`SimClient`] implements [`FrameClient`] over a toy document model: each
//! local view holds a vertical stack of blocks. Layout places the blocks top
//! to bottom, as wide as the view can show (or wider, see
//! [`SimClient::set_min_width`]), and reports the stack as the contents
//! size. Scroll anchors are picked as the first block not scrolled past.
//!
//! Script is simulated in two places, the only ones where the tree may be
//! mutated during a pass:
//!
//! - queued resize observations grow a block and schedule a relayout when
//!   they are delivered;
//! - a resize event can grow a block and schedule a relayout, and a resize
//!   script runs whenever one is dispatched.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use frameline_core::client::{FrameClient, LayoutOutput, PrePaintInput};
use frameline_core::invalidation::{DamageRegion, LayoutScope};
use frameline_core::time::HostTime;
use frameline_core::view::{NodeId, ViewId, ViewTree};
use kurbo::{Point, Rect, Size};

/// Script run with mutable access to the tree, standing in for an event
/// handler.
pub type Script = Box<dyn FnMut(&mut ViewTree, ViewId)>;

/// How much work a [`SimClient`] was asked to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimCounts {
    /// Style recalculations.
    pub style_recalcs: u32,
    /// Layout calls.
    pub layouts: u32,
    /// Compositing updates.
    pub compositing_updates: u32,
    /// Pre-paint walks.
    pub pre_paints: u32,
    /// Paint calls.
    pub paints: u32,
    /// Resize events dispatched.
    pub resize_events: u32,
    /// Resize observations delivered.
    pub resize_observations: u32,
}

#[derive(Clone, Copy, Debug)]
struct Block {
    node: NodeId,
    height: f64,
}

#[derive(Debug, Default)]
struct SimDocument {
    blocks: Vec<Block>,
    min_width: f64,
    /// Block rects from the last layout.
    boxes: Vec<(NodeId, Rect)>,
    last_scope: Option<LayoutScope>,
    /// Pending observations: which block grows, and by how much.
    observations: Vec<(NodeId, f64)>,
    /// Growth applied by every resize event.
    grow_on_resize: Option<(NodeId, f64)>,
}

/// A [`FrameClient`] over stacks of blocks.
pub struct SimClient {
    documents: BTreeMap<ViewId, SimDocument>,
    clock: Cell<u64>,
    tick: u64,
    counts: SimCounts,
    laid_out: Vec<ViewId>,
    painted: Vec<(ViewId, DamageRegion)>,
    resize_script: Option<Script>,
}

impl fmt::Debug for SimClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimClient")
            .field("documents", &self.documents.len())
            .field("clock", &self.clock.get())
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

impl Default for SimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClient {
    /// Creates a client with no blocks and a clock advancing one tick per
    /// reading.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tick(1)
    }

    /// Creates a client whose clock advances `tick` ticks per reading.
    #[must_use]
    pub fn with_tick(tick: u64) -> Self {
        Self {
            documents: BTreeMap::new(),
            clock: Cell::new(0),
            tick,
            counts: SimCounts::default(),
            laid_out: Vec::new(),
            painted: Vec::new(),
            resize_script: None,
        }
    }

    // -- Document model --

    /// Appends a block to the view's stack.
    ///
    /// Takes effect at the next layout of the view; use
    /// [`resize_block`](Self::resize_block) to change a laid out document.
    pub fn push_block(&mut self, view: ViewId, node: NodeId, height: f64) {
        self.documents
            .entry(view)
            .or_default()
            .blocks
            .push(Block { node, height });
    }

    /// Appends `count` blocks of equal height, numbered `NodeId(0)` upwards
    /// after any blocks already there.
    pub fn stack(&mut self, view: ViewId, count: u32, height: f64) {
        let first = self.documents.get(&view).map_or(0, |d| d.blocks.len());
        for i in 0..count {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "simulated documents hold far fewer than u32::MAX blocks"
            )]
            let node = NodeId(first as u32 + i);
            self.push_block(view, node, height);
        }
    }

    /// Sets the narrowest width the view's blocks are laid out at.
    pub fn set_min_width(&mut self, view: ViewId, width: f64) {
        self.documents.entry(view).or_default().min_width = width;
    }

    /// Changes a block's height and schedules a relayout, the way a DOM
    /// mutation would. Returns `false` if the block does not exist.
    pub fn resize_block(
        &mut self,
        tree: &mut ViewTree,
        view: ViewId,
        node: NodeId,
        height: f64,
    ) -> bool {
        let Some(block) = self
            .documents
            .get_mut(&view)
            .and_then(|d| d.blocks.iter_mut().find(|b| b.node == node))
        else {
            return false;
        };
        block.height = height;
        tree.schedule_relayout(view);
        true
    }

    /// Queues a resize observation for the view. Delivering it grows `node`
    /// by `grow` and schedules a relayout.
    pub fn queue_resize_observation(&mut self, view: ViewId, node: NodeId, grow: f64) {
        self.documents
            .entry(view)
            .or_default()
            .observations
            .push((node, grow));
    }

    /// Makes every resize event dispatched to the view grow `node` by `grow`
    /// and schedule a relayout, the way a resize handler editing the DOM
    /// would.
    pub fn grow_on_resize(&mut self, view: ViewId, node: NodeId, grow: f64) {
        self.documents.entry(view).or_default().grow_on_resize = Some((node, grow));
    }

    /// Sets the script run for every dispatched resize event.
    pub fn set_resize_script(&mut self, script: Script) {
        self.resize_script = Some(script);
    }

    // -- Inspection --

    /// Returns the work counters.
    #[must_use]
    pub fn counts(&self) -> SimCounts {
        self.counts
    }

    /// Returns the views laid out so far, in call order.
    #[must_use]
    pub fn laid_out(&self) -> &[ViewId] {
        &self.laid_out
    }

    /// Returns the views painted so far with the damage they were handed.
    #[must_use]
    pub fn painted(&self) -> &[(ViewId, DamageRegion)] {
        &self.painted
    }

    /// Forgets the recorded layouts and paints. Counters are kept.
    pub fn clear_log(&mut self) {
        self.laid_out.clear();
        self.painted.clear();
    }

    /// Returns the scope of the view's last layout.
    #[must_use]
    pub fn last_scope(&self, view: ViewId) -> Option<&LayoutScope> {
        self.documents.get(&view)?.last_scope.as_ref()
    }

    /// Returns where the last layout put a block, in content coordinates.
    #[must_use]
    pub fn block_rect(&self, view: ViewId, node: NodeId) -> Option<Rect> {
        self.documents
            .get(&view)?
            .boxes
            .iter()
            .find(|(n, _)| *n == node)
            .map(|&(_, rect)| rect)
    }

    /// Returns how many resize observations are still queued for the view.
    #[must_use]
    pub fn pending_resize_observations(&self, view: ViewId) -> usize {
        self.documents
            .get(&view)
            .map_or(0, |d| d.observations.len())
    }
}

impl FrameClient for SimClient {
    fn now(&self) -> HostTime {
        let t = self.clock.get() + self.tick;
        self.clock.set(t);
        HostTime(t)
    }

    fn recalc_style(&mut self, _: &ViewTree, _: ViewId) {
        self.counts.style_recalcs += 1;
    }

    fn layout(&mut self, tree: &ViewTree, view: ViewId, scope: &LayoutScope) -> LayoutOutput {
        self.counts.layouts += 1;
        self.laid_out.push(view);

        let available = tree.visible_content_size(view, false).width;
        let doc = self.documents.entry(view).or_default();
        let width = doc.min_width.max(available);
        let mut y = 0.0;
        doc.boxes.clear();
        for block in &doc.blocks {
            doc.boxes
                .push((block.node, Rect::new(0.0, y, width, y + block.height)));
            y += block.height;
        }
        doc.last_scope = Some(scope.clone());
        LayoutOutput {
            contents_size: Size::new(width, y),
        }
    }

    fn select_scroll_anchor(&self, tree: &ViewTree, view: ViewId) -> Option<NodeId> {
        let top = tree.scroll_offset(view).y;
        self.documents
            .get(&view)?
            .boxes
            .iter()
            .find(|(_, rect)| rect.y1 > top)
            .map(|&(node, _)| node)
    }

    fn anchor_position(&self, _: &ViewTree, view: ViewId, node: NodeId) -> Option<Point> {
        self.block_rect(view, node).map(|rect| rect.origin())
    }

    fn node_rect(&self, _: &ViewTree, view: ViewId, node: NodeId) -> Option<Rect> {
        self.block_rect(view, node)
    }

    fn update_compositing(&mut self, _: &ViewTree, _: ViewId) {
        self.counts.compositing_updates += 1;
    }

    fn pre_paint(&mut self, _: &ViewTree, _: ViewId, _: &PrePaintInput) {
        self.counts.pre_paints += 1;
    }

    fn paint(&mut self, _: &ViewTree, view: ViewId, damage: &DamageRegion) {
        self.counts.paints += 1;
        self.painted.push((view, damage.clone()));
    }

    fn deliver_resize_observations(&mut self, tree: &mut ViewTree, view: ViewId) -> bool {
        let Some(doc) = self.documents.get_mut(&view) else {
            return false;
        };
        if doc.observations.is_empty() {
            return false;
        }
        let (node, grow) = doc.observations.remove(0);
        if let Some(block) = doc.blocks.iter_mut().find(|b| b.node == node) {
            block.height += grow;
        }
        self.counts.resize_observations += 1;
        tree.schedule_relayout(view);
        true
    }

    fn dispatch_resize_event(&mut self, tree: &mut ViewTree, view: ViewId) {
        self.counts.resize_events += 1;
        if let Some(doc) = self.documents.get_mut(&view)
            && let Some((node, grow)) = doc.grow_on_resize
        {
            if let Some(block) = doc.blocks.iter_mut().find(|b| b.node == node) {
                block.height += grow;
            }
            tree.schedule_relayout(view);
        }
        if let Some(script) = &mut self.resize_script {
            script(tree, view);
        }
    }
}
