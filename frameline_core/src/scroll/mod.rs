// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrolling, resizing, and scroll anchoring for local views.
//!
//! Every local view owns a [`ScrollableArea`]: its scroll offset, the size of
//! its contents, which scrollbars it shows, and the anchors used to keep the
//! visible content stable across layout:
//!
//! - A *scroll anchor* is a node whose position is saved before layout.
//!   After layout the view is queued, and the coordinator scrolls by however
//!   far the node moved, once per pass.
//! - A *fragment anchor* is the target of a URL fragment. Scrolling to it
//!   waits until layout is clean.
//!
//! Scrollbar existence is settled by a bounded fixed-point loop in
//! [`scrollbars`]: showing one classic scrollbar shrinks the space available
//! along the other axis, which can make the other scrollbar necessary.

mod anchor;
mod scrollbars;

pub use anchor::AnchorAdjustment;
pub use scrollbars::ScrollbarUpdate;

use kurbo::{Point, Rect, Size, Vec2};

use crate::dirty;
use crate::lifecycle::LifecycleState;
use crate::view::{NodeId, ViewId, ViewTree};

/// When a scrollbar is shown along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScrollbarMode {
    /// Shown when the contents overflow along this axis.
    #[default]
    Auto,
    /// Never shown.
    AlwaysOff,
    /// Always shown.
    AlwaysOn,
}

/// What caused a scroll offset change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrollType {
    /// Direct user input on this thread.
    User,
    /// Script or embedder request.
    Programmatic,
    /// A scroll performed by the compositor and reported back.
    Compositor,
    /// A scroll anchoring adjustment.
    Anchoring,
    /// Clamping after the scrollable extent shrank.
    Clamping,
}

impl ScrollType {
    /// User and compositor scrolls mean the user took over; a pending
    /// fragment scroll must not yank them back.
    const fn clears_fragment_anchor(self) -> bool {
        matches!(self, Self::User | Self::Compositor)
    }

    const fn clears_scroll_anchor(self) -> bool {
        !matches!(self, Self::Anchoring | Self::Clamping)
    }
}

/// Which viewport dimensions changed in a resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResizeInfo {
    /// The width changed.
    pub width_changed: bool,
    /// The height changed.
    pub height_changed: bool,
}

/// Anchor node plus the position saved for it before layout.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ScrollAnchor {
    pub(crate) node: Option<NodeId>,
    pub(crate) saved: Option<Point>,
    pub(crate) queued: bool,
}

/// Scroll state of one local view.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollableArea {
    pub(crate) offset: Vec2,
    pub(crate) contents_size: Size,
    pub(crate) horizontal_mode: ScrollbarMode,
    pub(crate) vertical_mode: ScrollbarMode,
    pub(crate) has_horizontal: bool,
    pub(crate) has_vertical: bool,
    pub(crate) needs_scrollbars_update: bool,
    pub(crate) in_update_scrollbars: bool,
    pub(crate) suppressed: bool,
    pub(crate) anchor: ScrollAnchor,
    pub(crate) overflow_anchor: bool,
    pub(crate) fragment_anchor: Option<NodeId>,
    pub(crate) last_viewport_size: Size,
    pub(crate) resize: Option<ResizeInfo>,
}

impl Default for ScrollableArea {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            contents_size: Size::ZERO,
            horizontal_mode: ScrollbarMode::Auto,
            vertical_mode: ScrollbarMode::Auto,
            has_horizontal: false,
            has_vertical: false,
            needs_scrollbars_update: false,
            in_update_scrollbars: false,
            suppressed: false,
            anchor: ScrollAnchor::default(),
            overflow_anchor: true,
            fragment_anchor: None,
            last_viewport_size: Size::ZERO,
            resize: None,
        }
    }
}

impl ScrollableArea {
    /// Drops everything tied to the previous document.
    pub(crate) fn reset_for_new_document(&mut self, viewport: Size) {
        *self = Self {
            last_viewport_size: viewport,
            ..Self::default()
        };
    }

    /// Returns the current scroll offset.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Returns the size of the scrolled contents.
    #[must_use]
    pub fn contents_size(&self) -> Size {
        self.contents_size
    }

    /// Returns which scrollbars are shown, as `(horizontal, vertical)`.
    #[must_use]
    pub fn scrollbars(&self) -> (bool, bool) {
        (self.has_horizontal, self.has_vertical)
    }
}

impl ViewTree {
    /// Returns the scroll state of a local view.
    #[must_use]
    pub fn scrollable_area(&self, view: ViewId) -> Option<&ScrollableArea> {
        self.local_idx(view).map(|idx| &self.scroll[idx as usize])
    }

    /// Returns the view's scroll offset; zero for remote views.
    #[must_use]
    pub fn scroll_offset(&self, view: ViewId) -> Vec2 {
        self.local_idx(view)
            .map_or(Vec2::ZERO, |idx| self.scroll[idx as usize].offset)
    }

    /// Scrolls the view, clamping to the scrollable extent.
    ///
    /// User and compositor scrolls drop the fragment anchor. Every scroll
    /// except anchoring adjustments and clamping drops the scroll anchor.
    pub fn set_scroll_offset(&mut self, view: ViewId, offset: Vec2, ty: ScrollType) {
        if let Some(idx) = self.local_idx(view) {
            self.set_scroll_offset_idx(idx, offset, ty);
        }
    }

    /// Returns the largest offset the view can scroll to.
    #[must_use]
    pub fn maximum_scroll_offset(&self, view: ViewId) -> Vec2 {
        self.local_idx(view)
            .map_or(Vec2::ZERO, |idx| self.maximum_scroll_offset_idx(idx))
    }

    /// Returns the size of the viewport, with or without the space taken by
    /// classic scrollbars.
    #[must_use]
    pub fn visible_content_size(&self, view: ViewId, include_scrollbars: bool) -> Size {
        self.validate(view);
        self.visible_content_size_idx(view.idx, include_scrollbars)
    }

    /// Returns the part of the contents currently in view, in content
    /// coordinates.
    #[must_use]
    pub fn visible_content_rect(&self, view: ViewId) -> Rect {
        self.validate(view);
        self.visible_content_rect_idx(view.idx)
    }

    /// Moves or resizes a view within its parent.
    ///
    /// A local view whose size changed records which dimensions changed,
    /// settles its scrollbars again, and schedules a layout. Position
    /// changes only need new paint properties.
    pub fn set_frame_rect(&mut self, view: ViewId, rect: Rect) {
        self.validate(view);
        let idx = view.idx;
        let old = self.frame_rect[idx as usize];
        if old == rect {
            return;
        }
        self.frame_rect[idx as usize] = rect;
        self.dirty.mark(idx, dirty::VIEWPORT);
        if !self.is_local_idx(idx) {
            return;
        }

        self.set_needs_paint_property_update(view);
        if old.size() == rect.size() {
            return;
        }
        let area = &mut self.scroll[idx as usize];
        let resize = area.resize.get_or_insert_with(ResizeInfo::default);
        resize.width_changed |= old.width() != rect.width();
        resize.height_changed |= old.height() != rect.height();
        area.needs_scrollbars_update = true;
        self.update_scrollbars_idx(idx);
        self.schedule_relayout(view);
    }

    /// Returns the viewport dimensions changed since the view was last laid
    /// out. Layout code reads this to update viewport-dependent styles.
    #[must_use]
    pub fn pending_resize(&self, view: ViewId) -> Option<ResizeInfo> {
        self.local_idx(view)
            .and_then(|idx| self.scroll[idx as usize].resize)
    }

    // -- Internal --

    pub(crate) fn set_scroll_offset_idx(&mut self, idx: u32, offset: Vec2, ty: ScrollType) {
        let clamped = self.clamp_scroll_offset_idx(idx, offset);
        let area = &mut self.scroll[idx as usize];
        if ty.clears_fragment_anchor() {
            area.fragment_anchor = None;
        }
        if ty.clears_scroll_anchor() {
            area.anchor = ScrollAnchor::default();
        }
        if clamped == area.offset {
            return;
        }
        area.offset = clamped;

        // Scroll translation changed, and with it what nested views can see.
        self.dirty.mark(idx, dirty::PAINT_PROPERTY);
        self.paint[idx as usize].needs_paint_property_update = true;
        self.dirty.mark(idx, dirty::VIEWPORT);
        self.regress_lifecycle(idx, LifecycleState::CompositingClean);
        if !self.should_throttle_idx(idx) {
            self.request_visual_update(idx);
        }
    }

    pub(crate) fn maximum_scroll_offset_idx(&self, idx: u32) -> Vec2 {
        let contents = self.scroll[idx as usize].contents_size;
        let visible = self.visible_content_size_idx(idx, false);
        Vec2::new(
            (contents.width - visible.width).max(0.0),
            (contents.height - visible.height).max(0.0),
        )
    }

    pub(crate) fn clamp_scroll_offset_idx(&self, idx: u32, offset: Vec2) -> Vec2 {
        let max = self.maximum_scroll_offset_idx(idx);
        Vec2::new(offset.x.max(0.0).min(max.x), offset.y.max(0.0).min(max.y))
    }

    pub(crate) fn visible_content_size_idx(&self, idx: u32, include_scrollbars: bool) -> Size {
        let frame = self.frame_rect[idx as usize].size();
        if include_scrollbars || !self.is_local_idx(idx) {
            return frame;
        }
        let area = &self.scroll[idx as usize];
        let thickness = self.config.effective_scrollbar_thickness();
        let mut size = frame;
        if area.has_vertical {
            size.width = (size.width - thickness).max(0.0);
        }
        if area.has_horizontal {
            size.height = (size.height - thickness).max(0.0);
        }
        size
    }

    pub(crate) fn visible_content_rect_idx(&self, idx: u32) -> Rect {
        let origin = if self.is_local_idx(idx) {
            self.scroll[idx as usize].offset.to_point()
        } else {
            Point::ZERO
        };
        Rect::from_origin_size(origin, self.visible_content_size_idx(idx, false))
    }

    /// Reports a viewport size change to the document, once per change.
    pub(crate) fn send_resize_event_if_needed(
        &mut self,
        idx: u32,
        client: &mut dyn crate::client::FrameClient,
    ) {
        let size = self.visible_content_size_idx(idx, true);
        if self.scroll[idx as usize].last_viewport_size == size {
            return;
        }
        self.scroll[idx as usize].last_viewport_size = size;
        let view = self.id_at(idx);
        client.dispatch_resize_event(self, view);
    }
}
