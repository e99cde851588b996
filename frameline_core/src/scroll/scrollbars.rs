// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrollbar existence.

use kurbo::Size;

use super::{ScrollType, ScrollbarMode};
use crate::dirty;
use crate::lifecycle::LifecycleState;
use crate::view::{ViewId, ViewTree};

/// Outcome of settling a view's scrollbars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollbarUpdate {
    /// Whether either scrollbar appeared or disappeared.
    pub changed: bool,
    /// How many existence passes ran.
    pub passes: u8,
}

impl ViewTree {
    /// Decides which scrollbars the view shows for its current contents
    /// size.
    ///
    /// Runs up to
    /// [`scrollbar_pass_limit`](crate::config::LifecycleConfig::scrollbar_pass_limit)
    /// passes and stops early once a pass changes nothing. If the passes run
    /// out first, the last pass wins. When scrollbars appear or disappear
    /// (and updates are not suppressed) the view needs a full layout, and the
    /// scroll offset is clamped to the new extent.
    pub fn update_scrollbars(&mut self, view: ViewId) -> ScrollbarUpdate {
        match self.local_idx(view) {
            Some(idx) => self.update_scrollbars_idx(idx),
            None => ScrollbarUpdate::default(),
        }
    }

    /// Sets the scrollbar mode for each axis.
    pub fn set_scrollbar_modes(
        &mut self,
        view: ViewId,
        horizontal: ScrollbarMode,
        vertical: ScrollbarMode,
    ) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        let area = &mut self.scroll[idx as usize];
        if area.horizontal_mode == horizontal && area.vertical_mode == vertical {
            return;
        }
        area.horizontal_mode = horizontal;
        area.vertical_mode = vertical;
        area.needs_scrollbars_update = true;
        self.update_scrollbars_idx(idx);
    }

    /// Suppresses scrollbar changes from triggering layout.
    ///
    /// While suppressed, auto scrollbars keep their current state and only
    /// forced modes apply. Lifting the suppression settles the scrollbars
    /// again.
    pub fn set_scrollbars_suppressed(&mut self, view: ViewId, suppressed: bool) {
        let Some(idx) = self.local_idx(view) else {
            return;
        };
        if self.scroll[idx as usize].suppressed == suppressed {
            return;
        }
        self.scroll[idx as usize].suppressed = suppressed;
        if !suppressed {
            self.update_scrollbars_idx(idx);
        }
    }

    /// Sets the size of the scrolled contents and settles the scrollbars.
    pub fn set_contents_size(&mut self, view: ViewId, size: Size) {
        if let Some(idx) = self.local_idx(view) {
            self.set_contents_size_idx(idx, size);
        }
    }

    pub(crate) fn set_contents_size_idx(&mut self, idx: u32, size: Size) -> ScrollbarUpdate {
        let area = &mut self.scroll[idx as usize];
        if area.contents_size == size && !area.needs_scrollbars_update {
            return ScrollbarUpdate::default();
        }
        area.contents_size = size;
        self.update_scrollbars_idx(idx)
    }

    pub(crate) fn update_scrollbars_idx(&mut self, idx: u32) -> ScrollbarUpdate {
        self.scroll[idx as usize].needs_scrollbars_update = false;
        if self.scroll[idx as usize].in_update_scrollbars {
            return ScrollbarUpdate::default();
        }
        self.scroll[idx as usize].in_update_scrollbars = true;

        let suppressed = self.scroll[idx as usize].suppressed;
        let limit = self.config.scrollbar_pass_limit(suppressed);
        let mut update = ScrollbarUpdate::default();
        for pass in 0..limit {
            update.passes += 1;
            let (horizontal, vertical) = self.compute_scrollbar_existence(idx, pass == 0);
            let area = &mut self.scroll[idx as usize];
            if (horizontal, vertical) == (area.has_horizontal, area.has_vertical) {
                break;
            }
            area.has_horizontal = horizontal;
            area.has_vertical = vertical;
            update.changed = true;
        }
        self.scroll[idx as usize].in_update_scrollbars = false;

        if update.changed {
            let view = self.id_at(idx);
            self.set_needs_paint_property_update(view);
            self.dirty.mark(idx, dirty::VIEWPORT);
            self.paint[idx as usize].invalidate_full();
            if !suppressed && !self.config.overlay_scrollbars {
                // The space available to the contents changed.
                self.layout[idx as usize].needs_full_layout = true;
                self.layout[idx as usize].subtree_roots.clear();
                self.regress_lifecycle(idx, LifecycleState::VisualUpdatePending);
                // A running layout picks the change up itself.
                if self.layout[idx as usize].scheduling_enabled && !self.should_throttle_idx(idx) {
                    self.request_visual_update(idx);
                }
            }
        }

        let offset = self.scroll[idx as usize].offset;
        if self.clamp_scroll_offset_idx(idx, offset) != offset {
            self.set_scroll_offset_idx(idx, offset, ScrollType::Clamping);
        }
        update
    }

    /// Returns `(horizontal, vertical)` for one existence pass.
    ///
    /// The first pass tries to drop both auto scrollbars when the contents
    /// fit in the full frame; later passes decide each auto scrollbar from
    /// the space left by the other one.
    fn compute_scrollbar_existence(&self, idx: u32, first_pass: bool) -> (bool, bool) {
        if self.config.hide_scrollbars {
            return (false, false);
        }
        let area = &self.scroll[idx as usize];
        let h_mode = area.horizontal_mode;
        let v_mode = area.vertical_mode;
        let mut horizontal = area.has_horizontal;
        let mut vertical = area.has_vertical;
        if h_mode != ScrollbarMode::Auto {
            horizontal = h_mode == ScrollbarMode::AlwaysOn;
        }
        if v_mode != ScrollbarMode::Auto {
            vertical = v_mode == ScrollbarMode::AlwaysOn;
        }
        if area.suppressed || (h_mode != ScrollbarMode::Auto && v_mode != ScrollbarMode::Auto) {
            return (horizontal, vertical);
        }

        let contents = area.contents_size;
        let visible = self.visible_content_size_idx(idx, false);
        if h_mode == ScrollbarMode::Auto {
            horizontal = contents.width > visible.width;
        }
        if v_mode == ScrollbarMode::Auto {
            vertical = contents.height > visible.height;
        }
        if self.config.overlay_scrollbars {
            return (horizontal, vertical);
        }

        let full = self.visible_content_size_idx(idx, true);
        if first_pass && contents.width <= full.width && contents.height <= full.height {
            if h_mode == ScrollbarMode::Auto {
                horizontal = false;
            }
            if v_mode == ScrollbarMode::Auto {
                vertical = false;
            }
        }
        (horizontal, vertical)
    }
}
