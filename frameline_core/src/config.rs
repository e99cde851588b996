// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunables for a [`ViewTree`](crate::view::ViewTree).

/// Runtime switches and limits consulted by the lifecycle machinery.
///
/// Use one of the presets and override individual fields as needed:
///
/// ```
/// use frameline_core::config::LifecycleConfig;
///
/// let config = LifecycleConfig {
///     scroll_anchoring_enabled: false,
///     ..LifecycleConfig::desktop()
/// };
/// assert_eq!(config.max_scrollbar_passes, 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifecycleConfig {
    /// Whether hidden cross-origin frames may skip lifecycle work.
    pub throttling_enabled: bool,
    /// Whether subframes stay lifecycle-throttled until
    /// [`begin_lifecycle_updates`](crate::view::ViewTree::begin_lifecycle_updates)
    /// is called for a committed document.
    pub throttle_loading_frames: bool,
    /// Whether registered scroll anchors adjust the scroll offset after
    /// layout.
    pub scroll_anchoring_enabled: bool,
    /// Overlay scrollbars take no layout space and are settled in one pass.
    pub overlay_scrollbars: bool,
    /// Never show scrollbars, regardless of mode.
    pub hide_scrollbars: bool,
    /// Thickness of a classic (non-overlay) scrollbar.
    pub scrollbar_thickness: f64,
    /// Upper bound on scrollbar existence passes.
    pub max_scrollbar_passes: u8,
    /// Upper bound on resize observer delivery rounds per pass.
    pub max_resize_observer_rounds: u8,
}

impl LifecycleConfig {
    /// Classic scrollbars, throttling of loading and hidden frames, scroll
    /// anchoring on.
    #[must_use]
    pub const fn desktop() -> Self {
        Self {
            throttling_enabled: true,
            throttle_loading_frames: true,
            scroll_anchoring_enabled: true,
            overlay_scrollbars: false,
            hide_scrollbars: false,
            scrollbar_thickness: 15.0,
            max_scrollbar_passes: 3,
            max_resize_observer_rounds: 4,
        }
    }

    /// Overlay scrollbars that never take layout space.
    #[must_use]
    pub const fn mobile() -> Self {
        Self {
            overlay_scrollbars: true,
            scrollbar_thickness: 0.0,
            ..Self::desktop()
        }
    }

    /// Returns how many scrollbar existence passes to attempt.
    ///
    /// Overlay scrollbars, and suppressed scrollbar updates, settle in a
    /// single pass.
    #[must_use]
    pub const fn scrollbar_pass_limit(&self, suppressed: bool) -> u8 {
        if self.overlay_scrollbars || suppressed {
            1
        } else if self.max_scrollbar_passes == 0 {
            1
        } else {
            self.max_scrollbar_passes
        }
    }

    /// Returns the layout space taken by one scrollbar.
    #[must_use]
    pub const fn effective_scrollbar_thickness(&self) -> f64 {
        if self.overlay_scrollbars || self.hide_scrollbars {
            0.0
        } else {
            self.scrollbar_thickness
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::desktop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_scrollbars_settle_in_one_pass() {
        let mobile = LifecycleConfig::mobile();
        assert_eq!(mobile.scrollbar_pass_limit(false), 1);
        assert_eq!(mobile.effective_scrollbar_thickness(), 0.0);
    }

    #[test]
    fn suppressed_updates_use_one_pass() {
        let desktop = LifecycleConfig::desktop();
        assert_eq!(desktop.scrollbar_pass_limit(false), 3);
        assert_eq!(desktop.scrollbar_pass_limit(true), 1);
    }

    #[test]
    fn zero_pass_cap_still_runs_once() {
        let config = LifecycleConfig {
            max_scrollbar_passes: 0,
            ..LifecycleConfig::desktop()
        };
        assert_eq!(config.scrollbar_pass_limit(false), 1);
    }
}
