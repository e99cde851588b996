// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channels for the view arena.
//!
//! View-level invalidation that depends on ancestry is tracked with
//! [`understory_dirty`], keyed by raw view slot index. Every parent/child
//! link adds a dependency edge from child to parent on each channel, so
//! marking with [`EagerPolicy`](understory_dirty::EagerPolicy) reaches the
//! whole subtree and draining with `affected().deterministic()` yields
//! parents before children.
//!
//! - [`PAINT_PROPERTY`]: paint properties (scroll translation, clips) must
//!   be rebuilt. Marked eagerly when a whole subtree is affected, locally
//!   otherwise. Drained by the pre-paint phase.
//! - [`THROTTLING`]: a view's throttling inputs changed; its descendants'
//!   `subtree_throttled` flags are recomputed top-down. Drained as soon as
//!   the change is applied, or at the start of the next pass for marks left
//!   by topology changes.
//! - [`VIEWPORT`]: geometry that feeds child visibility changed (frame
//!   rect, scroll offset). Drained by the viewport intersection step.
//!
//! Per-view layout and paint damage live in plain per-view trackers (see
//! [`invalidation`](crate::invalidation)); they never propagate.

use understory_dirty::Channel;

/// Paint properties need rebuilding.
pub const PAINT_PROPERTY: Channel = Channel::new(0);

/// Throttling inputs changed; inherited throttling must be recomputed.
pub const THROTTLING: Channel = Channel::new(1);

/// Geometry feeding the viewport intersection of child views changed.
pub const VIEWPORT: Channel = Channel::new(2);
