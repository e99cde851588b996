// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle invariant violations.
//!
//! Every coordinator entry point reports broken invariants as an
//! [`InvariantError`] instead of asserting. Whether to crash, log, or carry
//! on with stale content is left to the caller.

use core::fmt;

use crate::lifecycle::LifecycleState;
use crate::view::ViewId;

/// A lifecycle invariant that did not hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantError {
    /// A pass was requested for a root that already has one in progress.
    Reentrant {
        /// The local root whose pass is already running.
        root: ViewId,
    },
    /// A pass was requested on a view that is not a local root.
    NotLocalRoot {
        /// The view that was passed in.
        view: ViewId,
        /// The local root that owns it.
        local_root: ViewId,
    },
    /// The operation needs a local view but was given a remote one.
    RemoteView {
        /// The remote view.
        view: ViewId,
    },
    /// A document lifecycle transition that is not allowed.
    InvalidTransition {
        /// State before the attempted transition.
        from: LifecycleState,
        /// Requested state.
        to: LifecycleState,
    },
    /// Layout was still dirty after a phase that guarantees it is clean.
    DirtyLayout {
        /// The view with pending layout.
        view: ViewId,
    },
    /// A view can render while one of its ancestors is throttled.
    ThrottledAncestor {
        /// The unthrottled view.
        view: ViewId,
        /// The throttled ancestor.
        ancestor: ViewId,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reentrant { root } => {
                write!(f, "lifecycle pass already in progress for {root:?}")
            }
            Self::NotLocalRoot { view, local_root } => write!(
                f,
                "{view:?} is not a local root (its local root is {local_root:?})"
            ),
            Self::RemoteView { view } => write!(f, "{view:?} is a remote view"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid lifecycle transition {from:?} -> {to:?}")
            }
            Self::DirtyLayout { view } => write!(f, "{view:?} still needs layout"),
            Self::ThrottledAncestor { view, ancestor } => write!(
                f,
                "{view:?} is unthrottled below throttled ancestor {ancestor:?}"
            ),
        }
    }
}

impl core::error::Error for InvariantError {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_names_the_transition() {
        let err = InvariantError::InvalidTransition {
            from: LifecycleState::PaintClean,
            to: LifecycleState::InPerformLayout,
        };
        assert_eq!(
            err.to_string(),
            "invalid lifecycle transition PaintClean -> InPerformLayout"
        );
    }
}
