// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View, document, origin, and node identity types.

use core::fmt;

/// Sentinel value meaning "no view" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a view in a [`ViewTree`](super::ViewTree).
///
/// Holds a slot index and a generation counter. Once the view is destroyed
/// and its slot reused, old handles no longer validate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ViewId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Rebuilds a handle from its raw parts, as recorded in a trace.
    ///
    /// The result only validates against a tree whose slot `index` still
    /// holds generation `generation`.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({}@gen{})", self.idx, self.generation)
    }
}

/// Identifies one committed document. A navigation always produces a new id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub u32);

/// A security origin, as far as throttling cares: two documents are
/// same-origin exactly when their `OriginId`s are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OriginId(pub u32);

impl OriginId {
    /// The origin of an initial empty document before anything commits.
    pub const OPAQUE: Self = Self(u32::MAX);
}

/// An embedder-assigned handle to a layout object inside one document.
///
/// The core never interprets it; it is only stored (layout subtree roots,
/// scroll anchors, fragment targets) and handed back to the
/// [`FrameClient`](crate::client::FrameClient).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);
