// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View tree data model.
//!
//! A *view* is one frame's renderable surface in a tree of nested frames.
//! Each view has:
//!
//! - An identity ([`ViewId`]), a generational handle that goes stale when
//!   the view is destroyed. Back-references between views, documents, and
//!   layout objects are handles and indices, never owning pointers.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree.
//! - A [`ViewKind`]. Local views carry a document and all per-frame
//!   lifecycle state; remote views stand in for frames rendered elsewhere.
//!
//! All views live in one struct-of-arrays [`ViewTree`]. Lifecycle state that
//! depends on ancestry (inherited throttling, subtree paint property
//! updates, child visibility) is tracked with the channels in
//! [`dirty`](crate::dirty).

mod id;
mod store;
mod traverse;

pub use id::{DocumentId, INVALID, NodeId, OriginId, ViewId};
pub use store::{ViewKind, ViewTree};
pub use traverse::Children;
