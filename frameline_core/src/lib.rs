// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document lifecycle scheduling for trees of nested frame views.
//!
//! `frameline_core` decides when style, layout, compositing, pre-paint, and
//! paint run for each frame of a page, and keeps scroll positions stable
//! while they do. It is `no_std` compatible (with `alloc`), stores views in
//! a struct-of-arrays arena addressed by generational handles, and leaves
//! the rendering work itself to the embedder.
//!
//! # Architecture
//!
//! ```text
//!   invalidations (schedule_relayout, invalidate_rect, set_frame_rect, ...)
//!       │
//!       ▼
//!   ViewTree ──► take_visual_update_requests() ──► embedder frame loop
//!                                                       │
//!                 ┌─────────────────────────────────────┘
//!                 ▼
//!   ViewTree::update_lifecycle_phases(root, target, PassContext)
//!       │           │
//!       │           └──► FrameClient (style, layout, paint, events)
//!       ▼
//!   PassReport ──► remote intersections, observers, TraceSink
//! ```
//!
//! **[`view`]**: Struct-of-arrays tree of local and remote views with
//! generational handles.
//!
//! **[`document`]** and **[`lifecycle`]**: Each local view hosts a document
//! whose [`LifecycleState`](lifecycle::LifecycleState) records how far
//! rendering has progressed.
//!
//! **[`invalidation`]**: Layout and paint trackers filled between passes and
//! emptied by them.
//!
//! **[`throttle`]**: Which views may skip lifecycle work, and how that
//! propagates to descendants.
//!
//! **[`scroll`]**: Scroll offsets, scrollbar existence, scroll anchoring and
//! fragment anchors.
//!
//! **[`coordinator`]**: The pass itself, plus posted post-layout tasks.
//!
//! **[`client`]**: The [`FrameClient`](client::FrameClient) trait embedders
//! implement to do the rendering work.
//!
//! **[`observer`]**: Explicitly passed lifecycle observers.
//!
//! **[`dirty`]**: Dirty channels for ancestry-dependent state, via
//! `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! pass instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-view work
//!   records.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod client;
pub mod config;
pub mod coordinator;
pub mod dirty;
pub mod document;
pub mod error;
pub mod invalidation;
pub mod lifecycle;
pub mod observer;
pub mod scroll;
pub mod throttle;
pub mod time;
pub mod trace;
pub mod view;
