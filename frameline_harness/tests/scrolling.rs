// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll anchoring, scrollbar settling, and fragment anchors across passes.

use frameline_core::coordinator::{PassContext, PassReport};
use frameline_core::scroll::{AnchorAdjustment, ScrollType, ScrollbarUpdate};
use frameline_core::view::{NodeId, OriginId, ViewId, ViewTree};
use frameline_harness::SimClient;
use kurbo::{Rect, Vec2};

fn paint(tree: &mut ViewTree, client: &mut SimClient, view: ViewId) -> PassReport {
    let mut cx = PassContext::new(client);
    tree.update_all_lifecycle_phases(view, &mut cx).unwrap()
}

/// Ten 200px blocks in an 800x600 view, painted once and scrolled to 1000.
fn scrolled_page() -> (ViewTree, SimClient, ViewId) {
    let mut tree = ViewTree::default();
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let mut client = SimClient::new();
    client.stack(view, 10, 200.0);
    paint(&mut tree, &mut client, view);
    tree.set_scroll_offset(view, Vec2::new(0.0, 1000.0), ScrollType::User);
    (tree, client, view)
}

#[test]
fn growth_above_the_viewport_keeps_content_in_place() {
    let (mut tree, mut client, view) = scrolled_page();
    let anchor_top = client.block_rect(view, NodeId(5)).map(|r| r.y0);
    assert_eq!(anchor_top, Some(1000.0));

    assert!(client.resize_block(&mut tree, view, NodeId(0), 320.0));
    let report = paint(&mut tree, &mut client, view);

    assert_eq!(
        report.anchor_adjustments,
        vec![AnchorAdjustment {
            view,
            node: NodeId(5),
            delta: Vec2::new(0.0, 120.0),
        }]
    );
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1120.0));
    assert_eq!(tree.scroll_anchor(view), Some(NodeId(5)));

    let visual_top = client
        .block_rect(view, NodeId(5))
        .map(|r| r.y0 - tree.scroll_offset(view).y);
    assert_eq!(visual_top, Some(0.0));
}

/// Where block `node` sits relative to the top of the viewport.
fn visual_top(tree: &ViewTree, client: &SimClient, view: ViewId, node: NodeId) -> Option<f64> {
    client
        .block_rect(view, node)
        .map(|r| r.y0 - tree.scroll_offset(view).y)
}

#[test]
fn relayout_from_resize_event_keeps_content_in_place() {
    let (mut tree, mut client, view) = scrolled_page();
    client.grow_on_resize(view, NodeId(0), 50.0);

    // Layout moves the anchor down by 100, then the resize event it fires
    // grows the page by another 50 and lays out again within the pass.
    client.resize_block(&mut tree, view, NodeId(1), 300.0);
    tree.set_frame_rect(view, Rect::new(0.0, 0.0, 800.0, 500.0));
    let report = paint(&mut tree, &mut client, view);

    assert_eq!(report.layouts, 2);
    assert_eq!(
        report.anchor_adjustments,
        vec![AnchorAdjustment {
            view,
            node: NodeId(5),
            delta: Vec2::new(0.0, 150.0),
        }]
    );
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1150.0));
    assert_eq!(visual_top(&tree, &client, view, NodeId(5)), Some(0.0));
}

#[test]
fn growth_from_resize_observer_keeps_content_in_place() {
    let (mut tree, mut client, view) = scrolled_page();

    client.queue_resize_observation(view, NodeId(0), 80.0);
    let report = paint(&mut tree, &mut client, view);
    assert_eq!(report.resize_observer_rounds, 1);
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1080.0));
    assert_eq!(visual_top(&tree, &client, view, NodeId(5)), Some(0.0));

    client.resize_block(&mut tree, view, NodeId(1), 250.0);
    let report = paint(&mut tree, &mut client, view);
    assert_eq!(
        report.anchor_adjustments,
        vec![AnchorAdjustment {
            view,
            node: NodeId(5),
            delta: Vec2::new(0.0, 50.0),
        }]
    );
    assert_eq!(visual_top(&tree, &client, view, NodeId(5)), Some(0.0));
}

#[test]
fn overflow_anchor_none_lets_content_shift() {
    let (mut tree, mut client, view) = scrolled_page();
    tree.set_overflow_anchor(view, false);

    client.resize_block(&mut tree, view, NodeId(0), 320.0);
    let report = paint(&mut tree, &mut client, view);
    assert!(report.anchor_adjustments.is_empty());
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1000.0));
    assert_eq!(tree.scroll_anchor(view), None);
}

#[test]
fn scrollbars_settle_within_one_pass() {
    let mut tree = ViewTree::default();
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 400.0, 300.0));
    let mut client = SimClient::new();
    // Exactly as tall as the view, one pixel too wide: the horizontal
    // scrollbar takes height, which then needs a vertical one too.
    client.set_min_width(view, 401.0);
    client.stack(view, 3, 100.0);

    let report = paint(&mut tree, &mut client, view);
    assert_eq!(report.layouts, 2);
    assert_eq!(
        tree.scrollable_area(view).map(|a| a.scrollbars()),
        Some((true, true))
    );
    assert_eq!(
        tree.update_scrollbars(view),
        ScrollbarUpdate {
            changed: false,
            passes: 1,
        }
    );

    let report = paint(&mut tree, &mut client, view);
    assert!(!report.did_work());
}

#[test]
fn fragment_anchor_is_followed_until_load_completes() {
    let mut tree = ViewTree::default();
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    tree.commit_navigation(view, OriginId(1)).unwrap();
    let mut client = SimClient::new();
    client.stack(view, 10, 200.0);

    // Layout is dirty, so the scroll waits for the next layout.
    tree.set_fragment_anchor(view, NodeId(5), &client);
    assert_eq!(tree.scroll_offset(view), Vec2::ZERO);
    assert_eq!(tree.fragment_anchor(view), Some(NodeId(5)));

    paint(&mut tree, &mut client, view);
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1000.0));
    assert_eq!(tree.fragment_anchor(view), Some(NodeId(5)));

    tree.set_load_completed(view);
    tree.schedule_relayout(view);
    paint(&mut tree, &mut client, view);
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 1000.0));
    assert_eq!(tree.fragment_anchor(view), None);
}

#[test]
fn user_scroll_drops_the_fragment_anchor() {
    let mut tree = ViewTree::default();
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    tree.commit_navigation(view, OriginId(1)).unwrap();
    let mut client = SimClient::new();
    client.stack(view, 10, 200.0);
    tree.set_fragment_anchor(view, NodeId(5), &client);
    paint(&mut tree, &mut client, view);

    tree.set_scroll_offset(view, Vec2::new(0.0, 200.0), ScrollType::User);
    assert_eq!(tree.fragment_anchor(view), None);
    tree.schedule_relayout(view);
    paint(&mut tree, &mut client, view);
    assert_eq!(tree.scroll_offset(view), Vec2::new(0.0, 200.0));
}
