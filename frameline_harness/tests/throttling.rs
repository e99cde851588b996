// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Throttling of offscreen and loading frames, and viewport intersections.

use frameline_core::coordinator::{PassContext, PassReport};
use frameline_core::invalidation::DamageRegion;
use frameline_core::scroll::ScrollType;
use frameline_core::throttle::{ThrottleStatus, ThrottleTransition};
use frameline_core::view::{OriginId, ViewId, ViewTree};
use frameline_harness::SimClient;
use kurbo::{Rect, Vec2};

fn paint(tree: &mut ViewTree, client: &mut SimClient, view: ViewId) -> PassReport {
    let mut cx = PassContext::new(client);
    tree.update_all_lifecycle_phases(view, &mut cx).unwrap()
}

/// A 2000px tall page with a cross-origin frame below the fold, which in
/// turn holds a same-origin frame.
fn page_with_offscreen_frame(client: &mut SimClient) -> (ViewTree, ViewId, ViewId, ViewId) {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let frame = tree.create_local_view(Rect::new(0.0, 1000.0, 300.0, 1150.0));
    let inner = tree.create_local_view(Rect::new(0.0, 0.0, 100.0, 50.0));
    tree.add_child(root, frame);
    tree.add_child(frame, inner);
    tree.commit_navigation(root, OriginId(1)).unwrap();
    tree.commit_navigation(frame, OriginId(2)).unwrap();
    tree.commit_navigation(inner, OriginId(2)).unwrap();
    tree.begin_lifecycle_updates(frame);
    tree.begin_lifecycle_updates(inner);
    let _ = tree.take_throttle_transitions();
    client.stack(root, 10, 200.0);
    client.stack(frame, 1, 100.0);
    (tree, root, frame, inner)
}

#[test]
fn offscreen_cross_origin_frame_is_throttled_after_first_pass() {
    let mut client = SimClient::new();
    let (mut tree, root, frame, inner) = page_with_offscreen_frame(&mut client);

    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.throttled_skipped, 0);
    assert!(report.throttle_transitions.contains(&ThrottleTransition {
        view: frame,
        throttled: true,
    }));
    assert!(report.throttle_transitions.contains(&ThrottleTransition {
        view: inner,
        throttled: true,
    }));
    assert_eq!(tree.throttle_status(frame), ThrottleStatus::Throttled);
    assert_eq!(tree.throttle_status(inner), ThrottleStatus::SubtreeThrottled);
    assert_eq!(tree.check_throttling_invariant(root), Ok(()));

    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.throttled_skipped, 1);
    assert!(!report.did_work());
}

#[test]
fn scrolling_frame_into_view_unthrottles_and_repaints_it() {
    let mut client = SimClient::new();
    let (mut tree, root, frame, inner) = page_with_offscreen_frame(&mut client);
    paint(&mut tree, &mut client, root);
    paint(&mut tree, &mut client, root);

    tree.set_scroll_offset(root, Vec2::new(0.0, 900.0), ScrollType::User);
    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.throttled_skipped, 1);
    assert!(report.throttle_transitions.contains(&ThrottleTransition {
        view: frame,
        throttled: false,
    }));
    assert_eq!(tree.throttle_status(frame), ThrottleStatus::Unthrottled);
    assert_eq!(tree.throttle_status(inner), ThrottleStatus::Unthrottled);
    assert_eq!(
        tree.viewport_intersection(frame),
        Some(Rect::new(0.0, 1000.0, 300.0, 1150.0))
    );

    client.clear_log();
    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.throttled_skipped, 0);
    assert!(client.painted().contains(&(frame, DamageRegion::Full)));
    assert!(client.painted().contains(&(inner, DamageRegion::Full)));
    assert_eq!(tree.check_throttling_invariant(root), Ok(()));
}

#[test]
fn loading_root_below_remote_parent_waits_for_lifecycle_updates() {
    let mut tree = ViewTree::default();
    let remote = tree.create_remote_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 300.0, 150.0));
    tree.add_child(remote, view);
    tree.commit_navigation(view, OriginId(3)).unwrap();
    let mut client = SimClient::new();
    client.stack(view, 2, 50.0);

    let report = paint(&mut tree, &mut client, view);
    assert_eq!(report.throttled_skipped, 1);
    assert_eq!(report.layouts, 0);
    assert_eq!(client.counts().layouts, 0);

    tree.begin_lifecycle_updates(view);
    let report = paint(&mut tree, &mut client, view);
    assert!(report.did_work());
    assert_eq!(report.layouts, 1);

    // The remote parent pushes an empty intersection: scrolled out of view.
    tree.set_viewport_intersection(view, Rect::ZERO);
    assert_eq!(tree.throttle_status(view), ThrottleStatus::Throttled);
    let report = paint(&mut tree, &mut client, view);
    assert_eq!(report.throttled_skipped, 1);
}

#[test]
fn remote_children_report_intersection_changes() {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let remote = tree.create_remote_view(Rect::new(100.0, 100.0, 300.0, 300.0));
    tree.add_child(root, remote);
    let mut client = SimClient::new();
    client.stack(root, 10, 200.0);

    let report = paint(&mut tree, &mut client, root);
    assert_eq!(
        report.remote_intersections,
        vec![(remote, Rect::new(100.0, 100.0, 300.0, 300.0))]
    );

    let report = paint(&mut tree, &mut client, root);
    assert!(report.remote_intersections.is_empty());

    tree.set_scroll_offset(root, Vec2::new(0.0, 150.0), ScrollType::User);
    let report = paint(&mut tree, &mut client, root);
    assert_eq!(
        report.remote_intersections,
        vec![(remote, Rect::new(100.0, 150.0, 300.0, 300.0))]
    );
}
