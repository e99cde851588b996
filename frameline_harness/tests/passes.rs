// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole-pass behavior: idempotence, partial layout, reentrancy, resize
//! observers, and local roots below remote views.

use std::cell::RefCell;
use std::rc::Rc;

use frameline_core::coordinator::{PassContext, PassReport};
use frameline_core::error::InvariantError;
use frameline_core::invalidation::LayoutScope;
use frameline_core::lifecycle::LifecycleState;
use frameline_core::view::{NodeId, ViewId, ViewTree};
use frameline_harness::SimClient;
use kurbo::Rect;

fn paint(tree: &mut ViewTree, client: &mut SimClient, view: ViewId) -> PassReport {
    let mut cx = PassContext::new(client);
    tree.update_all_lifecycle_phases(view, &mut cx).unwrap()
}

/// Root with two children, the first of which has a child of its own.
fn nested_tree(client: &mut SimClient) -> (ViewTree, [ViewId; 4]) {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let first = tree.create_local_view(Rect::new(0.0, 0.0, 300.0, 150.0));
    let second = tree.create_local_view(Rect::new(0.0, 200.0, 300.0, 350.0));
    let inner = tree.create_local_view(Rect::new(0.0, 0.0, 100.0, 50.0));
    tree.add_child(root, first);
    tree.add_child(root, second);
    tree.add_child(first, inner);
    client.stack(root, 2, 100.0);
    client.stack(first, 1, 40.0);
    client.stack(second, 1, 40.0);
    client.stack(inner, 1, 20.0);
    (tree, [root, first, second, inner])
}

#[test]
fn second_pass_over_clean_tree_is_a_no_op() {
    let mut client = SimClient::new();
    let (mut tree, views) = nested_tree(&mut client);

    let first = paint(&mut tree, &mut client, views[0]);
    assert!(first.did_work());
    assert_eq!(first.layouts, 4);
    assert_eq!(first.paints, 4);
    for view in views {
        assert_eq!(tree.lifecycle_state(view), Some(LifecycleState::PaintClean));
    }

    let second = paint(&mut tree, &mut client, views[0]);
    assert!(!second.did_work());
    assert_eq!(second.pass_index, first.pass_index + 1);
}

#[test]
fn clean_view_is_not_laid_out_again() {
    let mut tree = ViewTree::default();
    let view = tree.create_local_view(Rect::new(0.0, 0.0, 400.0, 300.0));
    let mut client = SimClient::new();
    client.stack(view, 2, 50.0);

    paint(&mut tree, &mut client, view);
    let layouts = client.counts().layouts;
    paint(&mut tree, &mut client, view);
    assert_eq!(client.counts().layouts, layouts);
    assert_eq!(client.counts().paints, 1);
}

#[test]
fn layout_clean_pass_empties_the_trackers() {
    let mut client = SimClient::new();
    let (mut tree, [root, first, _, _]) = nested_tree(&mut client);
    paint(&mut tree, &mut client, root);

    tree.schedule_relayout(root);
    tree.schedule_relayout_of_subtree(first, NodeId(1));
    assert_eq!(tree.layout_subtree_roots(first), vec![NodeId(1)]);

    let mut cx = PassContext::new(&mut client);
    let report = tree.update_lifecycle_to_layout_clean(root, &mut cx).unwrap();
    assert_eq!(report.layouts, 2);
    assert_eq!(report.paints, 0);

    for view in [root, first] {
        assert!(!tree.needs_layout(view));
        assert!(!tree.layout_pending(view));
        assert!(tree.layout_subtree_roots(view).is_empty());
        assert_eq!(tree.lifecycle_state(view), Some(LifecycleState::LayoutClean));
    }
    assert_eq!(client.last_scope(root), Some(&LayoutScope::Full));
    assert_eq!(
        client.last_scope(first),
        Some(&LayoutScope::Subtrees(vec![NodeId(1)]))
    );
}

#[test]
fn resize_handler_cannot_nest_a_pass() {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 400.0, 300.0));
    let mut client = SimClient::new();
    client.stack(root, 2, 50.0);
    paint(&mut tree, &mut client, root);

    let nested: Rc<RefCell<Option<Result<PassReport, InvariantError>>>> = Rc::default();
    let seen = Rc::clone(&nested);
    client.set_resize_script(Box::new(move |tree: &mut ViewTree, view: ViewId| {
        let mut inner = SimClient::new();
        let mut cx = PassContext::new(&mut inner);
        *seen.borrow_mut() = Some(tree.update_all_lifecycle_phases(view, &mut cx));
    }));

    tree.set_frame_rect(root, Rect::new(0.0, 0.0, 500.0, 300.0));
    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.layouts, 1);
    assert_eq!(client.counts().resize_events, 1);
    assert_eq!(
        *nested.borrow(),
        Some(Err(InvariantError::Reentrant { root }))
    );
    assert_eq!(tree.lifecycle_state(root), Some(LifecycleState::PaintClean));
    assert!(!tree.is_updating_lifecycle(root));
}

#[test]
fn resize_observation_relays_out_within_the_pass() {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let mut client = SimClient::new();
    client.stack(root, 3, 100.0);
    paint(&mut tree, &mut client, root);

    client.queue_resize_observation(root, NodeId(0), 10.0);
    let report = paint(&mut tree, &mut client, root);
    assert_eq!(report.resize_observer_rounds, 1);
    assert_eq!(report.layouts, 1);
    assert_eq!(
        client.block_rect(root, NodeId(1)).map(|r| r.y0),
        Some(110.0)
    );
    assert_eq!(tree.lifecycle_state(root), Some(LifecycleState::PaintClean));
    assert_eq!(client.pending_resize_observations(root), 0);
}

#[test]
fn resize_observer_rounds_are_capped() {
    let mut tree = ViewTree::default();
    let root = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let mut client = SimClient::new();
    client.stack(root, 3, 10.0);
    paint(&mut tree, &mut client, root);
    let _ = tree.take_visual_update_requests();

    for _ in 0..10 {
        client.queue_resize_observation(root, NodeId(0), 1.0);
    }
    let report = paint(&mut tree, &mut client, root);
    let cap = u32::from(tree.config().max_resize_observer_rounds);
    assert_eq!(report.resize_observer_rounds, cap);
    assert_eq!(client.pending_resize_observations(root), 10 - cap as usize);
    assert_eq!(tree.lifecycle_state(root), Some(LifecycleState::PaintClean));
    assert!(tree.take_visual_update_requests().contains(&root));
}

#[test]
fn local_root_below_remote_view_has_its_own_passes() {
    let mut tree = ViewTree::default();
    let outer = tree.create_local_view(Rect::new(0.0, 0.0, 800.0, 600.0));
    let remote = tree.create_remote_view(Rect::new(0.0, 0.0, 300.0, 150.0));
    let inner = tree.create_local_view(Rect::new(0.0, 0.0, 300.0, 150.0));
    tree.add_child(outer, remote);
    tree.add_child(remote, inner);
    let mut client = SimClient::new();

    let report = paint(&mut tree, &mut client, outer);
    assert_eq!(report.layouts, 1);
    assert_eq!(client.laid_out(), &[outer]);
    assert_eq!(
        tree.lifecycle_state(inner),
        Some(LifecycleState::VisualUpdatePending)
    );

    let report = paint(&mut tree, &mut client, inner);
    assert_eq!(report.root, inner);
    assert_eq!(report.layouts, 1);
    assert_eq!(tree.lifecycle_state(inner), Some(LifecycleState::PaintClean));
}
