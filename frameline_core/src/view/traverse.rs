// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, ViewId};
use super::store::ViewTree;

/// An iterator over the direct children of a view.
///
/// Created by [`ViewTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a ViewTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a ViewTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

impl ViewTree {
    /// Appends the subtree rooted at `idx` to `out` in depth-first pre-order.
    pub(crate) fn collect_pre_order(&self, idx: u32, out: &mut Vec<u32>) {
        out.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_pre_order(child, out);
            child = self.next_sibling[child as usize];
        }
    }

    /// Raw child slots of `idx`, in sibling order.
    pub(crate) fn child_indices(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            out.push(child);
            child = self.next_sibling[child as usize];
        }
        out
    }

    /// Returns whether `idx` is `root` or one of its descendants.
    pub(crate) fn is_in_subtree(&self, mut idx: u32, root: u32) -> bool {
        loop {
            if idx == root {
                return true;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
        }
    }
}
