// Copyright 2026 the Frameline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle observers.
//!
//! An [`ObserverRegistry`] is built by the embedder and handed to each pass
//! through [`PassContext::with_observers`](crate::coordinator::PassContext::with_observers).
//! Observers hear about every pass that runs with the registry attached and
//! about throttling transitions reported by those passes.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::coordinator::PassReport;
use crate::lifecycle::TargetState;
use crate::throttle::ThrottleTransition;
use crate::view::{ViewId, ViewTree};

/// Receives lifecycle notifications.
///
/// All methods default to no-ops.
pub trait LifecycleObserver {
    /// Called before a pass touches any view.
    fn will_update_lifecycle(&mut self, tree: &ViewTree, root: ViewId, target: TargetState) {
        _ = (tree, root, target);
    }

    /// Called once a pass has finished, successfully or not.
    fn did_update_lifecycle(&mut self, tree: &ViewTree, root: ViewId, report: &PassReport) {
        _ = (tree, root, report);
    }

    /// Called for each throttling flip reported at the end of a pass.
    fn throttling_changed(&mut self, transition: &ThrottleTransition) {
        _ = transition;
    }
}

/// Identifies an observer in an [`ObserverRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u32);

/// An ordered set of [`LifecycleObserver`]s.
///
/// Observers are notified in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(ObserverId, Box<dyn LifecycleObserver>)>,
    next: u32,
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer.
    pub fn add(&mut self, observer: Box<dyn LifecycleObserver>) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(i, _)| *i != id);
        self.observers.len() != before
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn will_update_lifecycle(
        &mut self,
        tree: &ViewTree,
        root: ViewId,
        target: TargetState,
    ) {
        for (_, observer) in &mut self.observers {
            observer.will_update_lifecycle(tree, root, target);
        }
    }

    pub(crate) fn did_update_lifecycle(&mut self, tree: &ViewTree, root: ViewId, report: &PassReport) {
        for (_, observer) in &mut self.observers {
            observer.did_update_lifecycle(tree, root, report);
        }
    }

    pub(crate) fn throttling_changed(&mut self, transition: &ThrottleTransition) {
        for (_, observer) in &mut self.observers {
            observer.throttling_changed(transition);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use kurbo::Rect;

    use super::*;

    struct Counter(Rc<Cell<u32>>);

    impl LifecycleObserver for Counter {
        fn throttling_changed(&mut self, _: &ThrottleTransition) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn add_and_remove() {
        let mut registry = ObserverRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let a = registry.add(Box::new(Counter(hits.clone())));
        let b = registry.add(Box::new(Counter(hits.clone())));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn notifies_every_observer() {
        let mut tree = ViewTree::default();
        let view = tree.create_local_view(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut registry = ObserverRegistry::new();
        let hits = Rc::new(Cell::new(0));
        registry.add(Box::new(Counter(hits.clone())));
        registry.add(Box::new(Counter(hits.clone())));
        registry.throttling_changed(&ThrottleTransition {
            view,
            throttled: true,
        });
        assert_eq!(hits.get(), 2);
    }
}
