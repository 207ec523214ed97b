//! Lifecycle notifications for fork and merge.
//!
//! Observers are registered explicitly and called synchronously in
//! registration order. The `before` hooks fire after eligibility passes but
//! before any row is written; the `after` hooks fire once the transaction
//! has committed, so cache or search invalidation hangs off those.

use crate::model::Item;

/// Receives fork and merge lifecycle events. All methods default to no-ops
/// so an observer only implements the events it cares about.
pub trait Observer {
    fn on_before_fork(&self, _source: &Item) {}
    fn on_after_fork(&self, _source: &Item, _fork: &Item) {}
    fn on_before_merge(&self, _fork: &Item, _source: &Item) {}
    fn on_after_merge(&self, _fork: &Item, _source: &Item) {}
}

/// Ordered observer registry.
#[derive(Default)]
pub struct Hooks {
    observers: Vec<Box<dyn Observer>>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn register(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn before_fork(&self, source: &Item) {
        for observer in &self.observers {
            observer.on_before_fork(source);
        }
    }

    pub(crate) fn after_fork(&self, source: &Item, fork: &Item) {
        for observer in &self.observers {
            observer.on_after_fork(source, fork);
        }
    }

    pub(crate) fn before_merge(&self, fork: &Item, source: &Item) {
        for observer in &self.observers {
            observer.on_before_merge(fork, source);
        }
    }

    pub(crate) fn after_merge(&self, fork: &Item, source: &Item) {
        for observer in &self.observers {
            observer.on_after_merge(fork, source);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Hooks, Observer};
    use crate::model::{Item, Status};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn item(id: i64) -> Item {
        Item {
            id,
            item_type: "post".into(),
            status: Status::Publish,
            parent_id: None,
            title: String::new(),
            content: String::new(),
            excerpt: String::new(),
            slug: String::new(),
            guid: String::new(),
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Observer for Recorder {
        fn on_before_fork(&self, source: &Item) {
            self.log
                .borrow_mut()
                .push(format!("{}:before_fork:{}", self.name, source.id));
        }

        fn on_after_fork(&self, source: &Item, fork: &Item) {
            self.log
                .borrow_mut()
                .push(format!("{}:after_fork:{}:{}", self.name, source.id, fork.id));
        }
    }

    #[test]
    fn observers_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = Hooks::new();
        hooks.register(Box::new(Recorder {
            name: "first",
            log: Rc::clone(&log),
        }));
        hooks.register(Box::new(Recorder {
            name: "second",
            log: Rc::clone(&log),
        }));

        hooks.before_fork(&item(1));
        hooks.after_fork(&item(1), &item(2));

        assert_eq!(
            *log.borrow(),
            vec![
                "first:before_fork:1",
                "second:before_fork:1",
                "first:after_fork:1:2",
                "second:after_fork:1:2",
            ]
        );
    }

    #[test]
    fn unimplemented_events_are_no_ops() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = Hooks::new();
        hooks.register(Box::new(Recorder {
            name: "only-fork",
            log: Rc::clone(&log),
        }));

        hooks.before_merge(&item(2), &item(1));
        hooks.after_merge(&item(2), &item(1));
        assert!(log.borrow().is_empty());
        assert!(!hooks.is_empty());
    }
}
