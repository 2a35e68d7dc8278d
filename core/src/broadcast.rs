//! Multi-subscriber outcome notifications.
//!
//! Subscribers are invoked synchronously, in registration order, on whichever
//! thread emits. `emit` works on a snapshot of the subscriber list, so a
//! subscriber may subscribe further callbacks without deadlocking; those only
//! see later emissions.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use crate::http::ResponseData;
use crate::status::StatusKind;

type Subscriber = Arc<dyn Fn(StatusKind, Option<&ResponseData>) + Send + Sync>;

/// An ordered list of outcome subscribers.
#[derive(Default)]
pub struct Broadcast {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(StatusKind, Option<&ResponseData>) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Invoke every subscriber. A panicking subscriber is logged and skipped.
    pub fn emit(&self, status: StatusKind, response: Option<&ResponseData>) {
        let snapshot = self.subscribers.read().clone();
        for (index, subscriber) in snapshot.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| subscriber(status, response))).is_err() {
                error!(subscriber = index, %status, "outcome subscriber panicked");
            }
        }
    }
}

impl fmt::Debug for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcast")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
