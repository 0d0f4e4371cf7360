//! Subscription bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle returned by [`Store::subscribe`](super::Store::subscribe).
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to stop deliveries. The store
/// prunes deactivated entries on the next dispatch.
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new(active: Arc<AtomicBool>) -> Self {
        Self { active }
    }

    /// Stop delivering projections to this subscription's callback.
    pub fn unsubscribe(self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Whether the subscription still delivers.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// One registered callback plus its activity flag.
///
/// The closure owns the selector and the last delivered projection, so
/// change suppression lives entirely inside it.
pub(crate) struct SubscriberEntry<S> {
    pub(crate) active: Arc<AtomicBool>,
    pub(crate) notify: Box<dyn FnMut(&S) + Send>,
}
