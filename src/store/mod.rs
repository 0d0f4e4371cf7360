//! The store: dispatch entry point, tree snapshots, subscriptions.

mod error;
mod subscription;

pub use error::StoreError;
pub use subscription::Subscription;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::event::Event;
use crate::select::Selector;
use crate::state::StateTree;
use subscription::SubscriberEntry;

/// The state container.
///
/// Cheap to clone: every clone shares the same tree, subscriptions, and
/// effect wiring. There is no ambient global instance: create one per
/// application (or per test) and pass handles to whatever needs to
/// dispatch or subscribe. The store is disposed by dropping the last
/// handle.
pub struct Store<S: StateTree> {
    inner: Arc<StoreInner<S>>,
}

impl<S: StateTree> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<S: StateTree> {
    /// Current tree; swapped wholesale while the gate is held.
    state: RwLock<S>,
    /// Serializes dispatches: only one may be in flight at a time.
    gate: Mutex<()>,
    /// Thread currently applying a dispatch, with the event's tag.
    applying: Mutex<Option<(ThreadId, &'static str)>>,
    subscribers: Mutex<Vec<SubscriberEntry<S>>>,
    taps: Mutex<Vec<EventTap<S::Event>>>,
}

/// Tag-filtered forwarding channel into an effect listener.
struct EventTap<E> {
    tags: &'static [&'static str],
    tx: mpsc::UnboundedSender<E>,
}

impl<S: StateTree> Store<S> {
    /// Create a store holding `initial` as the current tree.
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial),
                gate: Mutex::new(()),
                applying: Mutex::new(None),
                subscribers: Mutex::new(Vec::new()),
                taps: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Snapshot of the current tree.
    ///
    /// Cheap: the tree is a struct of `Arc` slices. Readers always see
    /// either the pre- or post-dispatch tree, never a partial one.
    pub fn state(&self) -> S {
        self.inner.state.read().clone()
    }

    /// Apply `event` to the tree and notify subscribers, synchronously.
    ///
    /// Sequence: reduce, swap the tree, notify subscriptions whose
    /// projection changed, forward the event to matching effect
    /// listeners. Dispatches from other threads block on an internal
    /// gate until this one finishes; dispatching again from the same
    /// thread (from a reducer or a subscription callback) fails with
    /// [`StoreError::ReentrantDispatch`].
    pub fn dispatch(&self, event: S::Event) -> Result<(), StoreError> {
        let tag = event.tag();
        if let Some((applier, active)) = *self.inner.applying.lock() {
            if applier == thread::current().id() {
                return Err(StoreError::ReentrantDispatch { tag, active });
            }
        }

        let _gate = self.inner.gate.lock();
        *self.inner.applying.lock() = Some((thread::current().id(), tag));
        let inner = Arc::clone(&self.inner);
        // Cleared via guard so a panicking callback cannot wedge the store.
        let _clear = scopeguard::guard((), move |_| {
            *inner.applying.lock() = None;
        });

        let next = self.inner.state.read().reduce(&event);
        *self.inner.state.write() = next.clone();
        trace!(tag, "event applied");

        self.notify(&next);
        self.forward(event);
        Ok(())
    }

    /// Register `callback` for `selector`'s projection.
    ///
    /// The current projection is delivered immediately (replay-latest);
    /// afterwards the callback fires only when the projection `Arc`
    /// changes by pointer identity, so churn elsewhere in the tree stays
    /// silent.
    pub fn subscribe<Sel, F>(&self, mut selector: Sel, mut callback: F) -> Subscription
    where
        Sel: Selector<State = S>,
        F: FnMut(&Sel::Output) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let mut last: Option<Arc<Sel::Output>> = None;
        let mut notify = move |state: &S| {
            if !flag.load(Ordering::SeqCst) {
                return;
            }
            let projection = selector.select(state);
            let changed = match &last {
                Some(previous) => !Arc::ptr_eq(previous, &projection),
                None => true,
            };
            if changed {
                callback(&projection);
                last = Some(projection);
            }
        };
        notify(&self.state());
        self.inner.subscribers.lock().push(SubscriberEntry {
            active: Arc::clone(&active),
            notify: Box::new(notify),
        });
        Subscription::new(active)
    }

    /// Number of live subscriptions. Diagnostics only.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .iter()
            .filter(|entry| entry.active.load(Ordering::SeqCst))
            .count()
    }

    /// Wire a forwarding channel for the given tags. Used by the effect
    /// runtime; taps whose receiver is gone are pruned on dispatch.
    pub(crate) fn tap(&self, tags: &'static [&'static str], tx: mpsc::UnboundedSender<S::Event>) {
        self.inner.taps.lock().push(EventTap { tags, tx });
    }

    fn notify(&self, state: &S) {
        // Entries are moved out for the duration of the callbacks so a
        // callback can subscribe without deadlocking; anything added
        // mid-notification is folded back in afterwards.
        let mut entries = std::mem::take(&mut *self.inner.subscribers.lock());
        entries.retain(|entry| entry.active.load(Ordering::SeqCst));
        for entry in entries.iter_mut() {
            (entry.notify)(state);
        }
        let mut subscribers = self.inner.subscribers.lock();
        let added = std::mem::replace(&mut *subscribers, entries);
        subscribers.extend(added);
    }

    fn forward(&self, event: S::Event) {
        let tag = event.tag();
        let mut taps = self.inner.taps.lock();
        taps.retain(|tap| {
            if !tap.tags.contains(&tag) {
                return !tap.tx.is_closed();
            }
            match tap.tx.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    warn!(tag, "effect listener gone, dropping tap");
                    false
                }
            }
        });
    }
}
