//! Effect runtime: long-lived async listeners off the dispatch path.
//!
//! Effects are the only place asynchronous work happens. Each one is a
//! standing subscription to a set of event tags; on a matching dispatch
//! it runs an async operation against some external collaborator and
//! feeds the outcome back as a follow-up event through normal dispatch.
//! Effects never touch the tree directly. An idle listener blocks on its
//! channel; there is no polling.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::event::Event;
use crate::state::StateTree;
use crate::store::Store;

/// How one effect treats overlapping matching events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Start one operation per matching event; completions race, and the
    /// last follow-up to apply wins. The usual choice for reads.
    Concurrent,
    /// Process matching events strictly one at a time, in arrival order.
    Queued,
    /// Abort the prior in-flight operation when a new matching event
    /// arrives; its follow-up is abandoned, not merely ignored.
    Latest,
}

/// A standing listener bound to a set of event tags.
///
/// [`run`](Effect::run) returns at most one follow-up event, by
/// convention a success or failure variant carrying the operation's
/// outcome. A follow-up carrying the triggering tag would loop the
/// effect forever, so the runtime drops it and logs instead of
/// dispatching.
#[async_trait]
pub trait Effect<E: Event>: Send + Sync + 'static {
    /// Tags this effect listens for.
    fn tags(&self) -> &'static [&'static str];

    /// Handle one matching event.
    async fn run(&self, event: E) -> Option<E>;
}

/// Owns the listener tasks for a set of registered effects.
///
/// Must live inside a tokio runtime. Shutting down (explicitly or by
/// dropping) aborts every listener along with the in-flight operations
/// it spawned.
pub struct EffectRuntime<S: StateTree> {
    store: Store<S>,
    listeners: Vec<JoinHandle<()>>,
}

impl<S: StateTree> EffectRuntime<S> {
    pub fn new(store: Store<S>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    /// Wire `effect` into the store's event stream under `policy`.
    pub fn register<F>(&mut self, effect: F, policy: ConcurrencyPolicy)
    where
        F: Effect<S::Event>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        self.store.tap(effect.tags(), tx);
        debug!(tags = ?effect.tags(), ?policy, "effect registered");
        let effect = Arc::new(effect);
        let store = self.store.clone();
        let listener = match policy {
            ConcurrencyPolicy::Concurrent => tokio::spawn(run_concurrent(effect, store, rx)),
            ConcurrencyPolicy::Queued => tokio::spawn(run_queued(effect, store, rx)),
            ConcurrencyPolicy::Latest => tokio::spawn(run_latest(effect, store, rx)),
        };
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Abort every listener and the operations they spawned.
    pub fn shutdown(self) {}
}

impl<S: StateTree> Drop for EffectRuntime<S> {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

async fn run_queued<S, F>(effect: Arc<F>, store: Store<S>, mut rx: mpsc::UnboundedReceiver<S::Event>)
where
    S: StateTree,
    F: Effect<S::Event>,
{
    while let Some(event) = rx.recv().await {
        settle(effect.as_ref(), &store, event).await;
    }
}

async fn run_concurrent<S, F>(
    effect: Arc<F>,
    store: Store<S>,
    mut rx: mpsc::UnboundedReceiver<S::Event>,
) where
    S: StateTree,
    F: Effect<S::Event>,
{
    let mut inflight = JoinSet::new();
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    let effect = Arc::clone(&effect);
                    let store = store.clone();
                    inflight.spawn(async move {
                        settle(effect.as_ref(), &store, event).await;
                    });
                }
                None => break,
            },
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }
    // Channel closed: let remaining operations finish.
    while inflight.join_next().await.is_some() {}
}

async fn run_latest<S, F>(effect: Arc<F>, store: Store<S>, mut rx: mpsc::UnboundedReceiver<S::Event>)
where
    S: StateTree,
    F: Effect<S::Event>,
{
    let mut inflight = JoinSet::new();
    while let Some(event) = rx.recv().await {
        // Abandon the previous operation entirely, result included.
        inflight.shutdown().await;
        let effect = Arc::clone(&effect);
        let store = store.clone();
        inflight.spawn(async move {
            settle(effect.as_ref(), &store, event).await;
        });
    }
}

/// Run one effect invocation and dispatch its follow-up.
async fn settle<S, F>(effect: &F, store: &Store<S>, event: S::Event)
where
    S: StateTree,
    F: Effect<S::Event>,
{
    let trigger = event.tag();
    let Some(follow_up) = effect.run(event).await else {
        return;
    };
    if follow_up.tag() == trigger {
        warn!(tag = trigger, "effect returned its own trigger, dropped");
        return;
    }
    if let Err(err) = store.dispatch(follow_up) {
        error!(%err, "follow-up dispatch failed");
    }
}
