//! Unidirectional reactive state container with isolated effect
//! orchestration.
//!
//! # Architecture
//!
//! ```text
//! Event ──→ Store ──→ Reducer ──→ State Tree ──→ Selector ──→ Subscriber
//!   ↑                                  │
//!   └───────── Effect (async) ←────────┘
//! ```
//!
//! - **Event**: immutable tagged record describing a fact
//! - **Reducer**: pure function folding events into new slice values
//! - **Store**: dispatch entry point, tree snapshots, change subscriptions
//! - **Selector**: memoized projection, recomputed only when its inputs change
//! - **Effect**: async listener that dispatches follow-up events
//!
//! State mutation is logically single-threaded: `dispatch` is synchronous,
//! serialized, and never suspends. Asynchronous work lives exclusively in
//! effects, which feed their results back through `dispatch` as success or
//! failure events.
//!
//! Slices are `Arc`-wrapped values replaced wholesale on every change.
//! That replacement is a load-bearing contract: selector memoization and
//! subscription change detection both compare `Arc` pointer identity, so a
//! slice mutated in place would silently go stale downstream.

pub mod effects;
pub mod entity;
pub mod event;
pub mod gateway;
pub mod select;
pub mod state;
pub mod store;

pub use effects::{ConcurrencyPolicy, Effect, EffectRuntime};
pub use entity::{Entity, EntityCollection, Order};
pub use event::Event;
pub use gateway::{GatewayError, ResourceGateway};
pub use select::{derive, slice, DerivedSelector, Selector, SliceSelector};
pub use state::{Reducer, StateTree};
pub use store::{Store, StoreError, Subscription};
