//! Error types for store dispatch.

use thiserror::Error;

/// Errors that can occur during dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// `dispatch` was called from inside a reducer or a subscription
    /// callback of a dispatch already running on the same thread.
    ///
    /// This is fatal for the offending call and is never retried; the
    /// in-progress dispatch itself completes normally.
    #[error("re-entrant dispatch of '{tag}' while '{active}' is still being applied")]
    ReentrantDispatch {
        /// Tag of the rejected event.
        tag: &'static str,
        /// Tag of the event currently being applied.
        active: &'static str,
    },
}
