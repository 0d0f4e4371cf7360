//! State tree and reducer traits.

use std::sync::Arc;

use crate::event::Event;

/// The application's root state: a struct whose fields are slices.
///
/// Each slice is an `Arc`-wrapped value owned by exactly one reducer;
/// one field, one reducer, so no two reducers can write the same slice.
/// `reduce` delegates every field to its slice reducer and returns a new
/// tree. An untouched slice keeps its `Arc` (pointer-equal to the old
/// tree's), which is what selectors and subscriptions compare against.
///
/// Reducers must not read sibling slices; the delegation order across
/// fields carries no meaning.
pub trait StateTree: Clone + Send + Sync + 'static {
    /// The application's event type.
    type Event: Event;

    /// Fold one event into a new tree.
    ///
    /// Pure: no I/O, no dispatch, no suspension.
    fn reduce(&self, event: &Self::Event) -> Self;
}

/// Reducer transforms one slice based on events.
///
/// The reducer is the sole authority over its slice. It must be a pure
/// function: (slice, event) -> slice. An event the reducer does not
/// recognize is an identity pass-through: return the input `Arc` cloned
/// so the slice stays pointer-equal and downstream memoization holds.
///
/// A reducer never fails. An event it cannot apply is a programming
/// defect upstream; the defensive response is to return the input slice
/// unchanged, not to panic.
pub trait Reducer {
    /// The slice type this reducer owns.
    type Slice: Clone + Send + Sync + 'static;

    /// The event type this reducer handles.
    type Event: Event;

    /// Process an event and return the new slice.
    fn reduce(slice: &Arc<Self::Slice>, event: &Self::Event) -> Arc<Self::Slice>;
}
