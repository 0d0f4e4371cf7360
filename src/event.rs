//! Base trait for events flowing through the store.

/// An immutable, tagged record describing something that happened.
///
/// Events represent:
/// - User gestures translated by the rendering layer
/// - Effect outcomes (a load that succeeded or failed)
/// - Timers and other external stimuli
///
/// Application events are closed enums, one per feature, so reducers get
/// exhaustive matching instead of runtime shape inspection. The tag
/// identifies the variant for effect matching and logging; a tag and its
/// payload shape are fixed for the lifetime of the system.
pub trait Event: Clone + Send + Sync + 'static {
    /// Stable identifier for this event, e.g. `"users/load"`.
    fn tag(&self) -> &'static str;
}
