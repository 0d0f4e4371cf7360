//! Memoized projections of the state tree.
//!
//! Selectors compare their inputs by `Arc` pointer identity, never by
//! value. That only works because reducers replace slices wholesale; a
//! slice mutated in place would leave the pointer unchanged and the
//! cached projection stale.
//!
//! Memoization is single-slot (cache depth 1): a selector fed two
//! distinct states on alternating calls never hits the cache. The
//! intended shape is one subscriber path per selector instance, where
//! consecutive calls usually see the same inputs.

use std::sync::Arc;

/// A pure, memoized projection of the state tree.
pub trait Selector: Send + 'static {
    /// State tree type this selector reads.
    type State;

    /// Projection type this selector produces.
    type Output: Send + Sync + 'static;

    /// Evaluate against `state`, reusing the cached projection when the
    /// declared inputs are unchanged by pointer identity.
    fn select(&mut self, state: &Self::State) -> Arc<Self::Output>;
}

/// Selector reading a single slice.
///
/// The projection is the slice itself, so no memo cell is needed: the
/// slice's `Arc` is returned directly and stays pointer-equal until a
/// reducer replaces it.
pub struct SliceSelector<S, T> {
    read: fn(&S) -> &Arc<T>,
}

impl<S, T> Clone for SliceSelector<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> Copy for SliceSelector<S, T> {}

impl<S: 'static, T: Send + Sync + 'static> Selector for SliceSelector<S, T> {
    type State = S;
    type Output = T;

    fn select(&mut self, state: &S) -> Arc<T> {
        (self.read)(state).clone()
    }
}

/// Selector over one slice of the tree.
///
/// ```ignore
/// let users = slice(|state: &AppState| &state.users);
/// ```
pub fn slice<S, T>(read: fn(&S) -> &Arc<T>) -> SliceSelector<S, T> {
    SliceSelector { read }
}

/// A tuple of input selectors feeding a [`DerivedSelector`].
///
/// Implemented for selector tuples of arity 1 to 3, all reading the
/// same state type.
pub trait SelectorInputs: Send + 'static {
    /// State tree type every input reads.
    type State;

    /// The inputs' resolved projections, as a tuple of `Arc`s.
    type Values: Send + Sync + 'static;

    /// Evaluate every input against `state`.
    fn resolve(&mut self, state: &Self::State) -> Self::Values;

    /// Whether every resolved value is pointer-equal to the previous one.
    fn unchanged(previous: &Self::Values, next: &Self::Values) -> bool;
}

/// Projection function over a tuple of resolved inputs.
///
/// Blanket-implemented for closures taking one `&Output` per input.
pub trait Projection<I: SelectorInputs>: Send + 'static {
    /// The projection's output type.
    type Output: Send + Sync + 'static;

    /// Compute the projection from the resolved inputs.
    fn apply(&mut self, values: &I::Values) -> Self::Output;
}

macro_rules! impl_selector_tuple {
    ($(($($name:ident / $field:tt),+))+) => {$(
        impl<First: Selector, $($name: Selector<State = First::State>),+> SelectorInputs
            for (First, $($name,)+)
        {
            type State = First::State;
            type Values = (Arc<First::Output>, $(Arc<$name::Output>,)+);

            fn resolve(&mut self, state: &Self::State) -> Self::Values {
                (self.0.select(state), $(self.$field.select(state),)+)
            }

            fn unchanged(previous: &Self::Values, next: &Self::Values) -> bool {
                Arc::ptr_eq(&previous.0, &next.0)
                    $(&& Arc::ptr_eq(&previous.$field, &next.$field))+
            }
        }

        impl<First, $($name,)+ F, P> Projection<(First, $($name,)+)> for F
        where
            First: Selector,
            $($name: Selector<State = First::State>,)+
            F: FnMut(&First::Output, $(&$name::Output),+) -> P + Send + 'static,
            P: Send + Sync + 'static,
        {
            type Output = P;

            fn apply(
                &mut self,
                values: &(Arc<First::Output>, $(Arc<$name::Output>,)+),
            ) -> P {
                (self)(&values.0, $(&values.$field),+)
            }
        }
    )+};
}

impl_selector_tuple! {
    (B / 1)
    (B / 1, C / 2)
}

impl<First: Selector> SelectorInputs for (First,) {
    type State = First::State;
    type Values = (Arc<First::Output>,);

    fn resolve(&mut self, state: &Self::State) -> Self::Values {
        (self.0.select(state),)
    }

    fn unchanged(previous: &Self::Values, next: &Self::Values) -> bool {
        Arc::ptr_eq(&previous.0, &next.0)
    }
}

impl<First, F, P> Projection<(First,)> for F
where
    First: Selector,
    F: FnMut(&First::Output) -> P + Send + 'static,
    P: Send + Sync + 'static,
{
    type Output = P;

    fn apply(&mut self, values: &(Arc<First::Output>,)) -> P {
        (self)(&values.0)
    }
}

/// Selector built from input selectors plus a pure projection.
///
/// Holds one memo cell: the previous resolved inputs and the projection
/// computed from them. `select` recomputes inputs first (recursively
/// memoized), and only invokes the projection when at least one input
/// `Arc` changed.
pub struct DerivedSelector<I: SelectorInputs, F: Projection<I>> {
    inputs: I,
    project: F,
    memo: Option<(I::Values, Arc<F::Output>)>,
}

/// Derive a memoized selector from input selectors.
///
/// Inputs are a tuple of selectors (arity 1 to 3); the projection takes
/// one reference per input. Closure parameter types usually need
/// annotating for inference:
///
/// ```ignore
/// let names = derive(
///     (slice(|s: &AppState| &s.users),),
///     |users: &UsersSlice| users.collection.iter().map(|u| u.name.clone()).collect::<Vec<_>>(),
/// );
/// ```
pub fn derive<I, F>(inputs: I, project: F) -> DerivedSelector<I, F>
where
    I: SelectorInputs,
    F: Projection<I>,
{
    DerivedSelector {
        inputs,
        project,
        memo: None,
    }
}

impl<I, F> Selector for DerivedSelector<I, F>
where
    I: SelectorInputs,
    I::State: 'static,
    F: Projection<I>,
{
    type State = I::State;
    type Output = F::Output;

    fn select(&mut self, state: &Self::State) -> Arc<F::Output> {
        let values = self.inputs.resolve(state);
        if let Some((previous, cached)) = &self.memo {
            if I::unchanged(previous, &values) {
                return cached.clone();
            }
        }
        let result = Arc::new(self.project.apply(&values));
        self.memo = Some((values, result.clone()));
        result
    }
}
