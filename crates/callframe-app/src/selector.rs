//! Memoized projections of the adapter state.
//!
//! A [`Selector`] splits a projection into two steps: extracting its input
//! slice from the snapshot, and computing the view model from that slice.
//! [`Memoized`] caches the last `(input, output)` pair and hands back the
//! same `Rc` whenever the slice compares equal, so consumers can use pointer
//! identity of the output as their change signal.
//!
//! Composite selectors take [`Shared`] child outputs as their input. `Shared`
//! compares by pointer, so a composite recomputes only when one of its
//! children produced a new output.

use std::{
    cell::{Cell, RefCell},
    fmt,
    ops::Deref,
    rc::Rc,
};

use callframe_core::AdapterState;

/// Pure projection of [`AdapterState`] into a view model.
///
/// # Invariants
///
/// - `compute` depends only on its input. Everything it reads must be part
///   of the slice `input` extracts.
/// - Neither method has side effects.
pub trait Selector {
    /// Slice of the snapshot the output depends on.
    type Input: PartialEq;
    /// View model.
    type Output;

    /// Extract the input slice.
    fn input(&self, state: &AdapterState) -> Self::Input;

    /// Compute the view model from the slice.
    fn compute(&self, input: &Self::Input) -> Self::Output;
}

/// Size-one cache around a [`Selector`].
pub struct Memoized<S: Selector> {
    selector: S,
    cache: RefCell<Option<(S::Input, Rc<S::Output>)>>,
    computations: Cell<usize>,
}

impl<S: Selector> fmt::Debug for Memoized<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("selector", &std::any::type_name::<S>())
            .field("cached", &self.cache.borrow().is_some())
            .field("computations", &self.computations.get())
            .finish()
    }
}

impl<S: Selector> Memoized<S> {
    /// Wrap a selector with an empty cache.
    pub fn new(selector: S) -> Self {
        Self { selector, cache: RefCell::new(None), computations: Cell::new(0) }
    }

    /// Project the snapshot, reusing the cached output if the input slice is
    /// unchanged.
    pub fn select(&self, state: &AdapterState) -> Rc<S::Output> {
        let input = self.selector.input(state);
        if let Some((cached, output)) = &*self.cache.borrow()
            && *cached == input
        {
            return Rc::clone(output);
        }

        let output = Rc::new(self.selector.compute(&input));
        self.computations.set(self.computations.get() + 1);
        *self.cache.borrow_mut() = Some((input, Rc::clone(&output)));
        output
    }

    /// How many times the output was computed.
    pub fn computations(&self) -> usize {
        self.computations.get()
    }
}

/// Child selector output compared by identity.
#[derive(Debug)]
pub struct Shared<T>(pub Rc<T>);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NameLength;

    impl Selector for NameLength {
        type Input = Option<String>;
        type Output = usize;

        fn input(&self, state: &AdapterState) -> Option<String> {
            state.display_name.clone()
        }

        fn compute(&self, input: &Option<String>) -> usize {
            input.as_deref().map_or(0, str::len)
        }
    }

    #[test]
    fn unchanged_slice_returns_same_output() {
        let selector = Memoized::new(NameLength);
        let state = AdapterState::new("8:acs:me", Some("Ada".into()));
        let first = selector.select(&state);

        let other = AdapterState { user_id: "8:acs:other".into(), ..state.clone() };
        let second = selector.select(&other);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(selector.computations(), 1);
    }

    #[test]
    fn changed_slice_recomputes() {
        let selector = Memoized::new(NameLength);
        let first = selector.select(&AdapterState::new("8:acs:me", Some("Ada".into())));
        let second = selector.select(&AdapterState::new("8:acs:me", Some("Grace".into())));

        assert_eq!((*first, *second), (3, 5));
        assert_eq!(selector.computations(), 2);
    }

    #[test]
    fn shared_compares_by_pointer() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        assert_eq!(Shared(Rc::clone(&a)), Shared(Rc::clone(&a)));
        assert_ne!(Shared(a), Shared(b));
    }
}
