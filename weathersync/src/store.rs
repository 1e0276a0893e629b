//! Effect store with middleware

use std::marker::PhantomData;

use crate::action::{Action, ActionCategory, ActionSummary};
use crate::effect::DispatchResult;

/// A reducer that handles actions, mutates state and declares effects.
pub type EffectReducer<S, A, E> = fn(&mut S, A) -> DispatchResult<E>;

/// Middleware trait for intercepting actions
///
/// Called around every dispatch. Sees the action and whether state changed,
/// never the effects.
pub trait Middleware<A: Action> {
    /// Called before the action is dispatched to the reducer
    fn before(&mut self, action: &A);

    /// Called after the action is processed by the reducer
    fn after(&mut self, action: &A, state_changed: bool);
}

/// Middleware that logs every action: the summary at trace level before
/// dispatch, the outcome at debug level after.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl<A: ActionCategory + ActionSummary> Middleware<A> for LoggingMiddleware {
    fn before(&mut self, action: &A) {
        tracing::trace!(
            action = %action.name(),
            category = action.category().unwrap_or("-"),
            summary = %action.summary(),
            "Dispatching action"
        );
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        tracing::debug!(
            action = %action.name(),
            category = action.category().unwrap_or("-"),
            state_changed = state_changed,
            "Action processed"
        );
    }
}

/// Centralized state with a single mutation point.
///
/// All changes go through [`dispatch`](Self::dispatch), which runs the
/// middleware hooks around the reducer and returns its effects.
pub struct EffectStore<S, A, E, M>
where
    A: Action,
    M: Middleware<A>,
{
    state: S,
    reducer: EffectReducer<S, A, E>,
    middleware: M,
    _marker: PhantomData<(A, E)>,
}

impl<S, A, E, M> EffectStore<S, A, E, M>
where
    A: Action,
    M: Middleware<A>,
{
    pub fn with_middleware(state: S, reducer: EffectReducer<S, A, E>, middleware: M) -> Self {
        Self {
            state,
            reducer,
            middleware,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access outside the reducer.
    ///
    /// Use sparingly; meant for initialization and test setup.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    #[inline]
    pub fn middleware(&self) -> &M {
        &self.middleware
    }

    /// Calls `middleware.before()`, then the reducer, then
    /// `middleware.after()` with the state change indicator.
    pub fn dispatch(&mut self, action: A) -> DispatchResult<E> {
        self.middleware.before(&action);
        let result = (self.reducer)(&mut self.state, action.clone());
        self.middleware.after(&action, result.changed);
        result
    }
}
