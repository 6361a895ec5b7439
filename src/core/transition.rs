//! Guarded, event-typed transitions.

use super::error::FsmResult;
use super::event::{Event, EventKind, NO_EVENT};
use super::guard::Guard;
use super::history::TransitionEndPoint;
use super::state::State;
use std::any::Any;

/// A transition to an endpoint, fired by events of a kind (or a derived
/// kind) when its guard passes.
#[derive(Clone, Debug)]
pub struct Transition {
    kind: &'static EventKind,
    guard: Guard,
    endpoint: TransitionEndPoint,
}

impl Transition {
    /// An unguarded transition.
    pub fn new(kind: &'static EventKind, endpoint: impl Into<TransitionEndPoint>) -> Self {
        Self {
            kind,
            guard: Guard::always(),
            endpoint: endpoint.into(),
        }
    }

    /// An unguarded transition to the final state.
    pub fn to_final(kind: &'static EventKind) -> Self {
        Self::new(kind, State::final_state())
    }

    /// A transition fired automatically once all sub-machines have finished.
    pub fn on_completion(endpoint: impl Into<TransitionEndPoint>) -> Self {
        Self::new(&NO_EVENT, endpoint)
    }

    /// Replace the guard.
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    /// Guard with a closure ignoring the event.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Guard with a closure over the event payload; events without a
    /// payload of type `T` never pass.
    pub fn when_payload<T, F>(self, predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::with_payload(predicate))
    }

    pub fn kind(&self) -> &'static EventKind {
        self.kind
    }

    pub fn endpoint(&self) -> &TransitionEndPoint {
        &self.endpoint
    }

    pub fn payload_type(&self) -> Option<&'static str> {
        self.guard.payload_type()
    }

    pub fn is_to_final(&self) -> bool {
        self.endpoint.is_to_final()
    }

    /// True if this transition is the automatic completion edge of a composite.
    pub fn is_no_event(&self) -> bool {
        *self.kind == NO_EVENT
    }

    /// Check if this transition fires for `event`: the event kind must match
    /// and the guard must pass.
    pub fn is_allowed(&self, event: &Event) -> FsmResult<bool> {
        if !event.kind().is_a(self.kind) {
            return Ok(false);
        }
        self.guard.check(event)
    }
}
