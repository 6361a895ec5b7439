//! Operations that bypass the normal lifecycle, for tests and warm restarts.

use super::engine::FsmCore;
use crate::core::{Event, EventKind, FsmResult, State};
use std::any::Any;

/// Debug access to a machine.
///
/// None of these operations fire entry actions, so they can put a machine
/// into any configuration, e.g. to resume after a process restart.
pub trait FsmDebug {
    /// Make `state` the current state. Raises state-changed; no entry action.
    fn set_state(&self, state: &State) -> FsmResult<()>;

    /// Make `state` the current state and start its sub-machines freshly.
    /// The entry action of `state` does not fire.
    fn resume(&self, state: &State) -> FsmResult<()>;

    /// Process `event` on the calling thread, regardless of how the machine
    /// normally dispatches.
    fn trigger_sync(&self, event: Event) -> FsmResult<bool>;

    fn trigger_sync_with<T>(&self, kind: &'static EventKind, data: T) -> FsmResult<bool>
    where
        T: Any + Send + Sync,
        Self: Sized,
    {
        self.trigger_sync(Event::with_payload(kind, data))
    }
}

/// The [`FsmDebug`] implementation handed out by both machine kinds.
pub struct DebugInterface<'a> {
    core: &'a FsmCore,
}

impl<'a> DebugInterface<'a> {
    pub(crate) fn new(core: &'a FsmCore) -> Self {
        Self { core }
    }
}

impl FsmDebug for DebugInterface<'_> {
    fn set_state(&self, state: &State) -> FsmResult<()> {
        self.core.set_state(state)
    }

    fn resume(&self, state: &State) -> FsmResult<()> {
        self.core.resume(state)
    }

    fn trigger_sync(&self, event: Event) -> FsmResult<bool> {
        self.core.trigger(&event)
    }
}
