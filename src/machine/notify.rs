//! Listener registry for state-changed and triggered notifications.

use crate::core::{CallbackError, Event, FsmError, FsmResult, State};
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// A machine moved from one state to another.
///
/// Raised after the exit action of the old state and before the entry
/// action of the new one.
#[derive(Clone, Debug)]
pub struct StateChanged {
    pub machine: String,
    pub old_state: State,
    pub new_state: State,
    pub at: DateTime<Utc>,
}

/// A machine processed an event, whether or not a transition fired.
#[derive(Clone, Debug)]
pub struct Triggered {
    pub machine: String,
    /// The state the event was offered to.
    pub state: State,
    pub event: Event,
    pub handled: bool,
    pub at: DateTime<Utc>,
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct Listeners {
    state_changed: Mutex<Vec<Listener<StateChanged>>>,
    triggered: Mutex<Vec<Listener<Triggered>>>,
}

impl Listeners {
    pub(crate) fn new() -> Self {
        Self {
            state_changed: Mutex::new(Vec::new()),
            triggered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add_state_changed(&self, listener: Listener<StateChanged>) {
        lock(&self.state_changed).push(listener);
    }

    pub(crate) fn add_triggered(&self, listener: Listener<Triggered>) {
        lock(&self.triggered).push(listener);
    }

    pub(crate) fn state_changed(&self, info: &StateChanged) -> FsmResult<()> {
        // snapshot so a listener may register further listeners
        let listeners = lock(&self.state_changed).clone();
        notify(&listeners, info, "on_state_changed", &info.machine)
    }

    pub(crate) fn triggered(&self, info: &Triggered) -> FsmResult<()> {
        let listeners = lock(&self.triggered).clone();
        notify(&listeners, info, "on_triggered", &info.machine)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn notify<T>(
    listeners: &[Listener<T>],
    info: &T,
    observer: &'static str,
    machine: &str,
) -> FsmResult<()> {
    for listener in listeners {
        catch_unwind(AssertUnwindSafe(|| listener(info))).map_err(|panic| FsmError::Observer {
            observer,
            machine: machine.to_string(),
            cause: CallbackError::from_panic(panic),
        })?;
    }
    Ok(())
}
