//! Entry, exit and do-in-state actions.

use super::error::{CallbackError, FsmError, FsmResult};
use super::event::Event;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

const ACTION_FAILED: &str = "Error calling the action";

type Callback = Arc<dyn Fn(&Event) -> Result<(), CallbackError> + Send + Sync>;

/// An action fired on state entry, exit, or on demand while in a state.
///
/// The default action does nothing. Payload-typed actions receive the
/// triggering event's payload when it has the declared type, and `None`
/// otherwise.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{Action, Event, EventKind};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// static TICK: EventKind = EventKind::new("Tick");
///
/// let seen = Arc::new(AtomicU32::new(0));
/// let sink = Arc::clone(&seen);
/// let action = Action::with_payload(move |value: Option<&u32>| {
///     sink.store(value.copied().unwrap_or_default(), Ordering::SeqCst);
/// });
///
/// action.fire(&Event::with_payload(&TICK, 7_u32)).unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 7);
///
/// action.fire(&Event::new(&TICK)).unwrap();
/// assert_eq!(seen.load(Ordering::SeqCst), 0);
/// ```
#[derive(Clone, Default)]
pub struct Action {
    callback: Option<Callback>,
}

impl Action {
    /// The no-op action.
    pub fn none() -> Self {
        Self { callback: None }
    }

    /// An action ignoring the event.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::from_callback(move |_| {
            f();
            Ok(())
        })
    }

    /// An action receiving the event's payload as `T`, if it has that type.
    pub fn with_payload<T, F>(f: F) -> Self
    where
        T: Any,
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        Self::from_callback(move |event| {
            f(event.payload_as::<T>());
            Ok(())
        })
    }

    /// An action that may fail; the error is wrapped into [`FsmError::Action`].
    pub fn try_new<F, E>(f: F) -> Self
    where
        F: Fn(&Event) -> Result<(), E> + Send + Sync + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self::from_callback(move |event| {
            f(event).map_err(|e| CallbackError::Failed(Box::new(e)))
        })
    }

    fn from_callback<F>(f: F) -> Self
    where
        F: Fn(&Event) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(f)),
        }
    }

    pub fn is_none(&self) -> bool {
        self.callback.is_none()
    }

    /// Fire the action for `event`.
    ///
    /// Panics escaping the callback are caught and reported as
    /// [`FsmError::Action`] with an empty state name.
    pub fn fire(&self, event: &Event) -> FsmResult<()> {
        let Some(callback) = &self.callback else {
            return Ok(());
        };

        let cause = match catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(cause)) => cause,
            Err(panic) => CallbackError::from_panic(panic),
        };

        error!(event = %event, error = %cause, "action failed");
        Err(FsmError::Action {
            message: ACTION_FAILED,
            state: String::new(),
            cause,
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_none() { "Action(none)" } else { "Action" })
    }
}
