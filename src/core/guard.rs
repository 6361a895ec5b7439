//! Guard predicates for controlling transitions.
//!
//! Guards decide whether a transition may fire for a given event. A plain
//! guard ignores the event; a payload-typed guard only passes when the event
//! carries a payload of the declared type and the predicate accepts it.

use super::error::{CallbackError, FsmError, FsmResult};
use super::event::{Event, Payload};
use std::any::{Any, TypeId};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

const GUARD_FAILED: &str = "Error calling the guard";

#[derive(Clone)]
enum Predicate {
    Always,
    Plain(Arc<dyn Fn() -> bool + Send + Sync>),
    Typed {
        type_id: TypeId,
        type_name: &'static str,
        check: Arc<dyn Fn(&Payload) -> bool + Send + Sync>,
    },
}

/// Predicate that determines if a transition can execute.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{Event, EventKind, Guard};
///
/// static TICK: EventKind = EventKind::new("Tick");
///
/// let is_day = Guard::with_payload(|day: &bool| *day);
///
/// assert!(is_day.check(&Event::with_payload(&TICK, true)).unwrap());
/// assert!(!is_day.check(&Event::with_payload(&TICK, false)).unwrap());
/// // wrong payload type or no payload: never allowed
/// assert!(!is_day.check(&Event::with_payload(&TICK, 1_u8)).unwrap());
/// assert!(!is_day.check(&Event::new(&TICK)).unwrap());
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Predicate,
}

impl Guard {
    /// A guard that always passes.
    pub fn always() -> Self {
        Self {
            predicate: Predicate::Always,
        }
    }

    /// A guard ignoring the event.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Predicate::Plain(Arc::new(predicate)),
        }
    }

    /// A guard over the event's payload of type `T`.
    pub fn with_payload<T, F>(predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let check = move |payload: &Payload| payload.downcast_ref::<T>().is_some_and(&predicate);
        Self {
            predicate: Predicate::Typed {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                check: Arc::new(check),
            },
        }
    }

    /// The payload type this guard requires, if any.
    pub fn payload_type(&self) -> Option<&'static str> {
        match &self.predicate {
            Predicate::Typed { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Evaluate the guard for `event`.
    ///
    /// A panicking predicate is reported as [`FsmError::Action`].
    pub fn check(&self, event: &Event) -> FsmResult<bool> {
        match &self.predicate {
            Predicate::Always => Ok(true),
            Predicate::Plain(predicate) => guarded(|| predicate()),
            Predicate::Typed { type_id, check, .. } => match event.payload() {
                Some(payload) if payload.value_type_id() == *type_id => {
                    guarded(|| check(payload))
                }
                _ => Ok(false),
            },
        }
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            Predicate::Always => f.write_str("Guard(always)"),
            Predicate::Plain(_) => f.write_str("Guard"),
            Predicate::Typed { type_name, .. } => write!(f, "Guard<{type_name}>"),
        }
    }
}

fn guarded(f: impl FnOnce() -> bool) -> FsmResult<bool> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|panic| FsmError::Action {
        message: GUARD_FAILED,
        state: String::new(),
        cause: CallbackError::from_panic(panic),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventKind;
    use std::sync::atomic::{AtomicBool, Ordering};

    static TICK: EventKind = EventKind::new("Tick");

    #[derive(Debug, PartialEq)]
    struct Reading {
        celsius: i32,
    }

    #[test]
    fn always_guard_passes_any_event() {
        let guard = Guard::always();
        assert!(guard.check(&Event::new(&TICK)).unwrap());
        assert!(guard.check(&Event::with_payload(&TICK, 1)).unwrap());
        assert_eq!(guard.payload_type(), None);
    }

    #[test]
    fn plain_guard_reads_external_condition() {
        let open = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&open);
        let guard = Guard::new(move || flag.load(Ordering::SeqCst));

        assert!(!guard.check(&Event::new(&TICK)).unwrap());
        open.store(true, Ordering::SeqCst);
        assert!(guard.check(&Event::new(&TICK)).unwrap());
    }

    #[test]
    fn typed_guard_checks_payload() {
        let guard = Guard::with_payload(|r: &Reading| r.celsius > 30);

        let hot = Event::with_payload(&TICK, Reading { celsius: 35 });
        let cold = Event::with_payload(&TICK, Reading { celsius: 10 });

        assert!(guard.check(&hot).unwrap());
        assert!(!guard.check(&cold).unwrap());
    }

    #[test]
    fn typed_guard_rejects_missing_or_foreign_payload() {
        let guard = Guard::with_payload(|_: &Reading| true);

        assert!(!guard.check(&Event::new(&TICK)).unwrap());
        assert!(!guard.check(&Event::with_payload(&TICK, 35_i32)).unwrap());
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::with_payload(|n: &u32| n % 2 == 0);
        let event = Event::with_payload(&TICK, 4_u32);

        assert_eq!(guard.check(&event).unwrap(), guard.check(&event).unwrap());
    }

    #[test]
    fn panicking_guard_is_reported() {
        let guard = Guard::new(|| panic!("guard exploded"));

        let err = guard.check(&Event::new(&TICK)).unwrap_err();

        assert!(matches!(
            err,
            FsmError::Action {
                message: GUARD_FAILED,
                ..
            }
        ));
    }
}
