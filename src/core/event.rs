//! Events, event kinds and typed payloads.
//!
//! An event is identified by its [`EventKind`]. Kinds form a tree: a kind may
//! be derived from a parent kind, and a transition registered for a kind also
//! accepts every kind derived from it. Kinds are declared as statics, usually
//! through the [`event_kinds!`](crate::event_kinds) macro.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Static descriptor of an event kind.
///
/// Kinds are compared by name; names are expected to be unique within a
/// program. Declare them as `static` items so they can be referenced as
/// `&'static EventKind`.
///
/// # Example
///
/// ```rust
/// use hfsm::core::EventKind;
///
/// static INPUT: EventKind = EventKind::new("Input");
/// static KEY_PRESS: EventKind = EventKind::derived("KeyPress", &INPUT);
///
/// assert!(KEY_PRESS.is_a(&INPUT));
/// assert!(!INPUT.is_a(&KEY_PRESS));
/// ```
#[derive(Debug)]
pub struct EventKind {
    name: &'static str,
    parent: Option<&'static EventKind>,
}

impl EventKind {
    /// Create a root kind.
    pub const fn new(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Create a kind derived from `parent`.
    pub const fn derived(name: &'static str, parent: &'static EventKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static EventKind> {
        self.parent
    }

    /// True if this kind equals `other` or is derived from it.
    pub fn is_a(&self, other: &EventKind) -> bool {
        if self == other {
            return true;
        }
        let mut current = self.parent;
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent;
        }
        false
    }

    /// True for the engine's reserved kinds, which may not be triggered from outside.
    pub fn is_reserved(&self) -> bool {
        self.is_a(&NO_EVENT) || self.is_a(&START_EVENT)
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

impl Eq for EventKind {}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Kind of the event synthesized when all sub-machines of a composite state finished.
pub static NO_EVENT: EventKind = EventKind::new("NoEvent");

/// Kind of the event moving a machine from its initial pseudo state to the start state.
pub static START_EVENT: EventKind = EventKind::new("StartEvent");

/// Type-erased, cheaply clonable event payload.
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T` if it holds a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// `TypeId` of the stored value (not of the `Arc` wrapper).
    pub fn value_type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type", &self.type_name)
            .finish()
    }
}

/// An event: a kind plus an optional payload.
///
/// Events are immutable. Two events are equal when their kinds are equal and
/// they carry payloads of the same type (or both carry none); payload values
/// are not compared.
#[derive(Clone)]
pub struct Event {
    kind: &'static EventKind,
    payload: Option<Payload>,
}

impl Event {
    pub fn new(kind: &'static EventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Create an event carrying `data`.
    pub fn with_payload<T: Any + Send + Sync>(kind: &'static EventKind, data: T) -> Self {
        Self {
            kind,
            payload: Some(Payload::new(data)),
        }
    }

    pub(crate) fn from_parts(kind: &'static EventKind, payload: Option<Payload>) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> &'static EventKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrow the payload as `T`; `None` if absent or of another type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }

    /// The same event re-tagged with another kind, keeping the payload.
    pub fn with_kind(&self, kind: &'static EventKind) -> Self {
        Self {
            kind,
            payload: self.payload.clone(),
        }
    }

    /// The synthesized completion event, carrying this event's payload.
    pub(crate) fn to_no_event(&self) -> Self {
        self.with_kind(&NO_EVENT)
    }

    pub fn is_no_event(&self) -> bool {
        self.kind.is_a(&NO_EVENT)
    }
}

impl From<&'static EventKind> for Event {
    fn from(kind: &'static EventKind) -> Self {
        Event::new(kind)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        let same_payload_type = match (&self.payload, &other.payload) {
            (None, None) => true,
            (Some(a), Some(b)) => a.value_type_id() == b.value_type_id(),
            _ => false,
        };
        self.kind == other.kind && same_payload_type
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind.name())
            .field("payload", &self.payload.as_ref().map(Payload::type_name))
            .finish()
    }
}
