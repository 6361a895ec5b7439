//! Error types shared by every part of the engine.

use std::any::Any;
use std::error::Error as StdError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type FsmResult<T> = Result<T, FsmError>;

/// The single domain error raised by state machines.
///
/// User callbacks (actions, guards, listeners) never fail silently: a panic or
/// an `Err` escaping them is wrapped into one of the variants below and
/// propagated to the caller of `start`/`trigger`.
#[derive(Debug, Error)]
pub enum FsmError {
    /// An entry, exit, do-in-state action or a guard failed.
    #[error("{message} (state: '{state}')")]
    Action {
        message: &'static str,
        state: String,
        #[source]
        cause: CallbackError,
    },

    /// A state-changed or triggered listener failed.
    #[error("Error calling {observer} on machine '{machine}'")]
    Observer {
        observer: &'static str,
        machine: String,
        #[source]
        cause: CallbackError,
    },

    /// A reserved event kind was triggered from outside the engine.
    #[error("Machine '{machine}': a trigger event cannot be '{kind}'")]
    ReservedEvent { machine: String, kind: &'static str },

    /// Transitions without an event were declared on states without children.
    #[error("A transition without event can only be used for nested states (offending states: {states:?})")]
    NoEventMisuse { states: Vec<String> },

    /// The same state was declared more than once in one machine.
    #[error("State '{state}' is declared more than once in machine '{machine}'")]
    DuplicateState { machine: String, state: String },

    /// A final or initial state was declared as one of the machine's states.
    #[error("State '{state}' cannot be declared in machine '{machine}', the machine provides its initial and final states")]
    ReservedState { machine: String, state: String },

    /// A machine was built without a start state.
    #[error("Start state not specified for machine '{machine}'. Call .start(container) before building")]
    MissingStartState { machine: String },

    /// The machine already reached its final state.
    #[error("Machine '{machine}' has finished, no transitions are defined from the final state")]
    Finished { machine: String },

    /// A state is not part of the machine.
    #[error("State '{state}' is not part of machine '{machine}'")]
    UnknownState { machine: String, state: String },

    /// An asynchronous machine was created outside of a tokio runtime.
    #[error("No tokio runtime available to run machine '{machine}'")]
    NoRuntime { machine: String },

    /// A queued trigger was dropped before it could be processed.
    #[error("Trigger on machine '{machine}' was abandoned before it completed")]
    Abandoned { machine: String },
}

impl FsmError {
    /// Tag an action failure with the name of the state it happened in.
    ///
    /// Errors that already carry a state name, and all other variants, are
    /// returned unchanged.
    pub fn in_state(self, name: &str) -> Self {
        match self {
            FsmError::Action {
                message,
                state,
                cause,
            } if state.is_empty() => FsmError::Action {
                message,
                state: name.to_string(),
                cause,
            },
            other => other,
        }
    }

    /// Name of the state an action failure was tagged with, if any.
    pub fn state_name(&self) -> Option<&str> {
        match self {
            FsmError::Action { state, .. } if !state.is_empty() => Some(state),
            _ => None,
        }
    }
}

/// The preserved cause of a failed user callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The callback panicked; holds the panic message.
    #[error("callback panicked: {0}")]
    Panicked(String),

    /// A fallible callback returned an error.
    #[error(transparent)]
    Failed(Box<dyn StdError + Send + Sync>),
}

impl CallbackError {
    /// Build from the payload returned by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        CallbackError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action_error() -> FsmError {
        FsmError::Action {
            message: "Error calling the action",
            state: String::new(),
            cause: CallbackError::Panicked("boom".to_string()),
        }
    }

    #[test]
    fn in_state_tags_untagged_action_errors() {
        let err = action_error().in_state("Working");
        assert_eq!(err.state_name(), Some("Working"));
    }

    #[test]
    fn in_state_keeps_the_innermost_state_name() {
        let err = action_error().in_state("Inner").in_state("Outer");
        assert_eq!(err.state_name(), Some("Inner"));
    }

    #[test]
    fn untagged_error_has_no_state_name() {
        assert_eq!(action_error().state_name(), None);
    }

    #[test]
    fn cause_is_preserved_as_source() {
        let err = action_error();
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("callback panicked: boom"));
    }

    #[test]
    fn panic_payloads_are_converted_to_messages() {
        let from_str = CallbackError::from_panic(Box::new("static message"));
        let from_string = CallbackError::from_panic(Box::new(String::from("owned message")));
        let from_other = CallbackError::from_panic(Box::new(42_u32));

        assert_eq!(from_str.to_string(), "callback panicked: static message");
        assert_eq!(from_string.to_string(), "callback panicked: owned message");
        assert_eq!(from_other.to_string(), "callback panicked: unknown panic");
    }
}
