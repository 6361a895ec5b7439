//! Construction-time validation of a machine's container set.
//!
//! Uses `Validation` to collect every violation before failing, so a broken
//! definition is reported in one go instead of one error per build attempt.

use crate::core::{FsmError, StateContainer};
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// A single problem found in a machine definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Violation {
    /// A completion (no-event) transition on a state without sub-machines.
    NoEventWithoutChildren { state: String },
    /// The same state declared by more than one container.
    DuplicateState { state: String },
    /// A final or initial state declared with a container of its own.
    ReservedState { state: String },
}

pub(crate) type Violations = Validation<(), NonEmptyVec<Violation>>;

/// Completion transitions are only meaningful on composite states.
pub(crate) fn check_no_event_usage(containers: &[StateContainer]) -> Violations {
    let checks: Vec<Violations> = containers
        .iter()
        .map(|container| {
            let misused = !container.has_children()
                && container.transitions().iter().any(|t| t.is_no_event());
            if misused {
                Validation::fail(Violation::NoEventWithoutChildren {
                    state: container.name().to_string(),
                })
            } else {
                Validation::success(())
            }
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

pub(crate) fn check_unique_states(containers: &[StateContainer]) -> Violations {
    let mut seen = HashSet::new();
    let checks: Vec<Violations> = containers
        .iter()
        .map(|container| {
            if seen.insert(container.state().clone()) {
                Validation::success(())
            } else {
                Validation::fail(Violation::DuplicateState {
                    state: container.name().to_string(),
                })
            }
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// Only normal states may be declared; the initial and final containers
/// are provided by the machine.
pub(crate) fn check_declarable_states(containers: &[StateContainer]) -> Violations {
    let checks: Vec<Violations> = containers
        .iter()
        .map(|container| {
            let state = container.state();
            if state.is_final() || state.is_initial() {
                Validation::fail(Violation::ReservedState {
                    state: container.name().to_string(),
                })
            } else {
                Validation::success(())
            }
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// Run every check over the explicitly declared containers.
pub(crate) fn validate(machine: &str, containers: &[StateContainer]) -> Result<(), FsmError> {
    let result = Validation::all_vec(vec![
        check_no_event_usage(containers),
        check_unique_states(containers),
        check_declarable_states(containers),
    ])
    .map(|_| ());

    match result {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(into_error(machine, violations.iter())),
    }
}

/// Fold violations into one error. Misused completion transitions win and
/// are reported together, then reserved states, then duplicates.
fn into_error<'a>(machine: &str, violations: impl Iterator<Item = &'a Violation>) -> FsmError {
    let mut misused = Vec::new();
    let mut duplicate = None;
    let mut reserved = None;
    for violation in violations {
        match violation {
            Violation::NoEventWithoutChildren { state } => misused.push(state.clone()),
            Violation::DuplicateState { state } => {
                duplicate.get_or_insert_with(|| state.clone());
            }
            Violation::ReservedState { state } => {
                reserved.get_or_insert_with(|| state.clone());
            }
        }
    }

    if !misused.is_empty() {
        return FsmError::NoEventMisuse { states: misused };
    }
    match (reserved, duplicate) {
        (Some(state), _) => FsmError::ReservedState {
            machine: machine.to_string(),
            state,
        },
        (None, Some(state)) => FsmError::DuplicateState {
            machine: machine.to_string(),
            state,
        },
        (None, None) => FsmError::NoEventMisuse { states: misused },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, State};

    static GO: EventKind = EventKind::new("Go");

    #[test]
    fn plain_machine_is_valid() {
        let a = State::new("a");
        let b = State::new("b");
        let containers = vec![a.on(&GO, &b), b.on(&GO, &a)];

        assert!(validate("m", &containers).is_ok());
    }

    #[test]
    fn every_misused_completion_is_reported() {
        let target = State::new("t");
        let containers = vec![
            State::new("x").on_completion(&target),
            State::new("y").on(&GO, &target),
            State::new("z").on_completion(&target),
        ];

        match check_no_event_usage(&containers) {
            Validation::Failure(violations) => assert_eq!(violations.len(), 2),
            Validation::Success(_) => panic!("expected violations"),
        }

        match validate("m", &containers) {
            Err(FsmError::NoEventMisuse { states }) => {
                assert_eq!(states, vec!["x".to_string(), "z".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let a = State::new("a");
        let containers = vec![a.on(&GO, State::new("b")), a.to_container()];

        match validate("m", &containers) {
            Err(FsmError::DuplicateState { machine, state }) => {
                assert_eq!(machine, "m");
                assert_eq!(state, "a");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn misuse_wins_over_duplicates() {
        let a = State::new("a");
        let containers = vec![a.on_completion(State::new("b")), a.to_container()];

        assert!(matches!(
            validate("m", &containers),
            Err(FsmError::NoEventMisuse { .. })
        ));
    }

    #[test]
    fn final_state_cannot_be_declared() {
        let a = State::new("a");
        let containers = vec![a.on_final(&GO), State::final_state().on(&GO, &a)];

        match check_declarable_states(&containers) {
            Validation::Failure(violations) => assert_eq!(violations.len(), 1),
            Validation::Success(_) => panic!("expected violations"),
        }

        match validate("m", &containers) {
            Err(FsmError::ReservedState { machine, state }) => {
                assert_eq!(machine, "m");
                assert_eq!(state, "Final");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn reserved_state_wins_over_duplicates() {
        let a = State::new("a");
        let containers = vec![
            a.to_container(),
            a.to_container(),
            State::final_state().to_container(),
        ];

        assert!(matches!(
            validate("m", &containers),
            Err(FsmError::ReservedState { .. })
        ));
    }
}
