//! Serializable snapshots of machine structure and state changes.
//!
//! A [`MachineInfo`] describes the states, transitions and nested machines
//! of a machine, e.g. for rendering a diagram. A [`StateChangedInfo`] mirrors
//! one state-changed notification. Neither holds callbacks, so both can be
//! serialized and sent elsewhere.

use crate::core::{State, StateContainer, Transition};
use crate::machine::{FsmAsync, FsmCore, FsmSync, StateChanged};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::DescribeError;

/// Suffix of the id given to the final state of a machine.
pub const FINAL_STATE_ID: &str = "Final.ID";

/// Id of `state` as used in snapshots.
///
/// Final states are all equal, so their id is derived from the owning
/// machine's name instead of the state itself.
pub fn normalized_id(state: &State, machine: &str) -> String {
    if state.is_final() {
        format!("{machine}-{FINAL_STATE_ID}")
    } else {
        state.id().to_string()
    }
}

/// A transition, reduced to its destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub end_point_id: String,
    pub is_history: bool,
    pub is_deep_history: bool,
    pub is_to_final: bool,
}

impl TransitionInfo {
    pub fn of(transition: &Transition, machine: &str) -> Self {
        let endpoint = transition.endpoint();
        Self {
            end_point_id: normalized_id(endpoint.state(), machine),
            is_history: endpoint.history().is_history(),
            is_deep_history: endpoint.history().is_deep_history(),
            is_to_final: transition.is_to_final(),
        }
    }
}

/// A state with its outgoing transitions and nested machines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInfo {
    pub id: String,
    pub name: String,
    pub is_initial: bool,
    pub is_final: bool,
    pub transitions: Vec<TransitionInfo>,
    pub children: Vec<MachineInfo>,
    /// Some transition of the machine enters this state with shallow history.
    pub has_history: bool,
    /// Some transition of the machine enters this state with deep history.
    pub has_deep_history: bool,
}

impl StateInfo {
    pub fn of(container: &StateContainer, machine: &str) -> Self {
        let state = container.state();
        Self {
            id: normalized_id(state, machine),
            name: state.name().to_string(),
            is_initial: state.is_initial(),
            is_final: state.is_final(),
            transitions: container
                .transitions()
                .iter()
                .map(|t| TransitionInfo::of(t, machine))
                .collect(),
            children: container.children().iter().map(MachineInfo::of).collect(),
            has_history: false,
            has_deep_history: false,
        }
    }

    /// Set the history flags from the transitions pointing at this state.
    fn with_history_flags(self, transitions: &[TransitionInfo]) -> Self {
        let incoming = transitions.iter().filter(|t| t.end_point_id == self.id);
        let (has_history, has_deep_history) = incoming.fold((false, false), |(h, d), t| {
            (h || t.is_history, d || t.is_deep_history)
        });
        Self {
            has_history,
            has_deep_history,
            ..self
        }
    }
}

/// Structure of a machine: the initial pseudo state first, then every state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub name: String,
    pub states: Vec<StateInfo>,
}

impl MachineInfo {
    pub fn of(fsm: &FsmSync) -> Self {
        fsm.describe()
    }

    pub fn of_async(fsm: &FsmAsync) -> Self {
        fsm.describe()
    }

    pub(crate) fn from_core(core: &FsmCore) -> Self {
        let machine = core.name();
        let raw: Vec<StateInfo> = std::iter::once(core.initial_container())
            .chain(core.containers())
            .map(|c| StateInfo::of(c, machine))
            .collect();
        let transitions: Vec<TransitionInfo> = raw
            .iter()
            .flat_map(|s| s.transitions.iter().cloned())
            .collect();

        Self {
            name: machine.to_string(),
            states: raw
                .into_iter()
                .map(|s| s.with_history_flags(&transitions))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, DescribeError> {
        serde_json::to_string(self).map_err(|e| DescribeError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DescribeError> {
        serde_json::from_str(json).map_err(|e| DescribeError::DeserializationFailed(e.to_string()))
    }
}

/// A state-changed notification in serializable form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangedInfo {
    pub fsm: String,
    pub old_state_name: String,
    pub old_state_id: String,
    pub new_state_name: String,
    pub new_state_id: String,
    pub at: DateTime<Utc>,
}

impl From<&StateChanged> for StateChangedInfo {
    fn from(change: &StateChanged) -> Self {
        Self {
            fsm: change.machine.clone(),
            old_state_name: change.old_state.name().to_string(),
            old_state_id: normalized_id(&change.old_state, &change.machine),
            new_state_name: change.new_state.name().to_string(),
            new_state_id: normalized_id(&change.new_state, &change.machine),
            at: change.at,
        }
    }
}

impl StateChangedInfo {
    pub fn to_json(&self) -> Result<String, DescribeError> {
        serde_json::to_string(self).map_err(|e| DescribeError::SerializationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventKind;
    use std::sync::{Arc, Mutex};

    static GO: EventKind = EventKind::new("Go");
    const OWNER: &str = "owner";

    #[test]
    fn normalized_id_of_normal_state_is_its_id() {
        let state = State::new("state");
        assert_eq!(normalized_id(&state, OWNER), state.id());
    }

    #[test]
    fn normalized_id_of_final_state_uses_the_machine() {
        assert_eq!(
            normalized_id(&State::final_state(), OWNER),
            format!("{OWNER}-{FINAL_STATE_ID}")
        );
    }

    #[test]
    fn transition_info_reflects_the_endpoint() {
        let target = State::new("t");
        let cases = [
            (Transition::new(&GO, &target), false, false, false),
            (Transition::new(&GO, target.history()), true, false, false),
            (Transition::new(&GO, target.deep_history()), false, true, false),
            (Transition::to_final(&GO), false, false, true),
        ];

        for (transition, history, deep, to_final) in cases {
            let info = TransitionInfo::of(&transition, OWNER);
            assert_eq!(info.end_point_id, normalized_id(transition.endpoint().state(), OWNER));
            assert_eq!(info.is_history, history);
            assert_eq!(info.is_deep_history, deep);
            assert_eq!(info.is_to_final, to_final);
        }
    }

    #[test]
    fn state_info_lists_transitions_in_order() {
        let container = State::new("S1")
            .on_final(&GO)
            .on(&GO, State::new("S2"));

        let info = StateInfo::of(&container, OWNER);

        assert_eq!(info.name, "S1");
        assert!(!info.is_initial && !info.is_final);
        assert_eq!(info.transitions.len(), 2);
        assert!(info.transitions[0].is_to_final);
        assert!(!info.transitions[1].is_to_final);
    }

    #[test]
    fn history_flags_combine_all_incoming_transitions() {
        let state = State::new("w");
        let info = StateInfo::of(&state.to_container(), OWNER);
        let id = info.id.clone();
        let incoming = |history: bool, deep: bool| TransitionInfo {
            end_point_id: id.clone(),
            is_history: history,
            is_deep_history: deep,
            is_to_final: false,
        };

        let flagged = info.with_history_flags(&[incoming(true, false), incoming(false, true)]);

        assert!(flagged.has_history);
        assert!(flagged.has_deep_history);
    }

    #[test]
    fn machine_info_starts_with_the_initial_state() {
        let child = FsmSync::of("child", State::new("c").on_final(&GO), []).unwrap();
        let work = State::composite("work", [child]);
        let fsm = FsmSync::of("main", work.on(&GO, work.history()), []).unwrap();

        let info = MachineInfo::of(&fsm);

        assert_eq!(info.name, "main");
        assert!(info.states[0].is_initial);
        assert_eq!(info.states[1].name, "work");
        assert!(info.states[1].has_history);
        assert!(!info.states[1].has_deep_history);
        assert_eq!(info.states[1].children[0].name, "child");
        assert_eq!(info.states[1].children[0].states.len(), 3);
    }

    #[test]
    fn machine_info_json_round_trip() {
        let fsm = FsmSync::of("json", State::new("a").on_final(&GO), []).unwrap();
        let info = MachineInfo::of(&fsm);

        let json = info.to_json().unwrap();
        let back = MachineInfo::from_json(&json).unwrap();

        assert_eq!(back, info);
        assert!(MachineInfo::from_json("{not json").is_err());
    }

    #[test]
    fn state_changed_info_from_notification() {
        let a = State::new("a");
        let fsm = FsmSync::of("changes", a.on_final(&GO), []).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        fsm.on_state_changed(move |change| sink.lock().unwrap().push(StateChangedInfo::from(change)));

        fsm.start().unwrap();
        fsm.trigger(&GO).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].old_state_id, a.id());
        assert_eq!(seen[1].new_state_id, "changes-Final.ID");
        assert!(seen[1].to_json().unwrap().contains("\"fsm\":\"changes\""));
    }
}
