//! History modes and transition endpoints.

use super::state::State;
use serde::{Deserialize, Serialize};

/// How a composite state is re-entered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum History {
    /// Enter fresh: fire the entry action and restart all sub-machines.
    #[default]
    None,
    /// Resume the active sub-machines at their current state; their own
    /// nested machines restart.
    Shallow,
    /// Resume the whole active subtree exactly as it was left.
    Deep,
}

impl History {
    pub fn is_history(self) -> bool {
        self == History::Shallow
    }

    pub fn is_deep_history(self) -> bool {
        self == History::Deep
    }
}

/// Destination of a transition: a state plus the history mode used to enter it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransitionEndPoint {
    state: State,
    history: History,
}

impl TransitionEndPoint {
    pub fn new(state: State) -> Self {
        Self::with_history(state, History::None)
    }

    pub fn with_history(state: State, history: History) -> Self {
        Self { state, history }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn history(&self) -> History {
        self.history
    }

    pub fn is_to_final(&self) -> bool {
        self.state.is_final()
    }
}

impl From<State> for TransitionEndPoint {
    fn from(state: State) -> Self {
        Self::new(state)
    }
}

impl From<&State> for TransitionEndPoint {
    fn from(state: &State) -> Self {
        Self::new(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_checks() {
        for (history, is_history, is_deep) in [
            (History::None, false, false),
            (History::Shallow, true, false),
            (History::Deep, false, true),
        ] {
            assert_eq!(history.is_history(), is_history);
            assert_eq!(history.is_deep_history(), is_deep);
        }
    }

    #[test]
    fn default_history_is_none() {
        assert_eq!(History::default(), History::None);
    }

    #[test]
    fn history_serializes_by_name() {
        let json = serde_json::to_string(&History::Deep).unwrap();
        assert_eq!(json, "\"Deep\"");
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, History::Deep);
    }

    #[test]
    fn endpoint_from_state_has_no_history() {
        let state = State::new("target");
        let endpoint = TransitionEndPoint::from(&state);

        assert_eq!(endpoint.state(), &state);
        assert_eq!(endpoint.history(), History::None);
        assert!(!endpoint.is_to_final());
    }

    #[test]
    fn endpoints_compare_state_and_history() {
        let state = State::new("target");

        assert_eq!(TransitionEndPoint::new(state.clone()), TransitionEndPoint::from(&state));
        assert_ne!(TransitionEndPoint::new(state.clone()), state.history());
        assert!(TransitionEndPoint::new(State::final_state()).is_to_final());
    }
}
