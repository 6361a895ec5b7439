//! States of a hierarchical state machine.
//!
//! A state is a cheap, clonable handle with reference identity: clones of
//! one `State` are equal, two `State::new("A")` calls produce different
//! states. The final state is the exception, every final state equals every
//! other final state.

use super::history::{History, TransitionEndPoint};
use crate::machine::FsmSync;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static INSTANCE_COUNTER: AtomicUsize = AtomicUsize::new(0);

const DEFAULT_NAME: &str = "State";
const INITIAL_NAME: &str = "Initial";
const FINAL_NAME: &str = "Final";

/// What kind of state a [`State`] is.
///
/// Normal states own zero or more sub-machines; a normal state with at
/// least one sub-machine is a composite state.
#[derive(Clone)]
pub enum StateKind {
    Normal { sub_machines: Vec<FsmSync> },
    Initial,
    Final,
}

struct StateInner {
    id: String,
    name: String,
    kind: StateKind,
}

/// A state of a machine.
///
/// # Example
///
/// ```rust
/// use hfsm::core::State;
///
/// let idle = State::new("Idle");
/// let same = idle.clone();
///
/// assert_eq!(idle, same);
/// assert_ne!(idle, State::new("Idle"));
/// assert_eq!(State::final_state(), State::final_state());
/// ```
#[derive(Clone)]
pub struct State {
    inner: Arc<StateInner>,
}

impl State {
    /// Create a normal (leaf) state.
    ///
    /// An empty or whitespace-only name falls back to `"State"`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(
            name.into(),
            StateKind::Normal {
                sub_machines: Vec::new(),
            },
        )
    }

    /// Create a composite state owning `sub_machines`.
    ///
    /// Containers created from this state start with these sub-machines as
    /// children.
    pub fn composite(name: impl Into<String>, sub_machines: impl IntoIterator<Item = FsmSync>) -> Self {
        Self::with_kind(
            name.into(),
            StateKind::Normal {
                sub_machines: sub_machines.into_iter().collect(),
            },
        )
    }

    /// Create a final state.
    pub fn final_state() -> Self {
        Self::with_kind(FINAL_NAME.to_string(), StateKind::Final)
    }

    pub(crate) fn initial() -> Self {
        Self::with_kind(INITIAL_NAME.to_string(), StateKind::Initial)
    }

    fn with_kind(name: String, kind: StateKind) -> Self {
        let name = if name.trim().is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name
        };
        let current = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(StateInner {
                id: format!("State_{current:04}"),
                name,
                kind,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Process-unique identifier of this state.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> &StateKind {
        &self.inner.kind
    }

    pub fn is_initial(&self) -> bool {
        matches!(self.inner.kind, StateKind::Initial)
    }

    pub fn is_final(&self) -> bool {
        matches!(self.inner.kind, StateKind::Final)
    }

    /// True if this state owns at least one sub-machine.
    pub fn is_composite(&self) -> bool {
        !self.sub_machines().is_empty()
    }

    /// Sub-machines declared on the state itself.
    pub fn sub_machines(&self) -> &[FsmSync] {
        match &self.inner.kind {
            StateKind::Normal { sub_machines } => sub_machines,
            _ => &[],
        }
    }

    /// May this state be the source of a transition?
    pub fn is_start_capable(&self) -> bool {
        !self.is_final()
    }

    /// May this state be the destination of a transition?
    pub fn is_end_capable(&self) -> bool {
        !self.is_initial()
    }

    /// Endpoint entering this state with shallow history.
    pub fn history(&self) -> TransitionEndPoint {
        TransitionEndPoint::with_history(self.clone(), History::Shallow)
    }

    /// Endpoint entering this state with deep history.
    pub fn deep_history(&self) -> TransitionEndPoint {
        TransitionEndPoint::with_history(self.clone(), History::Deep)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        if self.is_final() || other.is_final() {
            return self.is_final() && other.is_final();
        }
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_final() {
            FINAL_NAME.hash(state);
        } else {
            self.inner.id.hash(state);
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
