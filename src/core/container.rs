//! State containers: a state bound to its sub-machines, transitions and actions.
//!
//! Containers are immutable. Every builder method consumes the container and
//! returns a new one, so a finished container can be shared freely. The only
//! runtime data of a container, the set of sub-machines currently running, is
//! kept outside of it in an [`ActiveChildren`] slot owned by the machine.

use super::action::Action;
use super::error::FsmResult;
use super::event::{Event, EventKind, Payload};
use super::guard::Guard;
use super::history::{History, TransitionEndPoint};
use super::state::State;
use super::transition::Transition;
use crate::machine::FsmSync;
use std::any::Any;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Outcome of offering an event to a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeStateData {
    /// Whether the event was consumed at this level.
    pub handled: bool,
    /// Destination to activate, if a transition fired.
    pub endpoint: Option<TransitionEndPoint>,
}

impl ChangeStateData {
    pub fn handled() -> Self {
        Self {
            handled: true,
            endpoint: None,
        }
    }

    pub fn unhandled() -> Self {
        Self {
            handled: false,
            endpoint: None,
        }
    }

    /// A fired transition; moving to the final state does not count as handled.
    pub fn change(endpoint: TransitionEndPoint) -> Self {
        Self {
            handled: !endpoint.is_to_final(),
            endpoint: Some(endpoint),
        }
    }
}

/// Indices of the sub-machines of one container that are currently running.
///
/// Indices point into [`StateContainer::children`].
#[derive(Debug, Default)]
pub(crate) struct ActiveChildren {
    indices: Mutex<Vec<usize>>,
}

impl ActiveChildren {
    fn lock(&self) -> MutexGuard<'_, Vec<usize>> {
        self.indices.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<usize> {
        self.lock().clone()
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn add(&self, index: usize) {
        let mut indices = self.lock();
        if !indices.contains(&index) {
            indices.push(index);
        }
    }

    fn remove(&self, index: usize) {
        self.lock().retain(|i| *i != index);
    }
}

/// A state together with its sub-machines, transitions and actions.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{EventKind, State};
///
/// static NEXT: EventKind = EventKind::new("Next");
///
/// let green = State::new("Green");
/// let yellow = State::new("Yellow");
///
/// let container = green
///     .on(&NEXT, &yellow)
///     .entry(|| println!("go"));
///
/// assert_eq!(container.state(), &green);
/// assert_eq!(container.transitions().len(), 1);
/// ```
#[derive(Clone)]
pub struct StateContainer {
    state: State,
    children: Vec<FsmSync>,
    transitions: Vec<Transition>,
    on_entry: Action,
    on_exit: Action,
    on_do_in_state: Action,
}

impl StateContainer {
    /// Create a container for `state`. Sub-machines declared on the state
    /// become the container's first children.
    pub fn new(state: State) -> Self {
        let children = state.sub_machines().to_vec();
        Self {
            state,
            children,
            transitions: Vec::new(),
            on_entry: Action::none(),
            on_exit: Action::none(),
            on_do_in_state: Action::none(),
        }
    }

    /// The pseudo container a machine sits in before it is started.
    pub(crate) fn initial(first: &State) -> Self {
        Self::new(State::initial()).on(&super::event::START_EVENT, first)
    }

    pub(crate) fn final_container() -> Self {
        Self::new(State::final_state())
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn children(&self) -> &[FsmSync] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn has_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    pub fn on_do_in_state(&self) -> &Action {
        &self.on_do_in_state
    }

    // Builder

    /// Add a sub-machine.
    pub fn child(mut self, machine: FsmSync) -> Self {
        self.children.push(machine);
        self
    }

    /// Add several sub-machines, keeping their order.
    pub fn children_of(mut self, machines: impl IntoIterator<Item = FsmSync>) -> Self {
        self.children.extend(machines);
        self
    }

    pub fn entry<F>(self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.entry_action(Action::new(f))
    }

    /// Entry action receiving the activating event's payload.
    pub fn entry_with<T, F>(self, f: F) -> Self
    where
        T: Any,
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.entry_action(Action::with_payload(f))
    }

    pub fn entry_action(mut self, action: Action) -> Self {
        self.on_entry = action;
        self
    }

    pub fn exit<F>(self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.exit_action(Action::new(f))
    }

    pub fn exit_with<T, F>(self, f: F) -> Self
    where
        T: Any,
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.exit_action(Action::with_payload(f))
    }

    pub fn exit_action(mut self, action: Action) -> Self {
        self.on_exit = action;
        self
    }

    pub fn do_in_state<F>(self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.do_in_state_action(Action::new(f))
    }

    pub fn do_in_state_with<T, F>(self, f: F) -> Self
    where
        T: Any,
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.do_in_state_action(Action::with_payload(f))
    }

    pub fn do_in_state_action(mut self, action: Action) -> Self {
        self.on_do_in_state = action;
        self
    }

    /// Append a transition. Transitions are evaluated in declaration order.
    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn on(self, kind: &'static EventKind, target: impl Into<TransitionEndPoint>) -> Self {
        self.transition(Transition::new(kind, target))
    }

    pub fn on_if<F>(
        self,
        kind: &'static EventKind,
        target: impl Into<TransitionEndPoint>,
        guard: F,
    ) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.transition(Transition::new(kind, target).when(guard))
    }

    /// Transition taken only for events carrying a `T` accepted by `guard`.
    pub fn on_payload<T, F>(
        self,
        kind: &'static EventKind,
        target: impl Into<TransitionEndPoint>,
        guard: F,
    ) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.transition(Transition::new(kind, target).when_payload(guard))
    }

    pub fn on_final(self, kind: &'static EventKind) -> Self {
        self.transition(Transition::to_final(kind))
    }

    pub fn on_final_if<F>(self, kind: &'static EventKind, guard: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.transition(Transition::to_final(kind).when(guard))
    }

    /// Transition taken once every sub-machine has reached its final state.
    pub fn on_completion(self, target: impl Into<TransitionEndPoint>) -> Self {
        self.transition(Transition::on_completion(target))
    }

    pub fn on_completion_if<F>(self, target: impl Into<TransitionEndPoint>, guard: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.transition(Transition::on_completion(target).guard(Guard::new(guard)))
    }

    // Runtime

    /// Enter the container's state.
    ///
    /// With shallow history and running sub-machines, each running
    /// sub-machine re-enters its current state freshly. With deep history and
    /// running sub-machines nothing happens. Otherwise the entry action fires
    /// and every sub-machine is started from scratch.
    pub(crate) fn start(
        &self,
        active: &ActiveChildren,
        event: &Event,
        history: History,
    ) -> FsmResult<()> {
        if !active.is_empty() {
            match history {
                History::Shallow => return self.restart_active_children(active, event),
                History::Deep => return Ok(()),
                History::None => {}
            }
        }

        self.on_entry
            .fire(event)
            .map_err(|e| e.in_state(self.name()))?;
        self.start_children(active, event.payload())
    }

    fn restart_active_children(&self, active: &ActiveChildren, event: &Event) -> FsmResult<()> {
        for index in active.snapshot() {
            if let Some(child) = self.children.get(index) {
                child.restart_current(event)?;
            }
        }
        Ok(())
    }

    /// Start every sub-machine from scratch, handing each the payload.
    pub(crate) fn start_children(
        &self,
        active: &ActiveChildren,
        payload: Option<&Payload>,
    ) -> FsmResult<()> {
        active.clear();
        for (index, child) in self.children.iter().enumerate() {
            active.add(index);
            child.start_nested(payload.cloned())?;
        }
        Ok(())
    }

    /// Offer `event` to the running sub-machines, then to the own transitions.
    pub(crate) fn trigger(
        &self,
        active: &ActiveChildren,
        event: &Event,
    ) -> FsmResult<ChangeStateData> {
        let running = active.snapshot();
        if running.is_empty() {
            return self.process_transitions(event);
        }

        // every running child sees the event, even after one handled it
        let mut handled = false;
        for index in running {
            let Some(child) = self.children.get(index) else {
                continue;
            };
            handled |= child.trigger_nested(event)?;
            if child.has_finished() {
                active.remove(index);
            }
        }

        if handled {
            return Ok(ChangeStateData::handled());
        }

        if active.is_empty() {
            trace!(state = %self.state, "all sub-machines finished");
            self.process_transitions(&event.to_no_event())
        } else {
            self.process_transitions(event)
        }
    }

    fn process_transitions(&self, event: &Event) -> FsmResult<ChangeStateData> {
        for transition in &self.transitions {
            let allowed = transition
                .is_allowed(event)
                .map_err(|e| e.in_state(self.name()))?;
            if allowed {
                self.on_exit
                    .fire(event)
                    .map_err(|e| e.in_state(self.name()))?;
                return Ok(ChangeStateData::change(transition.endpoint().clone()));
            }
        }
        Ok(ChangeStateData::unhandled())
    }
}

impl From<State> for StateContainer {
    fn from(state: State) -> Self {
        StateContainer::new(state)
    }
}

impl fmt::Display for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateContainer")
            .field("state", &self.state)
            .field("children", &self.children.len())
            .field("transitions", &self.transitions)
            .finish()
    }
}

/// Shortcuts creating a container from a state.
impl State {
    pub fn to_container(&self) -> StateContainer {
        StateContainer::new(self.clone())
    }

    pub fn on(&self, kind: &'static EventKind, target: impl Into<TransitionEndPoint>) -> StateContainer {
        self.to_container().on(kind, target)
    }

    pub fn on_if<F>(
        &self,
        kind: &'static EventKind,
        target: impl Into<TransitionEndPoint>,
        guard: F,
    ) -> StateContainer
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.to_container().on_if(kind, target, guard)
    }

    pub fn on_payload<T, F>(
        &self,
        kind: &'static EventKind,
        target: impl Into<TransitionEndPoint>,
        guard: F,
    ) -> StateContainer
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.to_container().on_payload(kind, target, guard)
    }

    pub fn on_final(&self, kind: &'static EventKind) -> StateContainer {
        self.to_container().on_final(kind)
    }

    pub fn on_completion(&self, target: impl Into<TransitionEndPoint>) -> StateContainer {
        self.to_container().on_completion(target)
    }

    pub fn transition(&self, transition: Transition) -> StateContainer {
        self.to_container().transition(transition)
    }

    pub fn child(&self, machine: FsmSync) -> StateContainer {
        self.to_container().child(machine)
    }

    pub fn children(&self, machines: impl IntoIterator<Item = FsmSync>) -> StateContainer {
        self.to_container().children_of(machines)
    }

    pub fn entry<F>(&self, f: F) -> StateContainer
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.to_container().entry(f)
    }

    pub fn exit<F>(&self, f: F) -> StateContainer
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.to_container().exit(f)
    }

    pub fn do_in_state<F>(&self, f: F) -> StateContainer
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.to_container().do_in_state(f)
    }
}
