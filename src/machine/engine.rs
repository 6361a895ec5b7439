//! The engine shared by the synchronous and asynchronous machines.
//!
//! A machine owns a frozen list of containers. Each container sits in a slot
//! next to its runtime data, the set of running sub-machines. The current
//! position is an index into that list (or the initial pseudo state before
//! the machine is started).

use super::notify::{Listeners, StateChanged, Triggered};
use super::validation;
use crate::core::{
    ActiveChildren, Event, FsmError, FsmResult, History, Payload, State, StateContainer,
    StateContainerTreeNode, StateTreeNode, TransitionEndPoint, START_EVENT,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use uuid::Uuid;

struct Slot {
    container: StateContainer,
    active: ActiveChildren,
}

impl Slot {
    fn new(container: StateContainer) -> Self {
        Self {
            container,
            active: ActiveChildren::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Initial,
    At(usize),
}

pub(crate) struct FsmCore {
    id: Uuid,
    name: String,
    initial: Slot,
    slots: Vec<Slot>,
    position: Mutex<Position>,
    dispatch: Mutex<()>,
    listeners: Listeners,
}

impl FsmCore {
    /// Build and validate a machine from its start container and the other
    /// declared containers.
    pub(crate) fn new(
        name: impl Into<String>,
        start: StateContainer,
        others: Vec<StateContainer>,
    ) -> FsmResult<Self> {
        let name = name.into();
        let mut declared = Vec::with_capacity(others.len() + 1);
        declared.push(start);
        declared.extend(others);

        validation::validate(&name, &declared)?;

        let initial = StateContainer::initial(declared[0].state());
        let containers = complete_container_set(declared);
        debug!(
            machine = %name,
            states = containers.len(),
            "machine created"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            initial: Slot::new(initial),
            slots: containers.into_iter().map(Slot::new).collect(),
            position: Mutex::new(Position::Initial),
            dispatch: Mutex::new(()),
            listeners: Listeners::new(),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub(crate) fn initial_container(&self) -> &StateContainer {
        &self.initial.container
    }

    /// Every container of the machine, without the initial pseudo state.
    pub(crate) fn containers(&self) -> impl Iterator<Item = &StateContainer> {
        self.slots.iter().map(|slot| &slot.container)
    }

    fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn position(&self) -> Position {
        *self.position.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_position(&self, position: Position) {
        *self.position.lock().unwrap_or_else(|p| p.into_inner()) = position;
    }

    fn slot(&self, position: Position) -> &Slot {
        match position {
            Position::Initial => &self.initial,
            Position::At(index) => &self.slots[index],
        }
    }

    fn current_slot(&self) -> &Slot {
        self.slot(self.position())
    }

    pub(crate) fn current_container(&self) -> &StateContainer {
        &self.current_slot().container
    }

    pub(crate) fn current_state(&self) -> State {
        self.current_container().state().clone()
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.current_state().is_initial() && !self.has_finished()
    }

    pub(crate) fn has_finished(&self) -> bool {
        self.current_state().is_final()
    }

    fn find(&self, state: &State) -> FsmResult<usize> {
        self.slots
            .iter()
            .position(|slot| slot.container.state() == state)
            .ok_or_else(|| FsmError::UnknownState {
                machine: self.name.clone(),
                state: state.name().to_string(),
            })
    }

    // Lifecycle

    /// Reset to the initial pseudo state and move to the start state.
    pub(crate) fn start(&self, payload: Option<Payload>) -> FsmResult<()> {
        let _guard = self.lock_dispatch();
        debug!(machine = %self.name, "starting machine");
        self.set_position(Position::Initial);
        self.dispatch(&Event::from_parts(&START_EVENT, payload))?;
        Ok(())
    }

    /// Trigger from outside: reserved kinds are rejected and a finished
    /// machine refuses further events.
    pub(crate) fn trigger(&self, event: &Event) -> FsmResult<bool> {
        if event.kind().is_reserved() {
            warn!(machine = %self.name, event = %event, "rejected reserved event");
            return Err(FsmError::ReservedEvent {
                machine: self.name.clone(),
                kind: event.name(),
            });
        }

        let _guard = self.lock_dispatch();
        if self.has_finished() {
            return Err(FsmError::Finished {
                machine: self.name.clone(),
            });
        }
        self.dispatch(event)
    }

    /// Trigger issued by the parent machine's container.
    pub(crate) fn trigger_nested(&self, event: &Event) -> FsmResult<bool> {
        let _guard = self.lock_dispatch();
        self.dispatch(event)
    }

    /// Re-enter the current state freshly, used by shallow history of the parent.
    pub(crate) fn restart_current(&self, event: &Event) -> FsmResult<()> {
        let _guard = self.lock_dispatch();
        let slot = self.current_slot();
        slot.container.start(&slot.active, event, History::None)
    }

    /// Offer an event to the current container and activate the destination.
    /// The dispatch lock must be held.
    fn dispatch(&self, event: &Event) -> FsmResult<bool> {
        let from = self.position();
        let slot = self.slot(from);
        let change = slot.container.trigger(&slot.active, event)?;

        trace!(
            machine = %self.name,
            state = %slot.container.state(),
            event = %event,
            handled = change.handled,
            "event processed"
        );
        self.listeners.triggered(&Triggered {
            machine: self.name.clone(),
            state: slot.container.state().clone(),
            event: event.clone(),
            handled: change.handled,
            at: Utc::now(),
        })?;

        if let Some(endpoint) = change.endpoint {
            self.activate(from, &endpoint, event)?;
        }
        Ok(change.handled)
    }

    fn activate(&self, from: Position, endpoint: &TransitionEndPoint, event: &Event) -> FsmResult<()> {
        let to = Position::At(self.find(endpoint.state())?);
        self.set_position(to);
        self.raise_state_changed(from, to)?;

        let slot = self.slot(to);
        slot.container.start(&slot.active, event, endpoint.history())
    }

    fn raise_state_changed(&self, from: Position, to: Position) -> FsmResult<()> {
        let old_state = self.slot(from).container.state().clone();
        let new_state = self.slot(to).container.state().clone();
        debug!(
            machine = %self.name,
            from = %old_state,
            to = %new_state,
            "state changed"
        );
        self.listeners.state_changed(&StateChanged {
            machine: self.name.clone(),
            old_state,
            new_state,
            at: Utc::now(),
        })
    }

    /// Fire the do-in-state action of the current state.
    pub(crate) fn do_action(&self, payload: Option<Payload>) -> FsmResult<()> {
        let _guard = self.lock_dispatch();
        let container = self.current_container();
        container
            .on_do_in_state()
            .fire(&Event::from_parts(&crate::core::NO_EVENT, payload))
            .map_err(|e| e.in_state(container.name()))
    }

    // Debug operations

    /// Jump to `state` without running its entry action.
    pub(crate) fn set_state(&self, state: &State) -> FsmResult<()> {
        let _guard = self.lock_dispatch();
        self.jump_to(state).map(|_| ())
    }

    /// Jump to `state` and start its sub-machines, skipping the entry action.
    pub(crate) fn resume(&self, state: &State) -> FsmResult<()> {
        let _guard = self.lock_dispatch();
        let to = self.jump_to(state)?;
        let slot = self.slot(to);
        slot.container.start_children(&slot.active, None)
    }

    fn jump_to(&self, state: &State) -> FsmResult<Position> {
        let to = Position::At(self.find(state)?);
        let from = self.position();
        self.set_position(to);
        self.raise_state_changed(from, to)?;
        Ok(to)
    }

    // Snapshots

    pub(crate) fn current_state_tree(&self) -> StateTreeNode {
        let slot = self.current_slot();
        let children = slot
            .active
            .snapshot()
            .into_iter()
            .filter_map(|index| slot.container.children().get(index))
            .map(|child| child.current_state_tree())
            .collect();
        StateTreeNode::new(slot.container.state().clone(), children)
    }

    pub(crate) fn current_state_container_tree(&self) -> StateContainerTreeNode {
        let slot = self.current_slot();
        let children = slot
            .active
            .snapshot()
            .into_iter()
            .filter_map(|index| slot.container.children().get(index))
            .map(|child| child.current_state_container_tree())
            .collect();
        StateContainerTreeNode::new(slot.container.clone(), children)
    }
}

/// Declared containers, then containers for states only used as targets,
/// then the final container if any transition leads there.
fn complete_container_set(declared: Vec<StateContainer>) -> Vec<StateContainer> {
    let known: HashSet<State> = declared.iter().map(|c| c.state().clone()).collect();
    let mut inferred: Vec<State> = Vec::new();
    let mut to_final = false;
    let has_final = declared.iter().any(|c| c.state().is_final());

    for transition in declared.iter().flat_map(|c| c.transitions()) {
        let target = transition.endpoint().state();
        if target.is_final() {
            to_final = true;
        } else if !known.contains(target) && !inferred.contains(target) {
            inferred.push(target.clone());
        }
    }

    let mut containers = declared;
    containers.extend(inferred.iter().map(State::to_container));
    if to_final && !has_final {
        containers.push(StateContainer::final_container());
    }
    containers
}
