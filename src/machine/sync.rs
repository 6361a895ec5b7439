//! The synchronous machine.

use super::debug::DebugInterface;
use super::engine::FsmCore;
use super::notify::{StateChanged, Triggered};
use crate::core::{
    Event, EventKind, FsmResult, Payload, State, StateContainer, StateContainerTreeNode,
    StateTreeNode,
};
use crate::describe::MachineInfo;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A state machine processing events on the calling thread.
///
/// Triggers are serialized per machine: concurrent callers block until the
/// event in flight, including every nested sub-machine and listener, has been
/// processed. `FsmSync` is a cheap handle; clones refer to the same machine.
///
/// Listeners and actions run while the machine is busy and must not call
/// `trigger` or `do_action` on the same machine again.
///
/// # Example
///
/// ```rust
/// use hfsm::core::{EventKind, State};
/// use hfsm::machine::FsmSync;
///
/// static NEXT: EventKind = EventKind::new("Next");
///
/// let a = State::new("A");
/// let b = State::new("B");
/// let fsm = FsmSync::of("ab", a.on(&NEXT, &b), [b.on_final(&NEXT)]).unwrap();
///
/// fsm.start().unwrap();
/// assert!(fsm.trigger(&NEXT).unwrap());
/// assert_eq!(fsm.current_state(), b);
///
/// assert!(!fsm.trigger(&NEXT).unwrap());
/// assert!(fsm.has_finished());
/// assert!(fsm.trigger(&NEXT).is_err());
/// ```
#[derive(Clone)]
pub struct FsmSync {
    core: Arc<FsmCore>,
}

impl FsmSync {
    pub(crate) fn from_core(core: FsmCore) -> Self {
        Self {
            core: Arc::new(core),
        }
    }

    /// Build a machine from its start container and the other containers.
    pub fn of(
        name: impl Into<String>,
        start: impl Into<StateContainer>,
        others: impl IntoIterator<Item = StateContainer>,
    ) -> FsmResult<Self> {
        FsmCore::new(name, start.into(), others.into_iter().collect()).map(Self::from_core)
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Identifier of this machine instance.
    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    pub fn start(&self) -> FsmResult<()> {
        self.core.start(None)
    }

    /// Start, handing `data` to the start state's entry action and sub-machines.
    pub fn start_with<T: Any + Send + Sync>(&self, data: T) -> FsmResult<()> {
        self.core.start(Some(Payload::new(data)))
    }

    /// Process `event`; returns whether it was handled.
    pub fn trigger(&self, event: impl Into<Event>) -> FsmResult<bool> {
        self.core.trigger(&event.into())
    }

    pub fn trigger_with<T: Any + Send + Sync>(
        &self,
        kind: &'static EventKind,
        data: T,
    ) -> FsmResult<bool> {
        self.trigger(Event::with_payload(kind, data))
    }

    /// Fire the do-in-state action of the current state.
    pub fn do_action(&self) -> FsmResult<()> {
        self.core.do_action(None)
    }

    pub fn do_action_with<T: Any + Send + Sync>(&self, data: T) -> FsmResult<()> {
        self.core.do_action(Some(Payload::new(data)))
    }

    pub fn current_state(&self) -> State {
        self.core.current_state()
    }

    pub fn current_state_container(&self) -> StateContainer {
        self.core.current_container().clone()
    }

    /// Started and not yet in the final state.
    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn has_finished(&self) -> bool {
        self.core.has_finished()
    }

    /// Current state of this machine and of all running sub-machines.
    pub fn current_state_tree(&self) -> StateTreeNode {
        self.core.current_state_tree()
    }

    pub fn current_state_container_tree(&self) -> StateContainerTreeNode {
        self.core.current_state_container_tree()
    }

    /// All containers of the machine, including inferred ones and the final one.
    pub fn states(&self) -> Vec<StateContainer> {
        self.core.containers().cloned().collect()
    }

    /// Serializable description of the machine's structure.
    pub fn describe(&self) -> MachineInfo {
        MachineInfo::from_core(&self.core)
    }

    pub fn on_state_changed<F>(&self, listener: F)
    where
        F: Fn(&StateChanged) + Send + Sync + 'static,
    {
        self.core.listeners().add_state_changed(Arc::new(listener));
    }

    pub fn on_triggered<F>(&self, listener: F)
    where
        F: Fn(&Triggered) + Send + Sync + 'static,
    {
        self.core.listeners().add_triggered(Arc::new(listener));
    }

    /// Operations meant for tests and warm restarts.
    pub fn debug(&self) -> DebugInterface<'_> {
        DebugInterface::new(&self.core)
    }

    // Used by the containers of a parent machine.

    pub(crate) fn start_nested(&self, payload: Option<Payload>) -> FsmResult<()> {
        self.core.start(payload)
    }

    pub(crate) fn trigger_nested(&self, event: &Event) -> FsmResult<bool> {
        self.core.trigger_nested(event)
    }

    pub(crate) fn restart_current(&self, event: &Event) -> FsmResult<()> {
        self.core.restart_current(event)
    }
}

impl fmt::Display for FsmSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for FsmSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmSync")
            .field("name", &self.name())
            .field("current", &self.current_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FsmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    static NEXT: EventKind = EventKind::new("Next");
    static OTHER: EventKind = EventKind::new("Other");

    fn two_states() -> (State, State, FsmSync) {
        let a = State::new("A");
        let b = State::new("B");
        let fsm = FsmSync::of("ab", a.on(&NEXT, &b), [b.on_final(&NEXT)]).unwrap();
        (a, b, fsm)
    }

    #[test]
    fn runs_to_the_final_state() {
        let (_, b, fsm) = two_states();

        fsm.start().unwrap();
        assert!(fsm.trigger(&NEXT).unwrap());
        assert_eq!(fsm.current_state(), b);
        assert!(fsm.is_running());

        assert!(!fsm.trigger(&NEXT).unwrap());
        assert_eq!(fsm.current_state(), State::final_state());
        assert!(fsm.has_finished());
        assert!(!fsm.is_running());
    }

    #[test]
    fn finished_machine_rejects_triggers() {
        let (_, _, fsm) = two_states();
        fsm.start().unwrap();
        fsm.trigger(&NEXT).unwrap();
        fsm.trigger(&NEXT).unwrap();

        assert!(matches!(
            fsm.trigger(&NEXT),
            Err(FsmError::Finished { .. })
        ));
    }

    #[test]
    fn unstarted_machine_does_not_handle_events() {
        let (_, _, fsm) = two_states();

        assert!(!fsm.trigger(&NEXT).unwrap());
        assert!(fsm.current_state().is_initial());
    }

    #[test]
    fn reserved_events_are_rejected() {
        let (_, _, fsm) = two_states();
        fsm.start().unwrap();

        for kind in [&crate::core::NO_EVENT, &crate::core::START_EVENT] {
            assert!(matches!(
                fsm.trigger(kind),
                Err(FsmError::ReservedEvent { .. })
            ));
        }
    }

    #[test]
    fn unknown_event_is_not_handled() {
        let (a, _, fsm) = two_states();
        fsm.start().unwrap();

        assert!(!fsm.trigger(&OTHER).unwrap());
        assert_eq!(fsm.current_state(), a);
    }

    #[test]
    fn restart_returns_to_the_start_state() {
        let (a, _, fsm) = two_states();
        fsm.start().unwrap();
        fsm.trigger(&NEXT).unwrap();

        fsm.start().unwrap();

        assert_eq!(fsm.current_state(), a);
    }

    #[test]
    fn start_payload_reaches_the_entry_action() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let a = State::new("A");
        let fsm = FsmSync::of(
            "payload",
            a.to_container()
                .entry_with(move |n: Option<&i32>| *sink.lock().unwrap() = n.copied()),
            [],
        )
        .unwrap();

        fsm.start_with(42_i32).unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(42));
    }

    #[test]
    fn do_action_fires_in_the_current_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let a = State::new("A");
        let fsm = FsmSync::of(
            "do",
            a.do_in_state(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            [],
        )
        .unwrap();

        fsm.do_action().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        fsm.start().unwrap();
        fsm.do_action().unwrap();
        fsm.do_action_with("ignored").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn notifications_report_every_step() {
        let (a, b, fsm) = two_states();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let triggers = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&changes);
        let t = Arc::clone(&triggers);
        fsm.on_state_changed(move |info| {
            c.lock()
                .unwrap()
                .push((info.old_state.name().to_string(), info.new_state.name().to_string()));
        });
        fsm.on_triggered(move |info| {
            t.lock()
                .unwrap()
                .push((info.state.name().to_string(), info.event.name(), info.handled));
        });

        fsm.start().unwrap();
        fsm.trigger(&OTHER).unwrap();
        fsm.trigger(&NEXT).unwrap();

        assert_eq!(
            *changes.lock().unwrap(),
            vec![
                ("Initial".to_string(), a.name().to_string()),
                (a.name().to_string(), b.name().to_string()),
            ]
        );
        assert_eq!(
            *triggers.lock().unwrap(),
            vec![
                ("Initial".to_string(), "StartEvent", true),
                ("A".to_string(), "Other", false),
                ("A".to_string(), "Next", true),
            ]
        );
    }

    #[test]
    fn listener_panic_surfaces_as_observer_error() {
        let (_, _, fsm) = two_states();
        fsm.on_state_changed(|_| panic!("observer broke"));

        assert!(matches!(
            fsm.start(),
            Err(FsmError::Observer {
                observer: "on_state_changed",
                ..
            })
        ));
    }

    #[test]
    fn clones_share_the_machine() {
        let (_, b, fsm) = two_states();
        let other = fsm.clone();

        fsm.start().unwrap();
        other.trigger(&NEXT).unwrap();

        assert_eq!(fsm.current_state(), b);
        assert_eq!(fsm.id(), other.id());
    }
}
