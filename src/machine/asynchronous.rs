//! The asynchronous machine.
//!
//! Each trigger becomes a unit of work on a tokio runtime. Units form a
//! chain: a unit first waits for its predecessor, then for the start gate,
//! and only then dispatches the event on the blocking pool. The gate has no
//! permit until the machine is started, so events sent early are kept in
//! order and applied once `start` ran.

use super::debug::DebugInterface;
use super::engine::FsmCore;
use super::notify::{StateChanged, Triggered};
use crate::core::{
    Event, EventKind, FsmError, FsmResult, Payload, State, StateContainer,
    StateContainerTreeNode, StateTreeNode,
};
use crate::describe::MachineInfo;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

type Work = Box<dyn FnOnce(&FsmCore) -> FsmResult<bool> + Send>;

struct Queue {
    runtime: Handle,
    gate: Arc<Semaphore>,
    opened: AtomicBool,
    tail: Mutex<Option<JoinHandle<()>>>,
    last_error: Mutex<Option<Arc<FsmError>>>,
}

impl Queue {
    fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            gate: Arc::new(Semaphore::new(0)),
            opened: AtomicBool::new(false),
            tail: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    fn open(&self) {
        if !self.opened.swap(true, Ordering::SeqCst) {
            self.gate.add_permits(1);
        }
    }

    fn tail(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.tail.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record_error(&self, err: FsmError) -> Arc<FsmError> {
        let err = Arc::new(err);
        *self.last_error.lock().unwrap_or_else(|p| p.into_inner()) = Some(Arc::clone(&err));
        err
    }

    fn last_error(&self) -> Option<Arc<FsmError>> {
        self.last_error
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// Outcome of a queued trigger, available once the event has been processed.
pub struct TriggerTicket {
    machine: String,
    receiver: oneshot::Receiver<Result<bool, Arc<FsmError>>>,
}

impl TriggerTicket {
    /// Wait for the event to be processed and return whether it was handled.
    ///
    /// Never resolves while the machine has not been started.
    pub async fn outcome(self) -> Result<bool, Arc<FsmError>> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Arc::new(FsmError::Abandoned {
                machine: self.machine,
            })),
        }
    }
}

/// A state machine processing events in the background, one at a time, in
/// the order they were sent.
///
/// [`trigger`](FsmAsync::trigger) returns at once; the real result is
/// reported through the triggered notification, through a
/// [`TriggerTicket`], and (for failures) through
/// [`last_error`](FsmAsync::last_error).
///
/// # Example
///
/// ```rust
/// use hfsm::core::{EventKind, State};
/// use hfsm::machine::FsmAsync;
///
/// static NEXT: EventKind = EventKind::new("Next");
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let a = State::new("A");
///     let b = State::new("B");
///     let fsm = FsmAsync::of("ab", a.on(&NEXT, &b), [b.to_container()]).unwrap();
///
///     // queued until the machine is started
///     fsm.trigger(&NEXT).unwrap();
///     fsm.start().unwrap();
///     fsm.settle().await;
///
///     assert_eq!(fsm.current_state(), b);
/// });
/// ```
#[derive(Clone)]
pub struct FsmAsync {
    core: Arc<FsmCore>,
    queue: Arc<Queue>,
}

impl FsmAsync {
    pub(crate) fn from_core(core: FsmCore, runtime: Option<Handle>) -> FsmResult<Self> {
        let runtime = match runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| FsmError::NoRuntime {
                machine: core.name().to_string(),
            })?,
        };
        Ok(Self {
            core: Arc::new(core),
            queue: Arc::new(Queue::new(runtime)),
        })
    }

    /// Build a machine on the current tokio runtime.
    pub fn of(
        name: impl Into<String>,
        start: impl Into<StateContainer>,
        others: impl IntoIterator<Item = StateContainer>,
    ) -> FsmResult<Self> {
        let core = FsmCore::new(name, start.into(), others.into_iter().collect())?;
        Self::from_core(core, None)
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn id(&self) -> Uuid {
        self.core.id()
    }

    /// Move to the start state on the calling thread, then release the
    /// queued events. A failed start keeps the queue closed.
    pub fn start(&self) -> FsmResult<()> {
        self.core.start(None)?;
        self.queue.open();
        Ok(())
    }

    pub fn start_with<T: Any + Send + Sync>(&self, data: T) -> FsmResult<()> {
        self.core.start(Some(Payload::new(data)))?;
        self.queue.open();
        Ok(())
    }

    /// Queue `event`. Always `Ok(true)` unless the event kind is reserved.
    pub fn trigger(&self, event: impl Into<Event>) -> FsmResult<bool> {
        let event = event.into();
        self.reject_reserved(&event)?;
        drop(self.enqueue(Box::new(move |core| core.trigger(&event))));
        Ok(true)
    }

    pub fn trigger_with<T: Any + Send + Sync>(
        &self,
        kind: &'static EventKind,
        data: T,
    ) -> FsmResult<bool> {
        self.trigger(Event::with_payload(kind, data))
    }

    /// Queue `event` and get a ticket resolving to its outcome.
    pub fn trigger_with_ticket(&self, event: impl Into<Event>) -> FsmResult<TriggerTicket> {
        let event = event.into();
        self.reject_reserved(&event)?;
        let receiver = self.enqueue(Box::new(move |core| core.trigger(&event)));
        Ok(TriggerTicket {
            machine: self.name().to_string(),
            receiver,
        })
    }

    /// Wait until every event queued so far has been processed.
    ///
    /// Never resolves while the machine has not been started.
    pub async fn settle(&self) {
        let receiver = self.enqueue(Box::new(|_| Ok(true)));
        let _ = receiver.await;
    }

    /// The most recent failure of a queued trigger.
    pub fn last_error(&self) -> Option<Arc<FsmError>> {
        self.queue.last_error()
    }

    fn reject_reserved(&self, event: &Event) -> FsmResult<()> {
        if event.kind().is_reserved() {
            return Err(FsmError::ReservedEvent {
                machine: self.name().to_string(),
                kind: event.name(),
            });
        }
        Ok(())
    }

    fn enqueue(&self, work: Work) -> oneshot::Receiver<Result<bool, Arc<FsmError>>> {
        let (sender, receiver) = oneshot::channel();
        let core = Arc::clone(&self.core);
        let queue = Arc::clone(&self.queue);

        let mut tail = self.queue.tail();
        let previous = tail.take();
        let unit = self.queue.runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let Ok(_permit) = Arc::clone(&queue.gate).acquire_owned().await else {
                return;
            };

            let machine = core.name().to_string();
            let outcome = match queue.runtime.spawn_blocking(move || work(&core)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FsmError::Abandoned {
                    machine: machine.clone(),
                }),
            };

            let outcome = outcome.map_err(|err| {
                error!(machine = %machine, error = %err, "queued trigger failed");
                queue.record_error(err)
            });
            let _ = sender.send(outcome);
        });
        *tail = Some(unit);

        receiver
    }

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

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn has_finished(&self) -> bool {
        self.core.has_finished()
    }

    pub fn current_state_tree(&self) -> StateTreeNode {
        self.core.current_state_tree()
    }

    pub fn current_state_container_tree(&self) -> StateContainerTreeNode {
        self.core.current_state_container_tree()
    }

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

    /// Operations meant for tests and warm restarts. `trigger_sync` bypasses
    /// the queue.
    pub fn debug(&self) -> DebugInterface<'_> {
        DebugInterface::new(&self.core)
    }
}

impl fmt::Debug for FsmAsync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmAsync")
            .field("name", &self.name())
            .field("current", &self.current_state())
            .field("started", &self.queue.opened.load(Ordering::SeqCst))
            .finish()
    }
}
