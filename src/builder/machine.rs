//! Builder for constructing machines.

use crate::core::{FsmError, FsmResult, StateContainer};
use crate::machine::{FsmAsync, FsmCore, FsmSync};
use tokio::runtime::Handle;

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```
/// use hfsm::builder::FsmBuilder;
/// use hfsm::core::{EventKind, State};
///
/// static NEXT: EventKind = EventKind::new("Next");
///
/// let red = State::new("Red");
/// let green = State::new("Green");
///
/// let fsm = FsmBuilder::new("lights")
///     .start(red.on(&NEXT, &green))
///     .state(green.on(&NEXT, &red))
///     .build_sync()
///     .unwrap();
///
/// fsm.start().unwrap();
/// assert_eq!(fsm.current_state(), red);
/// ```
pub struct FsmBuilder {
    name: String,
    start: Option<StateContainer>,
    states: Vec<StateContainer>,
    runtime: Option<Handle>,
}

impl FsmBuilder {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            states: Vec::new(),
            runtime: None,
        }
    }

    /// Set the start state (required).
    pub fn start(mut self, container: impl Into<StateContainer>) -> Self {
        self.start = Some(container.into());
        self
    }

    /// Add another state.
    pub fn state(mut self, container: impl Into<StateContainer>) -> Self {
        self.states.push(container.into());
        self
    }

    /// Add multiple states at once.
    pub fn states(mut self, containers: impl IntoIterator<Item = StateContainer>) -> Self {
        self.states.extend(containers);
        self
    }

    /// Runtime for an asynchronous machine. Defaults to the runtime the
    /// machine is built on.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    fn into_core(self) -> FsmResult<(FsmCore, Option<Handle>)> {
        let start = self.start.ok_or_else(|| FsmError::MissingStartState {
            machine: self.name.clone(),
        })?;
        let core = FsmCore::new(self.name, start, self.states)?;
        Ok((core, self.runtime))
    }

    /// Build a synchronous machine.
    pub fn build_sync(self) -> FsmResult<FsmSync> {
        let (core, _) = self.into_core()?;
        Ok(FsmSync::from_core(core))
    }

    /// Build an asynchronous machine.
    /// Fails outside a tokio runtime unless one was given via [`runtime`](Self::runtime).
    pub fn build_async(self) -> FsmResult<FsmAsync> {
        let (core, runtime) = self.into_core()?;
        FsmAsync::from_core(core, runtime)
    }
}
