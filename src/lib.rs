//! hfsm: A hierarchical finite state machine engine
//!
//! Machines are built from immutable state containers. A container binds a
//! state to its guarded transitions, its entry, exit and do-in-state actions,
//! and optionally to nested sub-machines, which turns the state into a
//! composite state. Composite states can be re-entered fresh, with shallow
//! history or with deep history.
//!
//! # Core Concepts
//!
//! - **Events**: A static kind (kinds may derive from other kinds) plus an optional typed payload
//! - **States**: Reference identity; every final state equals every other final state
//! - **Transitions**: Evaluated in declaration order, the first allowed one fires
//! - **Machines**: [`FsmSync`] dispatches on the caller's thread, [`FsmAsync`]
//!   queues events and applies them in order once started
//!
//! # Example
//!
//! ```rust
//! use hfsm::core::State;
//! use hfsm::{event_kinds, FsmSync};
//!
//! event_kinds! {
//!     STEP = "Step";
//!     DONE = "Done";
//! }
//!
//! // a sub-machine with a single state that finishes on DONE
//! let task = State::new("Task");
//! let worker = FsmSync::of("worker", task.on_final(&DONE), []).unwrap();
//!
//! // the composite moves on automatically once the sub-machine finished
//! let working = State::composite("Working", [worker]);
//! let idle = State::new("Idle");
//! let fsm = FsmSync::of(
//!     "main",
//!     idle.on(&STEP, &working),
//!     [working.on_completion(&idle)],
//! )
//! .unwrap();
//!
//! fsm.start().unwrap();
//! fsm.trigger(&STEP).unwrap();
//! assert_eq!(fsm.current_state_tree().to_string(), "Working[Task]");
//!
//! fsm.trigger(&DONE).unwrap();
//! assert_eq!(fsm.current_state(), idle);
//! ```

pub mod builder;
pub mod core;
pub mod describe;
pub mod machine;

// Re-export commonly used types
pub use builder::FsmBuilder;
pub use core::{
    Action, Event, EventKind, FsmError, FsmResult, Guard, History, State, StateContainer,
    Transition,
};
pub use machine::{FsmAsync, FsmDebug, FsmSync};
