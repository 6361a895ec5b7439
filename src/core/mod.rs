//! Core building blocks of a state machine.
//!
//! This module contains everything that describes a machine and the
//! algorithms that run on a single level of the hierarchy:
//! - Events, event kinds and typed payloads
//! - Actions and guards wrapping user callbacks
//! - States, history modes and transition endpoints
//! - Transitions and state containers
//!
//! Containers are immutable once built; running machines keep their mutable
//! data outside of them (see [`crate::machine`]).

mod action;
mod container;
mod error;
mod event;
mod guard;
mod history;
mod state;
mod transition;
mod tree;

pub use action::Action;
pub(crate) use container::ActiveChildren;
pub use container::{ChangeStateData, StateContainer};
pub use error::{CallbackError, FsmError, FsmResult};
pub use event::{Event, EventKind, Payload, NO_EVENT, START_EVENT};
pub use guard::Guard;
pub use history::{History, TransitionEndPoint};
pub use state::{State, StateKind};
pub use transition::Transition;
pub use tree::{StateContainerTreeNode, StateTreeNode};
