//! Builder API for ergonomic machine construction.
//!
//! This module provides a fluent builder and a macro for declaring event
//! kinds, plus a helper for defining sub-machines inline.

pub mod machine;
pub mod macros;

pub use machine::FsmBuilder;

use crate::core::{FsmResult, StateContainer};
use crate::machine::FsmSync;

/// Build a sub-machine for a composite state.
///
/// # Example
///
/// ```
/// use hfsm::builder::sub_machine;
/// use hfsm::core::{EventKind, State};
///
/// static DONE: EventKind = EventKind::new("Done");
///
/// let inner = State::new("Inner");
/// let child = sub_machine("child", inner.on_final(&DONE), []).unwrap();
/// let parent = State::composite("Parent", [child]);
///
/// assert!(parent.is_composite());
/// ```
pub fn sub_machine(
    name: impl Into<String>,
    start: impl Into<StateContainer>,
    others: impl IntoIterator<Item = StateContainer>,
) -> FsmResult<FsmSync> {
    FsmSync::of(name, start, others)
}
