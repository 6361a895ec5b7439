//! Running machines.
//!
//! Both machine kinds share one engine: construction and validation of the
//! container set, event dispatch, state activation and notifications. They
//! differ only in how triggers reach the engine:
//! - [`FsmSync`] dispatches on the calling thread under a per-machine lock
//! - [`FsmAsync`] queues triggers and applies them in order on a tokio runtime
//!
//! Sub-machines of composite states are always [`FsmSync`]; they run inside
//! the dispatch of their parent.

mod asynchronous;
mod debug;
mod engine;
mod notify;
mod sync;
mod validation;

pub use asynchronous::{FsmAsync, TriggerTicket};
pub use debug::{DebugInterface, FsmDebug};
pub(crate) use engine::FsmCore;
pub use notify::{StateChanged, Triggered};
pub use sync::FsmSync;
