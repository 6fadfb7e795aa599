//! Retry-adaptive task dispatch.
//!
//! [`DispatchQueue`] executes tasks against a [`crate::transport::Transport`]
//! under an adaptive concurrency ceiling kept in [`QueueState`].

pub mod queue;
pub mod state;

pub use queue::{DispatchQueue, QueueStats, TaskId};
pub use state::QueueState;
