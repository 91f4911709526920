//! The per-group detection worker and its message protocol

pub mod messages;

mod runner;

pub use messages::{RunState, StatusEvent, WorkerCommand};
pub use runner::{run_group_worker, WorkerContext};
