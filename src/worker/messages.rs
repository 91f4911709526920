//! Command and status message types
//!
//! The closed set of tagged messages exchanged between the coordinator and
//! its workers. Commands travel over one channel per group; status events
//! share a single channel back to the coordinator.

use serde::{Deserialize, Serialize};

/// Coordinator-to-worker command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WorkerCommand {
    /// Flip between idle and actively searching
    Toggle,
    /// Force idle; the worker process itself stays alive
    Stop,
}

/// A worker's search state as reported on the status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Worker is up, templates loaded, waiting for a toggle
    Ready,
    Running,
    Stopped,
}

/// Worker-to-coordinator status event, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StatusEvent {
    /// Search state change
    Status { group_id: String, status: RunState },
    /// A template fired (carries its name and evaluation time), or the
    /// follow-up that resets the indicator color once the action finished
    Match {
        group_id: String,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_ms: Option<f64>,
    },
    /// Periodic frame-rate report
    Fps {
        group_id: String,
        fps: f64,
        name: String,
    },
}

impl StatusEvent {
    pub fn group_id(&self) -> &str {
        match self {
            StatusEvent::Status { group_id, .. }
            | StatusEvent::Match { group_id, .. }
            | StatusEvent::Fps { group_id, .. } => group_id,
        }
    }
}
