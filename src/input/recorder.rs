//! Macro recording from timestamped key events
//!
//! Gaps between consecutive events are materialized as explicit `sleep`
//! actions, so playback never needs wall-clock awareness of its own.

use std::time::Instant;

use crate::config::MacroAction;

use super::backend::KeyEventKind;

/// Gaps at or below this many milliseconds are treated as simultaneous
const MIN_GAP_MS: u64 = 5;

/// Builds a macro action list from a stream of key transitions.
///
/// Feed it physical key events as they arrive; `finish` yields the sequence
/// the actuator can replay verbatim.
#[derive(Debug, Default)]
pub struct MacroRecorder {
    actions: Vec<MacroAction>,
    last_event: Option<Instant>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one key transition observed at `at`
    pub fn record(&mut self, kind: KeyEventKind, key: &str, at: Instant) {
        if let Some(last) = self.last_event {
            let gap_ms = at.saturating_duration_since(last).as_millis() as u64;
            if gap_ms > MIN_GAP_MS {
                self.actions.push(MacroAction::Sleep { ms: gap_ms });
            }
        }

        let key = key.to_lowercase();
        self.actions.push(match kind {
            KeyEventKind::Down => MacroAction::KeyDown { key },
            KeyEventKind::Up => MacroAction::KeyUp { key },
        });

        self.last_event = Some(at);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Discard everything recorded so far
    pub fn clear(&mut self) {
        self.actions.clear();
        self.last_event = None;
    }

    /// Consume the recorder and return the recorded sequence
    pub fn finish(self) -> Vec<MacroAction> {
        self.actions
    }
}
