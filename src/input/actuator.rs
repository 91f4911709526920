//! Timed key press synthesis
//!
//! Single presses, modifier combos and macro playback, with millisecond
//! pre/hold/post delays around each transition.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{KeyTiming, MacroAction};
use crate::error::{EngineError, Result};

use super::backend::KeyboardBackend;

/// Modifier keys recognized in combo strings, tested case-insensitively
fn is_modifier(key: &str) -> bool {
    matches!(key, "shift" | "alt" | "ctrl" | "control")
}

fn sleep_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Synthesizes key presses through a [`KeyboardBackend`].
///
/// All methods block for the configured delays and run to completion; an
/// in-flight sequence is never interrupted, otherwise a half-pressed
/// modifier could stay stuck in the target application.
#[derive(Clone)]
pub struct Actuator {
    backend: Arc<dyn KeyboardBackend>,
}

impl Actuator {
    pub fn new(backend: Arc<dyn KeyboardBackend>) -> Self {
        Self { backend }
    }

    /// Wait `pre_delay`, hold `key` down for `hold_time`, release, then wait
    /// `post_delay`. Zero delays are skipped entirely.
    pub fn press_with_timing(&self, key: &str, timing: &KeyTiming) -> Result<()> {
        sleep_ms(timing.pre_delay);

        self.backend.key_down(key).map_err(EngineError::Input)?;
        sleep_ms(timing.hold_time);
        self.backend.key_up(key).map_err(EngineError::Input)?;

        sleep_ms(timing.post_delay);
        Ok(())
    }

    /// Press a combo such as `"shift+ctrl+a"`.
    ///
    /// Modifiers go down in listed order before any regular key, each
    /// regular key is held for `hold_time` individually, and modifiers are
    /// released in reverse order so the receiving application sees a
    /// properly qualified combination. `pre_delay`/`post_delay` apply once
    /// around the whole sequence.
    pub fn press_combo(&self, key_combo: &str, timing: &KeyTiming) -> Result<()> {
        let keys: Vec<String> = key_combo
            .split('+')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let (modifiers, regular): (Vec<&String>, Vec<&String>) =
            keys.iter().partition(|k| is_modifier(k));

        sleep_ms(timing.pre_delay);

        for modifier in &modifiers {
            self.backend.key_down(modifier).map_err(EngineError::Input)?;
        }

        for key in &regular {
            self.backend.key_down(key).map_err(EngineError::Input)?;
            sleep_ms(timing.hold_time);
            self.backend.key_up(key).map_err(EngineError::Input)?;
        }

        for modifier in modifiers.iter().rev() {
            self.backend.key_up(modifier).map_err(EngineError::Input)?;
        }

        sleep_ms(timing.post_delay);
        Ok(())
    }

    /// Play back a macro strictly in order.
    ///
    /// No delays are inserted beyond explicit `sleep` steps; timing fidelity
    /// belongs to the macro author (recorders materialize gaps as `sleep`).
    pub fn execute_macro(&self, actions: &[MacroAction]) -> Result<()> {
        for action in actions {
            match action {
                MacroAction::KeyDown { key } => {
                    self.backend.key_down(key).map_err(EngineError::Input)?;
                }
                MacroAction::KeyUp { key } => {
                    self.backend.key_up(key).map_err(EngineError::Input)?;
                }
                MacroAction::KeyPress { key } => {
                    self.backend.key_down(key).map_err(EngineError::Input)?;
                    self.backend.key_up(key).map_err(EngineError::Input)?;
                }
                MacroAction::Sleep { ms } => sleep_ms(*ms),
            }
        }
        Ok(())
    }
}
