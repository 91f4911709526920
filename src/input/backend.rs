//! Keyboard backend abstraction
//!
//! The actuator talks to the OS through this seam so the timing and ordering
//! logic can run against a recording double in tests.

use std::time::Instant;

use parking_lot::Mutex;

/// Injects key events by key name ("a", "f1", "shift", "space", ...).
///
/// Implementations must be shareable across worker threads; the actuator
/// never retries, so a failed injection surfaces to the caller as-is.
pub trait KeyboardBackend: Send + Sync {
    fn key_down(&self, key: &str) -> anyhow::Result<()>;
    fn key_up(&self, key: &str) -> anyhow::Result<()>;
}

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// One recorded key transition with its wall-clock timestamp
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: String,
    pub kind: KeyEventKind,
    pub at: Instant,
}

/// Backend double that records events instead of injecting them.
///
/// Used by the test suite and for dry runs; timestamps allow asserting the
/// delays the actuator inserted between transitions.
#[derive(Default)]
pub struct RecordingKeyboard {
    events: Mutex<Vec<KeyEvent>>,
}

impl RecordingKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }

    /// Recorded transitions as `("a", Down)` pairs, for ordering assertions
    pub fn sequence(&self) -> Vec<(String, KeyEventKind)> {
        self.events
            .lock()
            .iter()
            .map(|e| (e.key.clone(), e.kind))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, key: &str, kind: KeyEventKind) {
        self.events.lock().push(KeyEvent {
            key: key.to_string(),
            kind,
            at: Instant::now(),
        });
    }
}

impl KeyboardBackend for RecordingKeyboard {
    fn key_down(&self, key: &str) -> anyhow::Result<()> {
        self.record(key, KeyEventKind::Down);
        Ok(())
    }

    fn key_up(&self, key: &str) -> anyhow::Result<()> {
        self.record(key, KeyEventKind::Up);
        Ok(())
    }
}

/// Backend double whose injections always fail, for error-path tests
pub struct FailingKeyboard;

impl KeyboardBackend for FailingKeyboard {
    fn key_down(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("injection refused for '{key}'")
    }

    fn key_up(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("injection refused for '{key}'")
    }
}
