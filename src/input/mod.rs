//! Input synthesis: keyboard backends, the timed actuator and macro recording

pub mod actuator;
pub mod backend;
pub mod recorder;

#[cfg(feature = "inject")]
pub mod enigo_backend;

pub use actuator::Actuator;
pub use backend::{FailingKeyboard, KeyEvent, KeyEventKind, KeyboardBackend, RecordingKeyboard};
pub use recorder::MacroRecorder;

#[cfg(feature = "inject")]
pub use enigo_backend::EnigoKeyboard;
