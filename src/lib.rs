//! Pixeltrigger
//!
//! A screen-region automation engine. User-defined groups each watch a
//! rectangle of the screen, compare live frames against saved image
//! templates, and fire timed key presses or recorded macros when a template
//! matches (or deliberately fails to match).
//!
//! Every enabled group runs as an isolated worker with its own capture
//! source, template set and toggle hotkey; a coordinator spawns and stops
//! workers, routes toggle commands by group id, and multiplexes their
//! status/FPS/match events into a single stream for the host UI.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pixeltrigger::{ConfigDocument, Coordinator};
//! use pixeltrigger::capture::ScreenCaptureBackend;
//! use pixeltrigger::input::EnigoKeyboard;
//!
//! let doc = ConfigDocument::load("config.json".as_ref())?;
//! let groups: Vec<_> = doc.all_groups().into_iter().cloned().collect();
//!
//! let mut coordinator = Coordinator::new(
//!     Arc::new(ScreenCaptureBackend),
//!     Arc::new(EnigoKeyboard::new()?),
//!     "images".into(),
//! );
//! coordinator.start(&groups)?;
//!
//! for event in coordinator.poll_status() {
//!     println!("{event:?}");
//! }
//! ```

pub mod capture;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hotkeys;
pub mod input;
pub mod matching;
pub mod worker;

// Re-export commonly used types
pub use capture::{CaptureBackend, CaptureSource};
pub use config::{
    ConfigDocument, ConfigItem, FolderConfig, GroupConfig, KeyTiming, MacroAction, Region,
    TemplateConfig, TriggerCondition,
};
pub use coordinator::Coordinator;
pub use error::{EngineError, Result, ValidationIssue, ValidationReport};
pub use hotkeys::HotkeyBindings;
pub use input::{Actuator, KeyboardBackend, MacroRecorder};
pub use matching::{LoadedTemplate, TemplateSet};
pub use worker::{run_group_worker, RunState, StatusEvent, WorkerCommand, WorkerContext};
