//! Error types for the automation engine

use std::fmt;

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the engine API
#[derive(Debug, Error)]
pub enum EngineError {
    /// The coordinator already has live workers
    #[error("coordinator already running")]
    AlreadyRunning,

    /// One or more startup preconditions failed; no workers were spawned
    #[error("{0}")]
    Validation(ValidationReport),

    /// A rectangle with non-positive width or height
    #[error("invalid region [{left}, {top}, {right}, {bottom}]: right must exceed left and bottom must exceed top")]
    InvalidRegion {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },

    /// Key injection failed in the input backend
    #[error("input injection failed: {0}")]
    Input(#[source] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single startup precondition violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// No group in the configuration is enabled
    NoEnabledGroups,
    /// The same toggle key is assigned to more than one enabled group
    HotkeyCollision { key: String, groups: Vec<String> },
    /// An enabled template references an image file that does not exist
    MissingTemplateImage {
        group: String,
        template: String,
        file: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoEnabledGroups => write!(f, "no enabled groups"),
            ValidationIssue::HotkeyCollision { key, groups } => {
                write!(
                    f,
                    "toggle key '{}' is shared by groups: {}",
                    key,
                    groups.join(", ")
                )
            }
            ValidationIssue::MissingTemplateImage {
                group,
                template,
                file,
            } => {
                if file.is_empty() {
                    write!(f, "group '{}': template '{}' has no image file", group, template)
                } else {
                    write!(
                        f,
                        "group '{}': template '{}' image not found ({})",
                        group, template, file
                    )
                }
            }
        }
    }
}

/// Aggregated report of every violation found before start.
///
/// All violations are collected in one pass so the caller sees the full
/// picture instead of fixing them one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "startup validation failed:")?;
        for issue in &self.issues {
            writeln!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}
