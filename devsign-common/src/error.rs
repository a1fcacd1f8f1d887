//! Common error types for devsign

use thiserror::Error;

use crate::models::{ArtifactSlot, PeriodState};

/// Common result type for devsign operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the submission engine and its HTTP surface
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown member, window, or artifact path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed window set, empty title, rejected upload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Write attempted while the window does not accept submissions
    #[error("Window {window} does not accept submissions (state: {state})")]
    NotSubmittable { window: String, state: PeriodState },

    /// First submission for an identity is missing mandatory slots
    #[error("Incomplete submission: missing {}", format_slots(.missing))]
    IncompleteSubmission { missing: Vec<ArtifactSlot> },

    /// Batch export resolved zero artifacts
    #[error("Export of {window} resolved no artifacts")]
    EmptyExport { window: String },

    /// Archive writer failure
    #[error("Archive error: {0}")]
    Archive(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_slots(slots: &[ArtifactSlot]) -> String {
    slots
        .iter()
        .map(|slot| slot.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
