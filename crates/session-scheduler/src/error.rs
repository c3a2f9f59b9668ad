//! Error types for session-scheduler operations.

use thiserror::Error;

/// Error returned by a [`ConflictCheck`](crate::detector::ConflictCheck) implementation
/// when it cannot answer (storage down, network failure, ...).
pub type CheckError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Rule fields are inconsistent with the rule type.
    #[error("Malformed recurrence: {0}")]
    MalformedRecurrence(String),

    /// The first-occurrence window is empty or inverted.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The conflict-check collaborator failed to respond. Never retried here.
    #[error("Conflict check unavailable: {0}")]
    CollaboratorUnavailable(#[source] CheckError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
