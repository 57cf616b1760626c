//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::ports::LockError;

/// Publication errors - rejected authoring intents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublicationError {
    #[error("Invalid schedule time {input:?}: {reason}")]
    InvalidScheduleTime { input: String, reason: String },
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Errors that abort a whole runner invocation.
///
/// Per-post failures never surface here, they are reported in the run report.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to select due posts: {0}")]
    Selection(#[source] RepoError),

    #[error("Another publication run is in progress")]
    AlreadyRunning,

    #[error("Run lock unavailable: {0}")]
    Lock(#[from] LockError),
}

/// Errors raised by authoring actions.
#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error(transparent)]
    Publication(#[from] PublicationError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("Post not found: {0}")]
    NotFound(Uuid),
}

/// A stored status string that is neither `draft` nor `published`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown post status: {0}")]
pub struct UnknownStatus(pub String);
