// Central Error Type for the Application

use crate::domain::TaskId;
use thiserror::Error;

/// Application-level error type
///
/// Only conditions that are defects in the caller's setup end up here: a
/// malformed job specification or missing test-mode mocks. Failures of the
/// job itself become the specification's failure outcome instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No mocked result or scripted test registered for task {0}")]
    MockNotConfigured(TaskId),

    #[error("Mocked result for task {task_id} is not a {expected}")]
    MockTypeMismatch {
        task_id: TaskId,
        expected: &'static str,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
