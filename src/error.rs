//! Error types for the interface actions service.
//!
//! This module defines strongly-typed errors for better error handling
//! and more informative error messages.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::{download::DownloadError, driver::DriverError, session::SessionError};

/// Main error type for task operations.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    /// Invalid task state for operation
    #[error("Invalid task state: {message}")]
    InvalidState { message: String },

    /// Concurrency cap reached
    #[error("concurrency limit reached ({limit} tasks running)")]
    CapacityReached { limit: usize },

    /// Background queue is full
    #[error("task queue is full")]
    QueueFull,

    /// Execution exceeded the caller supplied timeout
    #[error("task timed out after {0}s")]
    Timeout(u64),

    /// Execution interrupted by a cancellation request
    #[error("task cancelled: {0}")]
    Cancelled(String),

    /// Browser driver failure
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Archive download failure
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Session resolution failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Internal error (unexpected)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error type for API operations (converts to HTTP responses).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }))
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::TaskNotFound(id) => ApiError::NotFound(format!("Task {} not found", id)),
            TaskError::InvalidState { message } => ApiError::Conflict(message),
            e @ (TaskError::CapacityReached { .. } | TaskError::QueueFull) => {
                ApiError::TooManyRequests(e.to_string())
            }
            _ => {
                log::error!("Internal error: {}", err);
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

/// Result type alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;
