//! Input validation for message and upload requests.
//!
//! Every check runs before a task is created, so a rejected request never
//! leaves anything in the registry.

mod constants;
mod message;
mod url;

pub use constants::*;
pub use message::{MessageFields, validate_message_fields};
pub use url::{UrlPolicy, archive_filename, validate_archive_url, validate_conversation_url};

/// Validation error with details about what failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of validation - either Ok or a list of errors.
pub type ValidationResult = Result<(), Vec<ValidationError>>;
