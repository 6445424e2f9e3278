//! # Workshop Errors
//!
//! Unified error taxonomy for the publishing core.
//!
//! Every operation surfaces one of these variants; the HTTP layer maps them
//! via `status_code()`. Search-backend unavailability is deliberately NOT an
//! error — `search` degrades instead (see `search::SearchResults`).

use thiserror::Error;

/// Result type for workshop operations
pub type WorkshopResult<T> = Result<T, WorkshopError>;

/// Errors surfaced by the publishing core
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkshopError {
    /// Collection, version, or subscription does not exist.
    ///
    /// Also returned for private collections the caller cannot read, so the
    /// response never reveals whether the resource exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input; names the offending field.
    #[error("Validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Caller lacks the capability the operation requires.
    #[error("Not authorized")]
    NotAuthorized,

    /// A structural invariant would be violated (e.g. demoting the sole owner).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Primary store failure. Fatal: no consistency can be guaranteed, so
    /// this propagates uncaught.
    #[error("Store error: {0}")]
    Store(String),
}

impl WorkshopError {
    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a validation error naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// HTTP-equivalent status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation { .. } => 400,
            Self::NotAuthorized => 403,
            Self::Conflict(_) => 409,
            Self::Store(_) => 500,
        }
    }

    /// Whether this error should be logged at warn level rather than error
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WorkshopError::not_found("collection").status_code(), 404);
        assert_eq!(WorkshopError::validation("name", "empty").status_code(), 400);
        assert_eq!(WorkshopError::NotAuthorized.status_code(), 403);
        assert_eq!(WorkshopError::conflict("sole owner").status_code(), 409);
        assert_eq!(WorkshopError::store("down").status_code(), 500);
    }

    #[test]
    fn test_not_authorized_message_does_not_leak() {
        // The message must not mention the resource at all.
        let err = WorkshopError::NotAuthorized;
        assert_eq!(err.to_string(), "Not authorized");
    }

    #[test]
    fn test_validation_names_field() {
        let err = WorkshopError::validation("alias_set", "duplicate name `heal`");
        assert!(err.to_string().contains("alias_set"));
        assert!(err.is_client_error());
    }
}
