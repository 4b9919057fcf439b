use std::fmt;

use thiserror::Error;

/// Failure reported by one of the backend collaborators.
///
/// `code` is a machine readable `<service>/<reason>` string such as
/// `auth/invalid-credential` or `storage/object-not-found`. Authentication
/// flows surface either the code or the message to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl AsRef<str>) -> Self {
        let code = code.into();
        let message = format!("{} ({code})", message.as_ref());
        Self { code, message }
    }

    pub fn not_found(service: &str, what: impl fmt::Display) -> Self {
        Self::new(format!("{service}/not-found"), format!("{what} does not exist"))
    }

    /// Returns the part of the code after the service prefix.
    pub fn reason(&self) -> &str {
        self.code.split_once('/').map(|(_, reason)| reason).unwrap_or(&self.code)
    }
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        let reason = match err.kind() {
            redis::ErrorKind::IoError => "unavailable",
            redis::ErrorKind::AuthenticationFailed => "unauthenticated",
            redis::ErrorKind::TypeError => "data-loss",
            _ => "internal",
        };
        Self::new(format!("redis/{reason}"), format!("redis error: {err}"))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::new("documents/malformed", format!("malformed document: {err}"))
    }
}

/// Top-level error type returned by the chirp library.
#[derive(Debug, Error)]
pub enum ChirpError {
    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// A backend collaborator rejected the call.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration could not be read or resolved.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The acting identity is not allowed to perform the action.
    #[error("not allowed to {action}")]
    Unauthorized { action: &'static str },

    /// Target post was not found.
    #[error("post not found")]
    NotFound { id: Option<String> },
}

/// Collection of validation issues encountered while preparing a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// True when any issue carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// First user-facing message, used for inline alerts.
    pub fn first_message(&self) -> Option<&str> {
        self.issues.first().map(|issue| issue.message.as_str())
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
