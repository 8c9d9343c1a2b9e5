//! Error types for the domain layer.
//!
//! Every failure that crosses the broker boundary is a [`DomainError`]: a
//! machine-readable [`ErrorCode`] plus a human-readable message. Codes fold
//! into the coarse [`ErrorKind`] taxonomy that callers branch on.

use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Coarse error taxonomy exposed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    InvalidInput,
    Conflict,
    StoreFailure,
    Internal,
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Not found errors
    SessionNotFound,
    ActivityNotFound,
    ChoiceNotFound,
    QuestionNotFound,

    // Authorization errors
    Unauthorized,

    // State errors
    InvalidState,

    // Input errors
    InvalidInput,
    InvalidChoice,
    UnknownActivityKind,

    // Conflicts
    SessionNameTaken,
    ActivityNameTaken,
    SessionCodeTaken,
    SessionAlreadyLive,

    // Infrastructure errors
    StoreFailure,
    Internal,
}

impl ErrorCode {
    /// Returns the taxonomy bucket this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::SessionNotFound
            | ErrorCode::ActivityNotFound
            | ErrorCode::ChoiceNotFound
            | ErrorCode::QuestionNotFound => ErrorKind::NotFound,
            ErrorCode::Unauthorized => ErrorKind::Unauthorized,
            ErrorCode::InvalidState => ErrorKind::InvalidState,
            ErrorCode::InvalidInput | ErrorCode::InvalidChoice | ErrorCode::UnknownActivityKind => {
                ErrorKind::InvalidInput
            }
            ErrorCode::SessionNameTaken
            | ErrorCode::ActivityNameTaken
            | ErrorCode::SessionCodeTaken
            | ErrorCode::SessionAlreadyLive => ErrorKind::Conflict,
            ErrorCode::StoreFailure => ErrorKind::StoreFailure,
            ErrorCode::Internal => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            ErrorCode::ChoiceNotFound => "CHOICE_NOT_FOUND",
            ErrorCode::QuestionNotFound => "QUESTION_NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidChoice => "INVALID_CHOICE",
            ErrorCode::UnknownActivityKind => "UNKNOWN_ACTIVITY_KIND",
            ErrorCode::SessionNameTaken => "SESSION_NAME_TAKEN",
            ErrorCode::ActivityNameTaken => "ACTIVITY_NAME_TAKEN",
            ErrorCode::SessionCodeTaken => "SESSION_CODE_TAKEN",
            ErrorCode::SessionAlreadyLive => "SESSION_ALREADY_LIVE",
            ErrorCode::StoreFailure => "STORE_FAILURE",
            ErrorCode::Internal => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone, Serialize)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates an input validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message).with_detail("field", field.into())
    }

    /// Operation is not valid in the current lifecycle state.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    /// Caller is not the session's author.
    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "Only the session author may perform this action",
        )
    }

    /// Wraps a durable store failure.
    pub fn store(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreFailure, err.to_string())
    }

    /// Internal consistency violation between the registry and the store.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field } | ValidationError::InvalidFormat { field, .. } => {
                field.clone()
            }
        };
        DomainError::validation(field, err.to_string())
    }
}
