use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

/// Top-level error type returned by chorus stores, the token service and the API facade.
#[derive(Debug, Error)]
pub enum Error {
    /// No valid access token was presented on a path that needs one.
    #[error("authentication required")]
    Unauthenticated,

    /// The actor is authenticated but does not own the target resource.
    #[error("forbidden: {reason}")]
    Forbidden { reason: Cow<'static, str> },

    /// The requested action does not exist for this resource kind.
    #[error("unsupported action: {action}")]
    Unsupported { action: Cow<'static, str> },

    /// Target entity does not exist, or was removed concurrently.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// A follow edge violated one of its structural invariants.
    #[error("invalid follow: {0}")]
    InvalidFollow(FollowViolation),

    /// Credential exchange failed (unknown handle or wrong password).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A token was malformed, badly signed, expired, of the wrong type, or already consumed.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Configuration could not be loaded or is unusable.
    #[error("configuration error: {message}")]
    Config { message: Cow<'static, str> },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Reasons a follow edge may be rejected at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowViolation {
    SelfFollow,
    DuplicateFollow,
}

impl fmt::Display for FollowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowViolation::SelfFollow => f.write_str("cannot follow yourself"),
            FollowViolation::DuplicateFollow => f.write_str("already following this user"),
        }
    }
}

/// Transport-neutral failure kinds. The handler layer maps these onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    ValidationFailure,
    InvalidCredentials,
    InvalidOrExpiredToken,
    Unsupported,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthenticated => ErrorKind::Unauthenticated,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation(_) | Error::InvalidFollow(_) => ErrorKind::ValidationFailure,
            Error::InvalidCredentials => ErrorKind::InvalidCredentials,
            Error::InvalidOrExpiredToken => ErrorKind::InvalidOrExpiredToken,
            Error::Redis(_) | Error::Config { .. } | Error::Other { .. } => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Other {
            message: message.into(),
        }
    }

    /// Returns the follow violation carried by this error, if any.
    pub fn follow_violation(&self) -> Option<FollowViolation> {
        match self {
            Error::InvalidFollow(violation) => Some(*violation),
            _ => None,
        }
    }

    /// Returns the validation issues carried by this error, if any.
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            Error::Validation(err) => &err.issues,
            _ => &[],
        }
    }
}

impl From<FollowViolation> for Error {
    fn from(violation: FollowViolation) -> Self {
        Error::InvalidFollow(violation)
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
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

    /// Turns an accumulated issue list into a result.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn has(&self, field: &str, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field && issue.code == code)
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
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
