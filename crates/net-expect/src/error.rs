//! Error types for net-expect.
//!
//! This module defines all error types used throughout the library.
//! Validation errors are returned synchronously and never enter the
//! expectation state machine. Runtime failures while evaluating assertion
//! clauses are modelled separately by [`ClauseError`], which is rendered into
//! a failed assertion result instead of being returned as an `Err`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ExpectationStatus, ResponseId, SessionId};

/// Format a wait timeout error message with enough context to re-poll.
fn format_wait_timeout_error(
    response_id: &ResponseId,
    waited: Duration,
    status: ExpectationStatus,
) -> String {
    format!(
        "gave up waiting for expectation '{response_id}' after {waited:?}\n\
         \n\
         Current status: {status}\n\
         \n\
         Tip: the expectation itself is still live and keeps its own deadline.\n\
         Poll again or assert with a longer timeout_ms."
    )
}

/// The main error type for net-expect operations.
#[derive(Debug, Error)]
pub enum NetExpectError {
    /// A regular expression or JSON path was malformed.
    #[error("invalid {field} '{pattern}': {message}")]
    InvalidPattern {
        /// Which criterion or clause carried the pattern.
        field: String,
        /// The pattern as supplied.
        pattern: String,
        /// What is wrong with it.
        message: String,
    },

    /// An expected status code was outside 100-599.
    #[error("invalid status code {code}: must be between 100 and 599")]
    InvalidStatusCode {
        /// The rejected status code.
        code: u16,
    },

    /// A timeout was outside the accepted range.
    #[error("invalid timeout {timeout_ms}ms: must be between {min}ms and {max}ms")]
    InvalidTimeout {
        /// The rejected timeout in milliseconds.
        timeout_ms: u64,
        /// Lower bound (inclusive).
        min: u64,
        /// Upper bound (inclusive).
        max: u64,
    },

    /// An HTTP method outside the supported set.
    #[error("unsupported HTTP method '{method}'")]
    InvalidMethod {
        /// The rejected method.
        method: String,
    },

    /// An expectation with the same id already exists in the session.
    #[error("expectation '{response_id}' already exists in session '{session_id}'")]
    DuplicateExpectation {
        /// Owning session.
        session_id: SessionId,
        /// The duplicated id.
        response_id: ResponseId,
    },

    /// No expectation with this id exists in the session.
    #[error("expectation '{response_id}' not found in session '{session_id}'")]
    ExpectationNotFound {
        /// Session that was searched.
        session_id: SessionId,
        /// The missing id.
        response_id: ResponseId,
    },

    /// The session is not known to the registry.
    #[error("session '{session_id}' not found")]
    SessionNotFound {
        /// The missing session.
        session_id: SessionId,
    },

    /// A bounded wait elapsed before the expectation became terminal.
    #[error("{}", format_wait_timeout_error(response_id, *waited, *status))]
    WaitTimeout {
        /// The expectation that was awaited.
        response_id: ResponseId,
        /// How long the caller waited.
        waited: Duration,
        /// Status observed when the wait gave up.
        status: ExpectationStatus,
    },

    /// Infrastructure failure while setting up an expectation.
    #[error("setup failed: {message}")]
    SetupFailed {
        /// Description of the failure.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    Io {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for net-expect operations.
pub type Result<T> = std::result::Result<T, NetExpectError>;

impl NetExpectError {
    /// Create an invalid pattern error.
    pub fn invalid_pattern(
        field: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            field: field.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate expectation error.
    #[must_use]
    pub fn duplicate(session_id: &SessionId, response_id: &ResponseId) -> Self {
        Self::DuplicateExpectation {
            session_id: session_id.clone(),
            response_id: response_id.clone(),
        }
    }

    /// Create an expectation not found error.
    #[must_use]
    pub fn not_found(session_id: &SessionId, response_id: &ResponseId) -> Self {
        Self::ExpectationNotFound {
            session_id: session_id.clone(),
            response_id: response_id.clone(),
        }
    }

    /// Create a session not found error.
    #[must_use]
    pub fn session_not_found(session_id: &SessionId) -> Self {
        Self::SessionNotFound {
            session_id: session_id.clone(),
        }
    }

    /// Create a setup failure.
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::SetupFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if this is a soft wait timeout the caller may re-poll.
    #[must_use]
    pub const fn is_wait_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }

    /// Check if this error was produced by input validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. }
                | Self::InvalidStatusCode { .. }
                | Self::InvalidTimeout { .. }
                | Self::InvalidMethod { .. }
        )
    }

    /// The wire-level category for this error.
    #[must_use]
    pub const fn error_type(&self) -> ErrorType {
        match self {
            Self::InvalidPattern { .. } => ErrorType::InvalidPattern,
            Self::InvalidStatusCode { .. }
            | Self::InvalidTimeout { .. }
            | Self::InvalidMethod { .. } => ErrorType::InvalidArgument,
            Self::DuplicateExpectation { .. } => ErrorType::DuplicateExpectation,
            Self::ExpectationNotFound { .. } => ErrorType::ResponseNotFound,
            Self::SessionNotFound { .. } => ErrorType::SessionNotFound,
            Self::WaitTimeout { .. } => ErrorType::WaitTimeout,
            Self::SetupFailed { .. } | Self::Io { .. } => ErrorType::SetupFailed,
            Self::Config { .. } => ErrorType::Configuration,
        }
    }
}

/// Error categories reported to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The browser session does not exist.
    SessionNotFound,
    /// The expectation does not exist.
    ResponseNotFound,
    /// A regex or JSON path failed to compile.
    InvalidPattern,
    /// The response id is already in use.
    DuplicateExpectation,
    /// A bounded wait elapsed first.
    WaitTimeout,
    /// Infrastructure failure.
    SetupFailed,
    /// A numeric or enumerated argument was out of range.
    InvalidArgument,
    /// Configuration could not be loaded or applied.
    Configuration,
}

/// Error payload returned by the tool surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub error_type: ErrorType,
    /// Human-readable description.
    pub message: String,
    /// When the error was produced.
    pub timestamp: DateTime<Utc>,
}

impl From<NetExpectError> for ErrorResponse {
    fn from(err: NetExpectError) -> Self {
        Self {
            error_type: err.error_type(),
            message: err.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Why a single assertion clause could not pass.
///
/// These never escape the evaluator as errors; their `Display` text becomes
/// the message of a failed assertion result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClauseError {
    /// The expectation was registered with body capture disabled, or the
    /// response carried no body.
    #[error("response body was not captured")]
    BodyNotCaptured,

    /// The expectation was registered with header capture disabled.
    #[error("response headers were not captured")]
    HeadersNotCaptured,

    /// The expectation was fulfilled but its response is no longer held.
    #[error("captured response is no longer available")]
    ResponseUnavailable,

    /// The body could not be parsed as JSON.
    #[error("response body is not valid JSON: {0}")]
    JsonParseFailure(String),

    /// The JSON path did not resolve to a value.
    #[error("JSON path '{0}' did not resolve to a value")]
    JsonPathNotFound(String),

    /// The JSON path could not be parsed.
    #[error("invalid JSON path '{path}': {reason}")]
    InvalidJsonPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
}
