//! Common types for net-expect.
//!
//! This module defines the identities, observed traffic, captured responses
//! and expectation snapshots shared by the matcher, the registry and the
//! assertion evaluator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NetExpectError;
use crate::expect::MatchCriteria;

/// Header name to value mapping.
pub type Headers = BTreeMap<String, String>;

/// Look up a header by name, ignoring ASCII case in the name.
#[must_use]
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

/// Identifier of a browser session owning expectations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of an expectation within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(String);

impl ResponseId {
    /// Create a response id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id of the form `resp_<32 hex>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("resp_{}", Uuid::new_v4().simple()))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResponseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResponseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// HTTP methods an expectation can match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    #[default]
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
    /// PATCH.
    Patch,
    /// HEAD.
    Head,
    /// OPTIONS.
    Options,
}

impl HttpMethod {
    /// Get the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Check whether an observed method string names this method.
    #[must_use]
    pub fn matches(self, observed: &str) -> bool {
        observed.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = NetExpectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(NetExpectError::InvalidMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// Lifecycle state of an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExpectationStatus {
    /// Registered and waiting for a matching exchange.
    Waiting = 0,
    /// A matching exchange arrived before the deadline.
    Fulfilled = 1,
    /// The deadline passed without a matching exchange.
    Expired = 2,
    /// Setup failed or the owning session went away.
    Failed = 3,
}

impl ExpectationStatus {
    /// Check if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Waiting)
    }

    /// Get the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Fulfilled => "fulfilled",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Waiting,
            1 => Self::Fulfilled,
            2 => Self::Expired,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for ExpectationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding an [`ExpectationStatus`].
///
/// Every transition out of `Waiting` goes through [`StatusCell::transition`],
/// so exactly one writer wins.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// Create a cell in the given state.
    #[must_use]
    pub const fn new(status: ExpectationStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    /// Read the current state.
    #[must_use]
    pub fn load(&self) -> ExpectationStatus {
        ExpectationStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `Waiting` to `to`. Returns `false` if another transition won.
    pub fn transition(&self, to: ExpectationStatus) -> bool {
        self.0
            .compare_exchange(
                ExpectationStatus::Waiting as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Request half of an observed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    /// Full request URL.
    pub url: String,
    /// Method as reported by the browser.
    pub method: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Raw request body, if any.
    #[serde(default)]
    pub body: Option<String>,
}

/// Response half of an observed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    #[serde(default)]
    pub status_text: String,
    /// Response headers.
    #[serde(default)]
    pub headers: Headers,
    /// Response body, if the browser made it available.
    #[serde(default)]
    pub body: Option<String>,
    /// Time from request start to response completion.
    #[serde(default)]
    pub timing_ms: u64,
}

/// A completed request/response pair observed on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedExchange {
    /// Session the traffic was observed on.
    pub session_id: SessionId,
    /// The request.
    pub request: NetworkRequest,
    /// The response.
    pub response: NetworkResponse,
    /// When the exchange completed.
    pub observed_at: DateTime<Utc>,
}

impl ObservedExchange {
    /// Create an exchange observed now.
    #[must_use]
    pub fn new(
        session_id: impl Into<SessionId>,
        request: NetworkRequest,
        response: NetworkResponse,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request,
            response,
            observed_at: Utc::now(),
        }
    }
}

/// Which parts of a matching response are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Keep the response body.
    pub body: bool,
    /// Keep the response headers.
    pub headers: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            body: true,
            headers: true,
        }
    }
}

/// The retained view of a response that fulfilled an expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedResponse {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub status_text: String,
    /// Response headers (empty when not captured).
    pub headers: Headers,
    /// Whether headers were retained.
    pub headers_captured: bool,
    /// Response body (absent when not captured or not available).
    pub body: Option<String>,
    /// Whether the body was cut at the configured size limit.
    pub body_truncated: bool,
    /// Request URL.
    pub url: String,
    /// Request method.
    pub method: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
    /// When the exchange completed.
    pub timestamp: DateTime<Utc>,
}

impl CapturedResponse {
    /// Build the retained view of an exchange, honoring capture flags and
    /// bounding the body to `max_body_bytes`.
    #[must_use]
    pub fn capture(
        exchange: &ObservedExchange,
        options: CaptureOptions,
        max_body_bytes: usize,
    ) -> Self {
        let response = &exchange.response;
        let (body, body_truncated) = if options.body {
            match &response.body {
                Some(body) => {
                    let (kept, truncated) = truncate_at_char_boundary(body, max_body_bytes);
                    (Some(kept.to_string()), truncated)
                }
                None => (None, false),
            }
        } else {
            (None, false)
        };

        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: if options.headers {
                response.headers.clone()
            } else {
                Headers::new()
            },
            headers_captured: options.headers,
            body,
            body_truncated,
            url: exchange.request.url.clone(),
            method: exchange.request.method.to_ascii_uppercase(),
            response_time_ms: response.timing_ms,
            timestamp: exchange.observed_at,
        }
    }

    /// Look up a captured header, ignoring case in the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> (&str, bool) {
    if s.len() <= max_bytes {
        return (s, false);
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    (&s[..end], true)
}

/// Point-in-time view of a registered expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkExpectation {
    /// Identity within the session.
    pub response_id: ResponseId,
    /// Owning session.
    pub session_id: SessionId,
    /// Match criteria as declared.
    #[serde(flatten)]
    pub criteria: MatchCriteria,
    /// Relative deadline from creation.
    pub timeout_ms: u64,
    /// Whether the body is retained on match.
    pub capture_response_body: bool,
    /// Whether headers are retained on match.
    pub capture_response_headers: bool,
    /// Current lifecycle state.
    pub status: ExpectationStatus,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// `created_at + timeout_ms`.
    pub expires_at: DateTime<Utc>,
    /// When the expectation left `waiting`.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Why the expectation failed, when it did.
    pub failure_reason: Option<String>,
}
