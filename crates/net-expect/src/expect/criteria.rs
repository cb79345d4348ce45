//! Match criteria and registration requests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::cache::RegexCache;
use super::pattern::CompiledRegex;
use crate::error::{NetExpectError, Result};
use crate::types::{CaptureOptions, Headers, HttpMethod, ResponseId, SessionId};

/// Shortest accepted expectation timeout.
pub const MIN_TIMEOUT_MS: u64 = 1_000;

/// Longest accepted expectation timeout.
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// What an observed exchange must look like to fulfill an expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCriteria {
    /// Regex searched (unanchored) in the full request URL.
    pub url_pattern: String,
    /// Expected request method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Request headers that must be present with exactly these values.
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub match_headers: Headers,
    /// Regex searched (unanchored) in the raw request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_body_pattern: Option<String>,
    /// Response statuses that count as fulfilling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_codes: Option<BTreeSet<u16>>,
}

impl MatchCriteria {
    /// Criteria matching `GET` requests whose URL contains `url_pattern`.
    #[must_use]
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            method: HttpMethod::Get,
            match_headers: Headers::new(),
            match_body_pattern: None,
            expected_status_codes: None,
        }
    }

    /// Set the expected method.
    #[must_use]
    pub const fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Require a request header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_headers.insert(name.into(), value.into());
        self
    }

    /// Require the request body to match a regex.
    #[must_use]
    pub fn body_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.match_body_pattern = Some(pattern.into());
        self
    }

    /// Restrict the response statuses that count as a match.
    #[must_use]
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status_codes = Some(codes.into_iter().collect());
        self
    }

    /// Validate and compile the criteria.
    ///
    /// Checks run in a fixed order: URL pattern, body pattern, status codes.
    pub fn compile(&self, cache: &RegexCache) -> Result<CompiledCriteria> {
        if self.url_pattern.is_empty() {
            return Err(NetExpectError::invalid_pattern(
                "url_pattern",
                "",
                "url_pattern must not be empty",
            ));
        }
        let url = cache.compile("url_pattern", &self.url_pattern)?;

        let body = self
            .match_body_pattern
            .as_deref()
            .map(|pattern| cache.compile("match_body_pattern", pattern))
            .transpose()?;

        if let Some(codes) = &self.expected_status_codes
            && let Some(&code) = codes.iter().find(|c| !(100..=599).contains(*c))
        {
            return Err(NetExpectError::InvalidStatusCode { code });
        }

        Ok(CompiledCriteria {
            url,
            method: self.method,
            headers: self.match_headers.clone(),
            body,
            status_codes: self.expected_status_codes.clone(),
        })
    }
}

/// Criteria with every pattern compiled, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCriteria {
    pub(crate) url: CompiledRegex,
    pub(crate) method: HttpMethod,
    pub(crate) headers: Headers,
    pub(crate) body: Option<CompiledRegex>,
    pub(crate) status_codes: Option<BTreeSet<u16>>,
}

impl CompiledCriteria {
    /// The compiled URL pattern.
    #[must_use]
    pub const fn url(&self) -> &CompiledRegex {
        &self.url
    }

    /// The expected method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }
}

/// Check a timeout against the accepted range.
pub fn validate_timeout(timeout_ms: u64) -> Result<u64> {
    if timeout_ms < MIN_TIMEOUT_MS || timeout_ms > MAX_TIMEOUT_MS {
        return Err(NetExpectError::InvalidTimeout {
            timeout_ms,
            min: MIN_TIMEOUT_MS,
            max: MAX_TIMEOUT_MS,
        });
    }
    Ok(timeout_ms)
}

/// A request to register an expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpectation {
    /// Owning session.
    pub session_id: SessionId,
    /// Caller-chosen id; generated when absent.
    pub response_id: Option<ResponseId>,
    /// Match criteria.
    pub criteria: MatchCriteria,
    /// Relative deadline; the registry default applies when absent.
    pub timeout_ms: Option<u64>,
    /// What to retain from the matching response.
    pub capture: CaptureOptions,
}

impl NewExpectation {
    /// Expect a `GET` whose URL contains `url_pattern` on `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>, url_pattern: impl Into<String>) -> Self {
        Self::with_criteria(session_id, MatchCriteria::new(url_pattern))
    }

    /// Expect an exchange matching prepared criteria.
    #[must_use]
    pub fn with_criteria(session_id: impl Into<SessionId>, criteria: MatchCriteria) -> Self {
        Self {
            session_id: session_id.into(),
            response_id: None,
            criteria,
            timeout_ms: None,
            capture: CaptureOptions::default(),
        }
    }

    /// Use a caller-chosen response id.
    #[must_use]
    pub fn response_id(mut self, id: impl Into<ResponseId>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Set the expected method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.criteria = self.criteria.method(method);
        self
    }

    /// Require a request header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria = self.criteria.header(name, value);
        self
    }

    /// Require the request body to match a regex.
    #[must_use]
    pub fn body_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.criteria = self.criteria.body_pattern(pattern);
        self
    }

    /// Restrict the response statuses that count as a match.
    #[must_use]
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.criteria = self.criteria.status_codes(codes);
        self
    }

    /// Set the timeout in milliseconds.
    #[must_use]
    pub const fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Retain or drop the response body on match.
    #[must_use]
    pub const fn capture_body(mut self, capture: bool) -> Self {
        self.capture.body = capture;
        self
    }

    /// Retain or drop the response headers on match.
    #[must_use]
    pub const fn capture_headers(mut self, capture: bool) -> Self {
        self.capture.headers = capture;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_valid_criteria() {
        let cache = RegexCache::new(8);
        let compiled = MatchCriteria::new("/api/login")
            .method(HttpMethod::Post)
            .body_pattern("user=\\w+")
            .status_codes([200, 201])
            .compile(&cache)
            .unwrap();
        assert_eq!(compiled.method(), HttpMethod::Post);
        assert_eq!(compiled.url().pattern(), "/api/login");
    }

    #[test]
    fn empty_url_pattern_is_rejected() {
        let err = MatchCriteria::new("").compile(&RegexCache::new(1)).unwrap_err();
        assert!(matches!(err, NetExpectError::InvalidPattern { .. }));
    }

    #[test]
    fn malformed_body_pattern_is_rejected() {
        let err = MatchCriteria::new("/ok")
            .body_pattern("(unclosed")
            .compile(&RegexCache::new(4))
            .unwrap_err();
        assert!(matches!(
            err,
            NetExpectError::InvalidPattern { ref field, .. } if field == "match_body_pattern"
        ));
    }

    #[test]
    fn out_of_range_status_codes_are_rejected() {
        for code in [0, 99, 600, 999] {
            let err = MatchCriteria::new("/ok")
                .status_codes([200, code])
                .compile(&RegexCache::new(4))
                .unwrap_err();
            assert!(matches!(err, NetExpectError::InvalidStatusCode { code: c } if c == code));
        }
    }

    #[test]
    fn timeout_bounds() {
        assert!(validate_timeout(999).is_err());
        assert_eq!(validate_timeout(1_000).unwrap(), 1_000);
        assert_eq!(validate_timeout(300_000).unwrap(), 300_000);
        assert!(validate_timeout(300_001).is_err());
    }

    #[test]
    fn criteria_deserialize_with_defaults() {
        let criteria: MatchCriteria =
            serde_json::from_str(r#"{"url_pattern": "/api/items"}"#).unwrap();
        assert_eq!(criteria.method, HttpMethod::Get);
        assert!(criteria.match_headers.is_empty());
        assert!(criteria.expected_status_codes.is_none());
    }
}
