//! Declarative assertions over captured responses.
//!
//! A [`ResponseAssertions`] is the loosely-typed request a caller sends;
//! [`ResponseAssertions::compile`] validates it up front and turns it into a
//! closed list of [`Clause`]s in a fixed evaluation order:
//!
//! 1. `status_code`
//! 2. `content_type`
//! 3. `contains_text`
//! 4. `contains_pattern`
//! 5. `headers`, one clause per header in name order
//! 6. `json_path_assertions`, one clause per path in path order
//! 7. `response_time_max_ms`
//!
//! # Example
//!
//! ```
//! use net_expect::assert::{ResponseAssertions, evaluate_clauses, EvaluateOptions};
//! use net_expect::expect::RegexCache;
//! use serde_json::json;
//!
//! let assertions = ResponseAssertions::new()
//!     .status_code(200)
//!     .json_path("$.ok", json!(true))
//!     .compile(&RegexCache::default())
//!     .unwrap();
//! assert_eq!(assertions.len(), 2);
//! # let _ = (evaluate_clauses, EvaluateOptions::default());
//! ```

mod clause;
mod evaluator;
mod json_path;
mod result;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use clause::{AssertionType, Clause, CompiledAssertions};
pub use evaluator::{EvaluateOptions, evaluate, evaluate_clauses, excerpt};
pub use json_path::{JsonPath, Segment, values_equal};
pub use result::{AssertResponseOutcome, AssertionResult};

use crate::error::{ClauseError, NetExpectError, Result};
use crate::expect::RegexCache;
use crate::types::Headers;

/// Assertions requested for a captured response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseAssertions {
    /// Exact HTTP status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Exact `Content-Type` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Literal substring of the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_text: Option<String>,
    /// Regex searched in the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_pattern: Option<String>,
    /// Response headers that must have exactly these values.
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    /// JSON path to expected value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub json_path_assertions: BTreeMap<String, Value>,
    /// Inclusive upper bound on response time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_max_ms: Option<u64>,
}

impl ResponseAssertions {
    /// No assertions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a status code.
    #[must_use]
    pub const fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Require a `Content-Type` value.
    #[must_use]
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Require a substring of the body.
    #[must_use]
    pub fn contains_text(mut self, text: impl Into<String>) -> Self {
        self.contains_text = Some(text.into());
        self
    }

    /// Require the body to match a regex.
    #[must_use]
    pub fn contains_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.contains_pattern = Some(pattern.into());
        self
    }

    /// Require a response header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Require a value at a JSON path.
    #[must_use]
    pub fn json_path(mut self, path: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.json_path_assertions
            .insert(path.into(), expected.into());
        self
    }

    /// Require a response time no greater than `ms`.
    #[must_use]
    pub const fn response_time_max_ms(mut self, ms: u64) -> Self {
        self.response_time_max_ms = Some(ms);
        self
    }

    /// Number of clauses this request expands to.
    #[must_use]
    pub fn clause_count(&self) -> usize {
        [
            self.status_code.is_some(),
            self.content_type.is_some(),
            self.contains_text.is_some(),
            self.contains_pattern.is_some(),
            self.response_time_max_ms.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
            + self.headers.len()
            + self.json_path_assertions.len()
    }

    /// Validate every clause and compile it.
    ///
    /// # Errors
    ///
    /// [`NetExpectError::InvalidStatusCode`] for a status outside 100-599 and
    /// [`NetExpectError::InvalidPattern`] for a malformed regex or JSON path.
    pub fn compile(&self, cache: &RegexCache) -> Result<CompiledAssertions> {
        let mut clauses = Vec::with_capacity(self.clause_count());

        if let Some(code) = self.status_code {
            if !(100..=599).contains(&code) {
                return Err(NetExpectError::InvalidStatusCode { code });
            }
            clauses.push(Clause::StatusCode(code));
        }
        if let Some(value) = &self.content_type {
            clauses.push(Clause::ContentType(value.clone()));
        }
        if let Some(text) = &self.contains_text {
            clauses.push(Clause::ContainsText(text.clone()));
        }
        if let Some(pattern) = &self.contains_pattern {
            clauses.push(Clause::ContainsPattern(
                cache.compile("contains_pattern", pattern)?,
            ));
        }
        for (name, value) in &self.headers {
            clauses.push(Clause::Header {
                name: name.clone(),
                value: value.clone(),
            });
        }
        for (path, expected) in &self.json_path_assertions {
            let path = JsonPath::parse(path).map_err(|e| match e {
                ClauseError::InvalidJsonPath { path, reason } => {
                    NetExpectError::invalid_pattern("json_path_assertions", path, reason)
                }
                other => NetExpectError::invalid_pattern(
                    "json_path_assertions",
                    path.as_str(),
                    other.to_string(),
                ),
            })?;
            clauses.push(Clause::JsonPath {
                path,
                expected: expected.clone(),
            });
        }
        if let Some(limit) = self.response_time_max_ms {
            clauses.push(Clause::ResponseTimeMax(limit));
        }

        Ok(CompiledAssertions::new(clauses))
    }
}
