//! Compiled assertion clauses.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_path::JsonPath;
use crate::expect::CompiledRegex;

/// The kind of check an [`AssertionResult`](super::AssertionResult) reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionType {
    /// Response status equals the expected code.
    StatusCode,
    /// `Content-Type` header equals the expected value.
    ContentType,
    /// Body contains a literal substring.
    ContainsText,
    /// Body matches a regular expression.
    ContainsPattern,
    /// A response header equals the expected value.
    Header,
    /// A JSON path resolves to the expected value.
    JsonPath,
    /// Response time is within the limit.
    ResponseTime,
}

impl AssertionType {
    /// Get the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusCode => "status_code",
            Self::ContentType => "content_type",
            Self::ContainsText => "contains_text",
            Self::ContainsPattern => "contains_pattern",
            Self::Header => "header",
            Self::JsonPath => "json_path",
            Self::ResponseTime => "response_time",
        }
    }
}

impl fmt::Display for AssertionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated assertion, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact status match.
    StatusCode(u16),
    /// Exact `Content-Type` value.
    ContentType(String),
    /// Literal substring of the body.
    ContainsText(String),
    /// Regex searched in the body.
    ContainsPattern(CompiledRegex),
    /// Exact value of one response header.
    Header {
        /// Header name (looked up case-insensitively).
        name: String,
        /// Expected value.
        value: String,
    },
    /// Value at a JSON path.
    JsonPath {
        /// Where to look.
        path: JsonPath,
        /// What must be there.
        expected: Value,
    },
    /// Upper bound on response time, inclusive.
    ResponseTimeMax(u64),
}

impl Clause {
    /// The result type this clause produces.
    #[must_use]
    pub const fn assertion_type(&self) -> AssertionType {
        match self {
            Self::StatusCode(_) => AssertionType::StatusCode,
            Self::ContentType(_) => AssertionType::ContentType,
            Self::ContainsText(_) => AssertionType::ContainsText,
            Self::ContainsPattern(_) => AssertionType::ContainsPattern,
            Self::Header { .. } => AssertionType::Header,
            Self::JsonPath { .. } => AssertionType::JsonPath,
            Self::ResponseTimeMax(_) => AssertionType::ResponseTime,
        }
    }

    /// The expected side as JSON.
    #[must_use]
    pub fn expected(&self) -> Value {
        match self {
            Self::StatusCode(code) => Value::from(*code),
            Self::ContentType(text) | Self::ContainsText(text) => Value::from(text.as_str()),
            Self::ContainsPattern(regex) => Value::from(regex.pattern()),
            Self::Header { value, .. } => Value::from(value.as_str()),
            Self::JsonPath { expected, .. } => expected.clone(),
            Self::ResponseTimeMax(ms) => Value::from(*ms),
        }
    }

    /// Header name or JSON path this clause targets.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Header { name, .. } => Some(name),
            Self::JsonPath { path, .. } => Some(path.as_str()),
            _ => None,
        }
    }
}

/// Clauses in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledAssertions {
    clauses: Vec<Clause>,
}

impl CompiledAssertions {
    pub(crate) const fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// The clauses.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Number of clauses, which is also the number of results produced.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Check if there is nothing to assert.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
