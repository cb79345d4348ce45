//! Clause evaluation against a captured response.
//!
//! Evaluation never fails: a missing body, unparsable JSON or a path that
//! does not resolve all become failed results with a message, so callers
//! always get one result per clause.

use std::sync::OnceLock;

use serde_json::Value;

use super::clause::{Clause, CompiledAssertions};
use super::json_path::values_equal;
use super::result::{AssertResponseOutcome, AssertionResult};
use crate::config::DEFAULT_EXCERPT_CHARS;
use crate::error::ClauseError;
use crate::types::{CapturedResponse, ExpectationStatus, NetworkExpectation, ResponseId};

/// Knobs for rendering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// Characters of body shown as `actual` for body clauses.
    pub excerpt_chars: usize,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Evaluate `assertions` for an expectation.
///
/// Unless the expectation is fulfilled, no clause runs and the outcome is
/// unsuccessful with an empty result list. A fulfilled expectation whose
/// response is missing fails every clause with
/// [`ClauseError::ResponseUnavailable`].
#[must_use]
pub fn evaluate(
    response_id: &ResponseId,
    expectation: Option<&NetworkExpectation>,
    captured: Option<&CapturedResponse>,
    assertions: &CompiledAssertions,
    options: EvaluateOptions,
) -> AssertResponseOutcome {
    let status = expectation.map(|e| e.status);
    let results = match (status, captured) {
        (Some(ExpectationStatus::Fulfilled), Some(response)) => {
            evaluate_clauses(response, assertions, options)
        }
        (Some(ExpectationStatus::Fulfilled), None) => unavailable(assertions),
        _ => Vec::new(),
    };
    AssertResponseOutcome::new(response_id.clone(), status, results)
}

/// Run every clause against a response, in order.
#[must_use]
pub fn evaluate_clauses(
    response: &CapturedResponse,
    assertions: &CompiledAssertions,
    options: EvaluateOptions,
) -> Vec<AssertionResult> {
    let context = Context {
        response,
        options,
        json: OnceLock::new(),
    };
    assertions
        .clauses()
        .iter()
        .map(|clause| context.evaluate(clause))
        .collect()
}

fn unavailable(assertions: &CompiledAssertions) -> Vec<AssertionResult> {
    assertions
        .clauses()
        .iter()
        .map(|clause| AssertionResult {
            assertion_type: clause.assertion_type(),
            expected: clause.expected(),
            actual: Value::Null,
            passed: false,
            message: ClauseError::ResponseUnavailable.to_string(),
            path: clause.path().map(str::to_string),
        })
        .collect()
}

struct Context<'a> {
    response: &'a CapturedResponse,
    options: EvaluateOptions,
    json: OnceLock<Result<Value, ClauseError>>,
}

impl Context<'_> {
    fn evaluate(&self, clause: &Clause) -> AssertionResult {
        let (actual, verdict) = match clause {
            Clause::StatusCode(expected) => self.status_code(*expected),
            Clause::ContentType(expected) => self.header("Content-Type", expected),
            Clause::ContainsText(needle) => self.contains_text(needle),
            Clause::ContainsPattern(regex) => self.contains_pattern(regex),
            Clause::Header { name, value } => self.header(name, value),
            Clause::JsonPath { path, expected } => self.json_path(path, expected),
            Clause::ResponseTimeMax(limit) => self.response_time(*limit),
        };

        let (passed, message) = match verdict {
            Ok(message) => (true, message),
            Err(message) => (false, message),
        };

        AssertionResult {
            assertion_type: clause.assertion_type(),
            expected: clause.expected(),
            actual,
            passed,
            message,
            path: clause.path().map(str::to_string),
        }
    }

    fn status_code(&self, expected: u16) -> (Value, Verdict) {
        let actual = self.response.status;
        let verdict = if actual == expected {
            Ok(format!("status code is {actual}"))
        } else {
            Err(format!("expected status code {expected}, got {actual}"))
        };
        (Value::from(actual), verdict)
    }

    fn header(&self, name: &str, expected: &str) -> (Value, Verdict) {
        if !self.response.headers_captured {
            return (Value::Null, Err(ClauseError::HeadersNotCaptured.to_string()));
        }
        match self.response.header(name) {
            None => (Value::Null, Err(format!("header '{name}' is missing"))),
            Some(actual) if actual == expected => (
                Value::from(actual),
                Ok(format!("header '{name}' is '{actual}'")),
            ),
            Some(actual) => (
                Value::from(actual),
                Err(format!(
                    "expected header '{name}' to be '{expected}', got '{actual}'"
                )),
            ),
        }
    }

    fn contains_text(&self, needle: &str) -> (Value, Verdict) {
        let Some(body) = self.response.body.as_deref() else {
            return (Value::Null, Err(ClauseError::BodyNotCaptured.to_string()));
        };
        let actual = Value::from(excerpt(body, self.options.excerpt_chars));
        if body.contains(needle) {
            (actual, Ok(format!("body contains '{needle}'")))
        } else {
            (actual, Err(format!("body does not contain '{needle}'")))
        }
    }

    fn contains_pattern(&self, regex: &crate::expect::CompiledRegex) -> (Value, Verdict) {
        let Some(body) = self.response.body.as_deref() else {
            return (Value::Null, Err(ClauseError::BodyNotCaptured.to_string()));
        };
        match regex.find(body) {
            Some(found) => (
                Value::from(excerpt(found, self.options.excerpt_chars)),
                Ok(format!("body matches /{}/", regex.pattern())),
            ),
            None => (
                Value::from(excerpt(body, self.options.excerpt_chars)),
                Err(format!("body does not match /{}/", regex.pattern())),
            ),
        }
    }

    fn json_path(&self, path: &super::JsonPath, expected: &Value) -> (Value, Verdict) {
        let document = match self.document() {
            Ok(document) => document,
            Err(e) => return (Value::Null, Err(e.to_string())),
        };
        let Some(actual) = path.resolve(document) else {
            return (
                Value::Null,
                Err(ClauseError::JsonPathNotFound(path.to_string()).to_string()),
            );
        };
        let verdict = if values_equal(actual, expected) {
            Ok(format!("{path} equals {expected}"))
        } else {
            Err(format!("expected {path} to equal {expected}, got {actual}"))
        };
        (actual.clone(), verdict)
    }

    fn response_time(&self, limit: u64) -> (Value, Verdict) {
        let actual = self.response.response_time_ms;
        let verdict = if actual <= limit {
            Ok(format!("response time {actual}ms is within {limit}ms"))
        } else {
            Err(format!("response time {actual}ms exceeds {limit}ms"))
        };
        (Value::from(actual), verdict)
    }

    /// The body parsed as JSON, parsed at most once per evaluation.
    fn document(&self) -> Result<&Value, &ClauseError> {
        self.json
            .get_or_init(|| {
                let body = self
                    .response
                    .body
                    .as_deref()
                    .ok_or(ClauseError::BodyNotCaptured)?;
                serde_json::from_str(body).map_err(|e| ClauseError::JsonParseFailure(e.to_string()))
            })
            .as_ref()
    }
}

/// `Ok(message)` for a pass, `Err(message)` for a failure.
type Verdict = Result<String, String>;

/// The first `max_chars` characters of `text`, marked when cut.
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
