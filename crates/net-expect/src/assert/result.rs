//! Assertion results and the aggregate outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clause::AssertionType;
use crate::types::{ExpectationStatus, ResponseId};

/// The verdict of one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Which kind of clause produced this result.
    pub assertion_type: AssertionType,
    /// What the clause asked for.
    pub expected: Value,
    /// What the response had (`null` when unavailable).
    pub actual: Value,
    /// Whether the clause held.
    pub passed: bool,
    /// Human-readable explanation.
    pub message: String,
    /// Header name or JSON path, for clauses that target one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Report of one `assert_response` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertResponseOutcome {
    /// The asserted expectation.
    pub response_id: ResponseId,
    /// `true` only if the expectation was fulfilled and every clause passed.
    pub success: bool,
    /// Status at evaluation time; `None` if the expectation was not found.
    pub expectation_status: Option<ExpectationStatus>,
    /// One result per clause, in evaluation order.
    pub assertions: Vec<AssertionResult>,
    /// `assertions.len()`.
    pub total: usize,
    /// Passed results.
    pub passed_count: usize,
    /// Failed results.
    pub failed_count: usize,
    /// When the evaluation ran.
    pub evaluated_at: DateTime<Utc>,
}

impl AssertResponseOutcome {
    /// Build an outcome, deriving the counts and verdict.
    #[must_use]
    pub fn new(
        response_id: ResponseId,
        expectation_status: Option<ExpectationStatus>,
        assertions: Vec<AssertionResult>,
    ) -> Self {
        let passed_count = assertions.iter().filter(|a| a.passed).count();
        let failed_count = assertions.len() - passed_count;
        Self {
            response_id,
            success: expectation_status == Some(ExpectationStatus::Fulfilled) && failed_count == 0,
            expectation_status,
            total: assertions.len(),
            passed_count,
            failed_count,
            assertions,
            evaluated_at: Utc::now(),
        }
    }

    /// Results that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &AssertionResult> {
        self.assertions.iter().filter(|a| !a.passed)
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.expectation_status {
            Some(ExpectationStatus::Fulfilled) => format!(
                "{}/{} assertions passed for '{}'",
                self.passed_count, self.total, self.response_id
            ),
            Some(status) => format!(
                "expectation '{}' is {status}; no assertions evaluated",
                self.response_id
            ),
            None => format!("expectation '{}' not found", self.response_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(passed: bool) -> AssertionResult {
        AssertionResult {
            assertion_type: AssertionType::StatusCode,
            expected: Value::from(200),
            actual: Value::from(if passed { 200 } else { 500 }),
            passed,
            message: String::new(),
            path: None,
        }
    }

    #[test]
    fn counts_and_verdict() {
        let outcome = AssertResponseOutcome::new(
            ResponseId::from("r1"),
            Some(ExpectationStatus::Fulfilled),
            vec![result(true), result(false), result(true)],
        );
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.passed_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert!(!outcome.success);
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(outcome.summary(), "2/3 assertions passed for 'r1'");
    }

    #[test]
    fn unfulfilled_never_succeeds() {
        let outcome = AssertResponseOutcome::new(
            ResponseId::from("r1"),
            Some(ExpectationStatus::Expired),
            Vec::new(),
        );
        assert!(!outcome.success);
        assert!(outcome.summary().contains("expired"));

        let missing = AssertResponseOutcome::new(ResponseId::from("r2"), None, Vec::new());
        assert!(!missing.success);
        assert_eq!(
            serde_json::to_value(&missing).unwrap()["expectation_status"],
            Value::Null
        );
    }

    #[test]
    fn fulfilled_with_no_clauses_succeeds() {
        let outcome = AssertResponseOutcome::new(
            ResponseId::from("r1"),
            Some(ExpectationStatus::Fulfilled),
            Vec::new(),
        );
        assert!(outcome.success);
    }
}
