//! Custom assertion helpers for outcome testing.

use crate::assert::{AssertResponseOutcome, AssertionResult, AssertionType};
use crate::types::ExpectationStatus;

/// Assertion helpers for [`AssertResponseOutcome`].
pub trait OutcomeAssertions {
    /// Get the outcome.
    fn outcome(&self) -> &AssertResponseOutcome;

    /// Assert the outcome succeeded.
    fn assert_success(&self) {
        let outcome = self.outcome();
        assert!(
            outcome.success,
            "Expected success, but got {}:\n{:#?}",
            outcome.summary(),
            outcome.failures().collect::<Vec<_>>()
        );
    }

    /// Assert the outcome did not succeed.
    fn assert_not_success(&self) {
        let outcome = self.outcome();
        assert!(
            !outcome.success,
            "Expected failure, but got {}",
            outcome.summary()
        );
    }

    /// Assert the expectation status seen at evaluation time.
    fn assert_expectation_status(&self, expected: Option<ExpectationStatus>) {
        let outcome = self.outcome();
        assert_eq!(
            outcome.expectation_status, expected,
            "Expected expectation status {expected:?}, but got {:?}",
            outcome.expectation_status
        );
    }

    /// Assert the number of results.
    fn assert_total(&self, expected: usize) {
        let outcome = self.outcome();
        assert_eq!(
            outcome.total, expected,
            "Expected {expected} assertion results, but got {}",
            outcome.total
        );
        assert_eq!(outcome.assertions.len(), outcome.total);
    }

    /// Assert the result at `index` has the given kind and verdict.
    fn assert_result(&self, index: usize, kind: AssertionType, passed: bool) -> &AssertionResult {
        let outcome = self.outcome();
        let Some(result) = outcome.assertions.get(index) else {
            panic!(
                "Expected a result at index {index}, but there are only {}",
                outcome.assertions.len()
            );
        };
        assert_eq!(
            (result.assertion_type, result.passed),
            (kind, passed),
            "Unexpected result at index {index}: {result:#?}"
        );
        result
    }
}

impl OutcomeAssertions for AssertResponseOutcome {
    fn outcome(&self) -> &AssertResponseOutcome {
        self
    }
}

/// Assert that an outcome succeeded.
pub fn assert_outcome_success(outcome: &AssertResponseOutcome) {
    outcome.assert_success();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseId;
    use serde_json::Value;

    fn outcome(passed: bool) -> AssertResponseOutcome {
        AssertResponseOutcome::new(
            ResponseId::from("r1"),
            Some(ExpectationStatus::Fulfilled),
            vec![AssertionResult {
                assertion_type: AssertionType::StatusCode,
                expected: Value::from(200),
                actual: Value::from(if passed { 200 } else { 404 }),
                passed,
                message: String::new(),
                path: None,
            }],
        )
    }

    #[test]
    fn passing_outcome() {
        let outcome = outcome(true);
        outcome.assert_success();
        outcome.assert_total(1);
        outcome.assert_expectation_status(Some(ExpectationStatus::Fulfilled));
        outcome.assert_result(0, AssertionType::StatusCode, true);
        assert_outcome_success(&outcome);
    }

    #[test]
    fn failing_outcome() {
        let outcome = outcome(false);
        outcome.assert_not_success();
        let result = outcome.assert_result(0, AssertionType::StatusCode, false);
        assert_eq!(result.actual, Value::from(404));
    }

    #[test]
    #[should_panic(expected = "Expected success")]
    fn assert_success_panics_on_failure() {
        outcome(false).assert_success();
    }
}
