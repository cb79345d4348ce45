//! Tool-call surface.
//!
//! [`NetworkTools`] exposes the two operations an agent calls:
//! `expect_response` registers an expectation and returns immediately, and
//! `assert_response` waits for it (bounded) and evaluates assertions. The
//! request shapes mirror the JSON arguments of those tools; errors come back
//! as [`ErrorResponse`] payloads.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::assert::{
    AssertResponseOutcome, EvaluateOptions, ResponseAssertions, evaluate,
};
use crate::error::{ErrorResponse, NetExpectError, Result};
use crate::expect::{MatchCriteria, NewExpectation};
use crate::logging::expectation_span;
use crate::registry::ExpectationRegistry;
use crate::types::{CaptureOptions, Headers, HttpMethod, NetworkExpectation, ResponseId, SessionId};

const fn default_true() -> bool {
    true
}

/// Arguments of `expect_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectResponseRequest {
    /// Session to watch.
    pub session_id: SessionId,
    /// Regex searched in request URLs.
    pub url_pattern: String,
    /// HTTP method name; `GET` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request headers that must match exactly.
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub match_headers: Headers,
    /// Regex searched in request bodies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_body_pattern: Option<String>,
    /// Statuses that count as fulfilling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_codes: Option<Vec<u16>>,
    /// Deadline in milliseconds; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Retain the response body.
    #[serde(default = "default_true")]
    pub capture_response_body: bool,
    /// Retain the response headers.
    #[serde(default = "default_true")]
    pub capture_response_headers: bool,
    /// Caller-chosen id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<ResponseId>,
}

impl ExpectResponseRequest {
    /// Watch `session_id` for a `GET` whose URL contains `url_pattern`.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>, url_pattern: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            url_pattern: url_pattern.into(),
            method: None,
            match_headers: Headers::new(),
            match_body_pattern: None,
            expected_status_codes: None,
            timeout_ms: None,
            capture_response_body: true,
            capture_response_headers: true,
            response_id: None,
        }
    }

    /// Turn the loosely-typed arguments into a registration.
    ///
    /// # Errors
    ///
    /// [`NetExpectError::InvalidMethod`] for an unknown method name.
    pub fn into_new_expectation(self) -> Result<NewExpectation> {
        let method = self
            .method
            .as_deref()
            .map(str::parse::<HttpMethod>)
            .transpose()?
            .unwrap_or_default();

        let mut criteria = MatchCriteria::new(self.url_pattern).method(method);
        criteria.match_headers = self.match_headers;
        criteria.match_body_pattern = self.match_body_pattern;
        criteria.expected_status_codes = self
            .expected_status_codes
            .map(|codes| codes.into_iter().collect());

        Ok(NewExpectation {
            session_id: self.session_id,
            response_id: self.response_id,
            criteria,
            timeout_ms: self.timeout_ms,
            capture: CaptureOptions {
                body: self.capture_response_body,
                headers: self.capture_response_headers,
            },
        })
    }
}

/// Reply of `expect_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectResponseReply {
    /// Id to pass to `assert_response`.
    pub response_id: ResponseId,
    /// The registered expectation.
    pub expectation: NetworkExpectation,
    /// Human-readable confirmation.
    pub message: String,
}

/// Arguments of `assert_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertResponseRequest {
    /// Session owning the expectation.
    pub session_id: SessionId,
    /// Expectation to assert on.
    pub response_id: ResponseId,
    /// Clauses to evaluate.
    #[serde(flatten)]
    pub assertions: ResponseAssertions,
    /// How long to wait for the expectation to resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl AssertResponseRequest {
    /// Assert on `response_id` in `session_id`.
    #[must_use]
    pub fn new(
        session_id: impl Into<SessionId>,
        response_id: impl Into<ResponseId>,
        assertions: ResponseAssertions,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            response_id: response_id.into(),
            assertions,
            timeout_ms: None,
        }
    }

    /// Bound the wait.
    #[must_use]
    pub const fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// The network expectation tools.
#[derive(Debug, Clone)]
pub struct NetworkTools {
    registry: Arc<ExpectationRegistry>,
}

impl NetworkTools {
    /// Serve tools over `registry`.
    #[must_use]
    pub const fn new(registry: Arc<ExpectationRegistry>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ExpectationRegistry> {
        &self.registry
    }

    /// Register an expectation. Never waits for traffic.
    pub fn expect_response(
        &self,
        request: ExpectResponseRequest,
    ) -> std::result::Result<ExpectResponseReply, ErrorResponse> {
        let registration = request.into_new_expectation()?;
        let expectation = self.registry.register(registration)?;
        Ok(ExpectResponseReply {
            response_id: expectation.response_id.clone(),
            message: format!(
                "waiting up to {}ms for {} {}",
                expectation.timeout_ms, expectation.criteria.method, expectation.criteria.url_pattern
            ),
            expectation,
        })
    }

    /// Wait for an expectation and evaluate assertions on its response.
    ///
    /// Assertions are validated before waiting. A missing expectation gives
    /// an unsuccessful outcome with no status rather than an error, as does
    /// one that expired or failed.
    pub async fn assert_response(
        &self,
        request: AssertResponseRequest,
    ) -> std::result::Result<AssertResponseOutcome, ErrorResponse> {
        let span = expectation_span(&request.session_id, &request.response_id);
        Ok(self.assert_inner(request).instrument(span).await?)
    }

    async fn assert_inner(&self, request: AssertResponseRequest) -> Result<AssertResponseOutcome> {
        let config = self.registry.config();
        let assertions = request.assertions.compile(self.registry.regex_cache())?;

        let session_id = &request.session_id;
        let response_id = &request.response_id;
        if !self.registry.has_session(session_id) {
            return Err(NetExpectError::session_not_found(session_id));
        }

        let max_wait = Duration::from_millis(
            request
                .timeout_ms
                .unwrap_or(config.default_assert_timeout_ms),
        );
        let (expectation, captured) = match self
            .registry
            .wait_for_response(session_id, response_id, max_wait)
            .await
        {
            Ok((expectation, captured)) => (Some(expectation), captured),
            Err(NetExpectError::ExpectationNotFound { .. }) => (None, None),
            Err(e) => return Err(e),
        };

        let outcome = evaluate(
            response_id,
            expectation.as_ref(),
            captured.as_deref(),
            &assertions,
            EvaluateOptions {
                excerpt_chars: config.excerpt_chars,
            },
        );

        if config.evict_after_assert && expectation.is_some() {
            // Already gone is fine; the outcome is what matters.
            let _ = self.registry.evict(session_id, response_id);
        }

        tracing::debug!(
            session.id = %session_id,
            response.id = %response_id,
            success = outcome.success,
            passed = outcome.passed_count,
            failed = outcome.failed_count,
            "Assertions evaluated"
        );
        Ok(outcome)
    }

    /// Current state of an expectation.
    pub fn expectation_status(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> std::result::Result<NetworkExpectation, ErrorResponse> {
        Ok(self.registry.get_status(session_id, response_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use serde_json::json;

    #[test]
    fn request_defaults() {
        let request: ExpectResponseRequest = serde_json::from_value(json!({
            "session_id": "tab-1",
            "url_pattern": "/api/login"
        }))
        .unwrap();
        assert!(request.capture_response_body);
        assert!(request.capture_response_headers);

        let registration = request.into_new_expectation().unwrap();
        assert_eq!(registration.criteria.method, HttpMethod::Get);
        assert!(registration.timeout_ms.is_none());
    }

    #[test]
    fn status_codes_collapse_duplicates() {
        let mut request = ExpectResponseRequest::new("tab-1", "/a");
        request.expected_status_codes = Some(vec![201, 200, 201]);
        let registration = request.into_new_expectation().unwrap();
        let codes: Vec<_> = registration
            .criteria
            .expected_status_codes
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, [200, 201]);
    }

    #[test]
    fn unknown_method_is_invalid_argument() {
        let mut request = ExpectResponseRequest::new("tab-1", "/a");
        request.method = Some("BREW".into());
        let tools = NetworkTools::new(Arc::new(ExpectationRegistry::default()));
        let err = tools.expect_response(request).unwrap_err();
        assert_eq!(err.error_type, ErrorType::InvalidArgument);
    }

    #[test]
    fn assert_request_flattens_clauses() {
        let request: AssertResponseRequest = serde_json::from_value(json!({
            "session_id": "tab-1",
            "response_id": "resp_1",
            "status_code": 200,
            "contains_text": "ok",
            "timeout_ms": 5000
        }))
        .unwrap();
        assert_eq!(request.assertions.status_code, Some(200));
        assert_eq!(request.assertions.contains_text.as_deref(), Some("ok"));
        assert_eq!(request.timeout_ms, Some(5000));
    }

    mod flows {
        use super::*;
        use crate::assert::AssertionType;
        use crate::test_utils::{CriteriaBuilder, ExchangeBuilder, OutcomeAssertions};
        use crate::types::ExpectationStatus;

        fn tools() -> NetworkTools {
            let registry = ExpectationRegistry::default();
            registry.open_session("s1");
            NetworkTools::new(Arc::new(registry))
        }

        #[tokio::test(start_paused = true)]
        async fn fulfilled_json_login() {
            let tools = tools();
            let id = tools
                .registry()
                .register(CriteriaBuilder::new("s1", "/api/login").post().id("login").build())
                .unwrap()
                .response_id;

            tools.registry().on_exchange_observed(
                &ExchangeBuilder::new("s1")
                    .post("https://app/api/login")
                    .json_body(&json!({"user": {"id": 7}, "token": "t"}))
                    .build(),
            );

            let outcome = tools
                .assert_response(AssertResponseRequest::new(
                    "s1",
                    id,
                    ResponseAssertions::new()
                        .status_code(200)
                        .content_type("application/json")
                        .json_path("$.user.id", 7),
                ))
                .await
                .unwrap();
            outcome.assert_success();
            outcome.assert_total(3);
            outcome.assert_result(0, AssertionType::StatusCode, true);
            outcome.assert_result(1, AssertionType::ContentType, true);
            let json = outcome.assert_result(2, AssertionType::JsonPath, true);
            assert_eq!(json.path.as_deref(), Some("$.user.id"));
        }

        #[tokio::test(start_paused = true)]
        async fn headers_not_captured_fail_header_clauses() {
            let tools = tools();
            let id = tools
                .registry()
                .register(CriteriaBuilder::new("s1", "/a").capture_nothing().build())
                .unwrap()
                .response_id;
            tools.registry().on_exchange_observed(
                &ExchangeBuilder::new("s1")
                    .get("/a")
                    .response_header("X-Trace", "abc")
                    .body("hello")
                    .build(),
            );

            let outcome = tools
                .assert_response(AssertResponseRequest::new(
                    "s1",
                    id,
                    ResponseAssertions::new()
                        .status_code(200)
                        .header("X-Trace", "abc")
                        .contains_text("hello"),
                ))
                .await
                .unwrap();
            outcome.assert_not_success();
            outcome.assert_expectation_status(Some(ExpectationStatus::Fulfilled));
            outcome.assert_result(0, AssertionType::StatusCode, true);
            outcome.assert_result(1, AssertionType::ContainsText, false);
            outcome.assert_result(2, AssertionType::Header, false);
        }

        #[tokio::test(start_paused = true)]
        async fn expired_expectation_yields_no_results() {
            let tools = tools();
            let id = tools
                .registry()
                .register(CriteriaBuilder::new("s1", "/never").fast_timeout().build())
                .unwrap()
                .response_id;

            let outcome = tools
                .assert_response(
                    AssertResponseRequest::new("s1", id, ResponseAssertions::new().status_code(200))
                        .timeout_ms(5_000),
                )
                .await
                .unwrap();
            outcome.assert_not_success();
            outcome.assert_expectation_status(Some(ExpectationStatus::Expired));
            outcome.assert_total(0);
        }
    }
}
