//! Builder patterns for test setup.

use serde_json::Value;

use crate::expect::NewExpectation;
use crate::types::{
    Headers, HttpMethod, NetworkRequest, NetworkResponse, ObservedExchange, SessionId,
};

/// Builder for observed exchanges.
#[derive(Debug, Clone)]
pub struct ExchangeBuilder {
    session_id: SessionId,
    request: NetworkRequest,
    response: NetworkResponse,
}

impl ExchangeBuilder {
    /// A `GET /` answered with `200 OK` on `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            request: NetworkRequest {
                url: "/".into(),
                method: "GET".into(),
                ..Default::default()
            },
            response: NetworkResponse {
                status: 200,
                status_text: "OK".into(),
                ..Default::default()
            },
        }
    }

    /// Set the request URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.request.url = url.into();
        self
    }

    /// Set the request method as sent on the wire.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into();
        self
    }

    /// `GET url`.
    #[must_use]
    pub fn get(self, url: impl Into<String>) -> Self {
        self.method(HttpMethod::Get.as_str()).url(url)
    }

    /// `POST url`.
    #[must_use]
    pub fn post(self, url: impl Into<String>) -> Self {
        self.method(HttpMethod::Post.as_str()).url(url)
    }

    /// Add a request header.
    #[must_use]
    pub fn request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn request_body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Set the response status.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.response.status = status;
        self.response.status_text = reason_phrase(status).into();
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the response headers.
    #[must_use]
    pub fn response_headers(mut self, headers: Headers) -> Self {
        self.response.headers = headers;
        self
    }

    /// Set a raw response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.response.body = Some(body.into());
        self
    }

    /// Set a JSON response body and its content type.
    #[must_use]
    pub fn json_body(self, body: &Value) -> Self {
        self.response_header("Content-Type", "application/json")
            .body(body.to_string())
    }

    /// Set the response time.
    #[must_use]
    pub const fn timing_ms(mut self, ms: u64) -> Self {
        self.response.timing_ms = ms;
        self
    }

    /// Build the exchange, stamped now.
    #[must_use]
    pub fn build(self) -> ObservedExchange {
        ObservedExchange::new(self.session_id, self.request, self.response)
    }
}

const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Builder for registrations used in tests.
#[derive(Debug, Clone)]
pub struct CriteriaBuilder {
    inner: NewExpectation,
}

impl CriteriaBuilder {
    /// Expect a `GET` whose URL contains `url_pattern`.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>, url_pattern: impl Into<String>) -> Self {
        Self {
            inner: NewExpectation::new(session_id, url_pattern),
        }
    }

    /// Use a fixed response id.
    #[must_use]
    pub fn id(mut self, id: &str) -> Self {
        self.inner = self.inner.response_id(id);
        self
    }

    /// Expect a `POST`.
    #[must_use]
    pub fn post(mut self) -> Self {
        self.inner = self.inner.method(HttpMethod::Post);
        self
    }

    /// Expect a method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.inner = self.inner.method(method);
        self
    }

    /// Require a request header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    /// Require a body pattern.
    #[must_use]
    pub fn body_pattern(mut self, pattern: &str) -> Self {
        self.inner = self.inner.body_pattern(pattern);
        self
    }

    /// Restrict fulfilling statuses.
    #[must_use]
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.inner = self.inner.status_codes(codes);
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inner = self.inner.timeout_ms(timeout_ms);
        self
    }

    /// The shortest accepted timeout, for expiry tests.
    #[must_use]
    pub fn fast_timeout(self) -> Self {
        self.timeout_ms(crate::expect::MIN_TIMEOUT_MS)
    }

    /// Drop body and headers on capture.
    #[must_use]
    pub fn capture_nothing(mut self) -> Self {
        self.inner = self.inner.capture_body(false).capture_headers(false);
        self
    }

    /// Build the registration.
    #[must_use]
    pub fn build(self) -> NewExpectation {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exchange_builder_defaults() {
        let exchange = ExchangeBuilder::new("s1").build();
        assert_eq!(exchange.request.method, "GET");
        assert_eq!(exchange.response.status, 200);
        assert_eq!(exchange.session_id.as_str(), "s1");
    }

    #[test]
    fn json_body_sets_content_type() {
        let exchange = ExchangeBuilder::new("s1")
            .post("/api/login")
            .status(201)
            .json_body(&json!({"ok": true}))
            .build();
        assert_eq!(exchange.request.method, "POST");
        assert_eq!(exchange.response.status_text, "Created");
        assert_eq!(
            exchange.response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(exchange.response.body.as_deref(), Some(r#"{"ok":true}"#));
    }

    #[test]
    fn criteria_builder() {
        let registration = CriteriaBuilder::new("s1", "/api")
            .id("r1")
            .post()
            .fast_timeout()
            .capture_nothing()
            .build();
        assert_eq!(registration.criteria.method, HttpMethod::Post);
        assert_eq!(registration.timeout_ms, Some(1_000));
        assert!(!registration.capture.body);
        assert_eq!(registration.response_id.unwrap().as_str(), "r1");
    }
}
