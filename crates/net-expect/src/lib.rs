//! net-expect: network expectations and response assertions for browser automation
//!
//! This crate lets a test or agent declare that a network exchange *will*
//! happen on a browser session, wait for it without blocking the traffic
//! feed, and then assert structured properties of the response that
//! fulfilled it.
//!
//! # Features
//!
//! - **Per-session expectation registry** with one timer per expectation and
//!   compare-and-set transitions, so a late match and a deadline never both win
//! - **Pure matcher** over URL regex, method, headers, body regex and status set
//! - **Captured response store** holding exactly the fulfilled working set
//! - **Assertion evaluator** producing one typed result per clause, never an error
//! - **Tool surface** mirroring the `expect_response` / `assert_response` calls
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use net_expect::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::result::Result<(), ErrorResponse> {
//! let registry = Arc::new(ExpectationRegistry::default());
//! registry.open_session("tab-1");
//! let tools = NetworkTools::new(Arc::clone(&registry));
//!
//! let mut expect = ExpectResponseRequest::new("tab-1", "/api/login");
//! expect.method = Some("POST".into());
//! let reply = tools.expect_response(expect)?;
//!
//! // The browser session manager reports traffic as it completes.
//! registry.observe(
//!     "tab-1",
//!     NetworkRequest { url: "https://x/api/login".into(), method: "POST".into(), ..Default::default() },
//!     NetworkResponse { status: 200, body: Some(r#"{"ok":true}"#.into()), ..Default::default() },
//! );
//!
//! let outcome = tools
//!     .assert_response(AssertResponseRequest::new(
//!         "tab-1",
//!         reply.response_id,
//!         ResponseAssertions::new().status_code(200).json_path("$.ok", true),
//!     ))
//!     .await?;
//! assert!(outcome.success);
//! # Ok(())
//! # }
//! ```

pub mod assert;
pub mod config;
pub mod error;
pub mod expect;
pub mod feed;
pub mod logging;
pub mod metrics;
pub mod prelude;
pub mod registry;
pub mod store;
pub mod tools;
pub mod types;

pub use assert::{
    AssertResponseOutcome, AssertionResult, AssertionType, CompiledAssertions, EvaluateOptions,
    ResponseAssertions, evaluate,
};
pub use config::{LogFormat, LoggingConfig, RegistryConfig};
pub use error::{ClauseError, ErrorResponse, ErrorType, NetExpectError, Result};
pub use expect::{
    CacheStats, CompiledCriteria, CompiledRegex, MatchCriteria, NewExpectation, RegexCache,
    matches,
};
pub use feed::{TrafficSender, TrafficSink, spawn_traffic_feed, traffic_channel};
pub use logging::init_tracing;
pub use metrics::{MetricsSnapshot, RegistryMetrics};
pub use registry::ExpectationRegistry;
pub use store::CapturedResponseStore;
pub use tools::{
    AssertResponseRequest, ExpectResponseReply, ExpectResponseRequest, NetworkTools,
};
pub use types::{
    CaptureOptions, CapturedResponse, ExpectationStatus, Headers, HttpMethod, NetworkExpectation,
    NetworkRequest, NetworkResponse, ObservedExchange, ResponseId, SessionId,
};

// Test utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::{CriteriaBuilder, ExchangeBuilder, OutcomeAssertions};
