//! Convenient re-exports for common net-expect usage.
//!
//! ```
//! use net_expect::prelude::*;
//!
//! let registration = NewExpectation::new("tab-1", "/api/items").method(HttpMethod::Post);
//! assert_eq!(registration.criteria.method, HttpMethod::Post);
//! ```

// Configuration
pub use crate::config::{LogFormat, LoggingConfig, RegistryConfig};

// Error handling
pub use crate::error::{ErrorResponse, ErrorType, NetExpectError, Result};

// Common types
pub use crate::types::{
    CaptureOptions, CapturedResponse, ExpectationStatus, HttpMethod, NetworkExpectation,
    NetworkRequest, NetworkResponse, ObservedExchange, ResponseId, SessionId,
};

// Registration and matching
pub use crate::expect::{MatchCriteria, NewExpectation};
pub use crate::registry::ExpectationRegistry;

// Traffic
pub use crate::feed::{TrafficSink, spawn_traffic_feed, traffic_channel};

// Assertions
pub use crate::assert::{AssertResponseOutcome, AssertionResult, AssertionType, ResponseAssertions};

// Tools
pub use crate::tools::{
    AssertResponseRequest, ExpectResponseReply, ExpectResponseRequest, NetworkTools,
};
