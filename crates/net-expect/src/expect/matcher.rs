//! Pure matching of observed exchanges against compiled criteria.
//!
//! Nothing here touches shared state or time, so the same inputs always
//! produce the same answer.

use std::fmt;

use super::criteria::CompiledCriteria;
use crate::types::{NetworkRequest, ObservedExchange, header_value};

/// The first clause that rejected an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMiss {
    /// The URL pattern was not found in the request URL.
    Url,
    /// The request used a different method.
    Method {
        /// Method seen on the wire.
        actual: String,
    },
    /// A required request header was missing.
    HeaderMissing {
        /// Header name.
        name: String,
    },
    /// A required request header had a different value.
    HeaderMismatch {
        /// Header name.
        name: String,
        /// Value seen on the wire.
        actual: String,
    },
    /// The body pattern was not found (or there was no body).
    Body,
    /// The response status is not in the expected set.
    Status {
        /// Status seen on the wire.
        actual: u16,
    },
}

impl fmt::Display for MatchMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => write!(f, "url pattern not found"),
            Self::Method { actual } => write!(f, "method {actual} differs"),
            Self::HeaderMissing { name } => write!(f, "header {name} missing"),
            Self::HeaderMismatch { name, actual } => {
                write!(f, "header {name} has value {actual:?}")
            }
            Self::Body => write!(f, "body pattern not found"),
            Self::Status { actual } => write!(f, "status {actual} not expected"),
        }
    }
}

/// Check the request side of an exchange: URL, method, headers and body.
pub fn check_request(
    request: &NetworkRequest,
    criteria: &CompiledCriteria,
) -> Result<(), MatchMiss> {
    if !criteria.url.is_match(&request.url) {
        return Err(MatchMiss::Url);
    }

    if !criteria.method.matches(&request.method) {
        return Err(MatchMiss::Method {
            actual: request.method.clone(),
        });
    }

    for (name, expected) in &criteria.headers {
        match header_value(&request.headers, name) {
            None => {
                return Err(MatchMiss::HeaderMissing { name: name.clone() });
            }
            Some(actual) if actual != expected => {
                return Err(MatchMiss::HeaderMismatch {
                    name: name.clone(),
                    actual: actual.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    if let Some(body) = &criteria.body {
        let text = request.body.as_deref().unwrap_or_default();
        if !body.is_match(text) {
            return Err(MatchMiss::Body);
        }
    }

    Ok(())
}

/// Check every clause, reporting the first one that fails.
///
/// The status gate only applies to the response side; a request that
/// matches but receives an unexpected status does not fulfill.
pub fn check(exchange: &ObservedExchange, criteria: &CompiledCriteria) -> Result<(), MatchMiss> {
    check_request(&exchange.request, criteria)?;
    if !status_matches(exchange.response.status, criteria) {
        return Err(MatchMiss::Status {
            actual: exchange.response.status,
        });
    }
    Ok(())
}

/// Whether the request side matches.
#[must_use]
pub fn request_matches(request: &NetworkRequest, criteria: &CompiledCriteria) -> bool {
    check_request(request, criteria).is_ok()
}

/// Whether a response status passes the status gate.
#[must_use]
pub fn status_matches(status: u16, criteria: &CompiledCriteria) -> bool {
    criteria
        .status_codes
        .as_ref()
        .is_none_or(|codes| codes.contains(&status))
}

/// Whether a completed exchange fulfills the criteria.
#[must_use]
pub fn matches(exchange: &ObservedExchange, criteria: &CompiledCriteria) -> bool {
    check(exchange, criteria).is_ok()
}
