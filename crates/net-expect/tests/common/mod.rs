//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use net_expect::{
    ExpectationRegistry, Headers, NetworkRequest, NetworkResponse, ObservedExchange,
    RegistryConfig, SessionId,
};

pub const SESSION: &str = "tab-1";

pub fn session() -> SessionId {
    SessionId::from(SESSION)
}

/// A registry with [`SESSION`] open.
pub fn registry() -> Arc<ExpectationRegistry> {
    registry_with(RegistryConfig::default())
}

pub fn registry_with(config: RegistryConfig) -> Arc<ExpectationRegistry> {
    let registry = Arc::new(ExpectationRegistry::new(config));
    registry.open_session(SESSION);
    registry
}

pub fn request(method: &str, url: &str) -> NetworkRequest {
    NetworkRequest {
        url: url.into(),
        method: method.into(),
        ..Default::default()
    }
}

pub fn response(status: u16, body: Option<&str>) -> NetworkResponse {
    NetworkResponse {
        status,
        status_text: String::new(),
        headers: Headers::new(),
        body: body.map(str::to_string),
        timing_ms: 25,
    }
}

pub fn exchange(method: &str, url: &str, status: u16, body: Option<&str>) -> ObservedExchange {
    ObservedExchange::new(SESSION, request(method, url), response(status, body))
}

pub fn json_exchange(method: &str, url: &str, status: u16, body: &str) -> ObservedExchange {
    let mut exchange = exchange(method, url, status, Some(body));
    exchange
        .response
        .headers
        .insert("Content-Type".into(), "application/json".into());
    exchange
}
