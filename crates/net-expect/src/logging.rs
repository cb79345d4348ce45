//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host. [`init_tracing`] is a convenience for hosts that want the
//! defaults described by [`LoggingConfig`].

use tracing::Span;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{NetExpectError, Result};
use crate::types::{ResponseId, SessionId};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides the configured filter when set. Calling this twice
/// returns a configuration error rather than panicking.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            NetExpectError::config(format!("invalid log filter '{}': {e}", config.filter))
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .try_init(),
    };

    result.map_err(|e| NetExpectError::config(format!("tracing already initialized: {e}")))
}

/// Span covering work on one expectation.
#[must_use]
pub fn expectation_span(session_id: &SessionId, response_id: &ResponseId) -> Span {
    tracing::info_span!(
        "expectation",
        session.id = %session_id,
        response.id = %response_id,
    )
}
