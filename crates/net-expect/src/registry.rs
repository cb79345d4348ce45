//! The expectation registry.
//!
//! The registry owns every live expectation, runs one timer per expectation,
//! and routes observed exchanges to the first waiting expectation they
//! satisfy. State is sharded by session: each session has its own lock, so
//! traffic on one session never waits for another.
//!
//! # Lifecycle
//!
//! ```text
//! register ──▶ waiting ──match──▶ fulfilled
//!                 │
//!                 ├──deadline──▶ expired
//!                 └──setup error / session closed / evicted──▶ failed
//! ```
//!
//! Every transition out of `waiting` is a compare-and-set, so a late match
//! and a firing timer resolve to exactly one terminal state.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use net_expect::{ExpectationRegistry, ExpectationStatus, NetworkRequest, NetworkResponse};
//! use net_expect::{NewExpectation, ObservedExchange, RegistryConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> net_expect::Result<()> {
//! let registry = ExpectationRegistry::new(RegistryConfig::default());
//! registry.open_session("tab-1");
//!
//! let expectation = registry.register(NewExpectation::new("tab-1", "/api/items"))?;
//!
//! let exchange = ObservedExchange::new(
//!     "tab-1",
//!     NetworkRequest { url: "https://shop.test/api/items".into(), method: "GET".into(), ..Default::default() },
//!     NetworkResponse { status: 200, ..Default::default() },
//! );
//! registry.on_exchange_observed(&exchange);
//!
//! let done = registry
//!     .wait_for(&"tab-1".into(), &expectation.response_id, Duration::from_secs(1))
//!     .await?;
//! assert_eq!(done.status, ExpectationStatus::Fulfilled);
//! # Ok(())
//! # }
//! ```

mod entry;
mod session;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use self::entry::ExpectationEntry;
use self::session::SessionExpectations;
use crate::config::RegistryConfig;
use crate::error::{NetExpectError, Result};
use crate::expect::{NewExpectation, RegexCache, check, validate_timeout};
use crate::metrics::RegistryMetrics;
use crate::store::CapturedResponseStore;
use crate::types::{
    CapturedResponse, ExpectationStatus, NetworkExpectation, NetworkRequest, NetworkResponse,
    ObservedExchange, ResponseId, SessionId,
};

/// Failure reason recorded when a session closes under a waiting expectation.
pub const REASON_SESSION_CLOSED: &str = "session closed";

/// Failure reason recorded when a waiting expectation is evicted.
pub const REASON_EVICTED: &str = "evicted";

/// Owner of all expectations and their captured responses.
#[derive(Debug)]
pub struct ExpectationRegistry {
    config: RegistryConfig,
    sessions: RwLock<HashMap<SessionId, Arc<SessionExpectations>>>,
    store: CapturedResponseStore,
    cache: RegexCache,
    metrics: Arc<RegistryMetrics>,
}

impl Default for ExpectationRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ExpectationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            store: CapturedResponseStore::new(),
            cache: RegexCache::default(),
            metrics: Arc::new(RegistryMetrics::new()),
        }
    }

    /// The configuration this registry was built with.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Live counters.
    #[must_use]
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Captured responses of fulfilled expectations.
    #[must_use]
    pub const fn store(&self) -> &CapturedResponseStore {
        &self.store
    }

    /// Regex cache shared by every registration.
    #[must_use]
    pub const fn regex_cache(&self) -> &RegexCache {
        &self.cache
    }

    /// Make a session known. Returns `false` if it already was.
    pub fn open_session(&self, session_id: impl Into<SessionId>) -> bool {
        let session_id = session_id.into();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&session_id) {
            return false;
        }
        tracing::debug!(session.id = %session_id, "Session opened");
        sessions.insert(
            session_id.clone(),
            Arc::new(SessionExpectations::new(session_id)),
        );
        true
    }

    /// Check if a session is open.
    #[must_use]
    pub fn has_session(&self, session_id: &SessionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_id)
    }

    /// Open sessions, in no particular order.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Close a session.
    ///
    /// Waiting expectations fail with [`REASON_SESSION_CLOSED`] and their
    /// waiters wake. Every expectation and captured response of the session
    /// is dropped. Returns how many expectations were removed.
    pub fn close_session(&self, session_id: &SessionId) -> Result<usize> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .ok_or_else(|| NetExpectError::session_not_found(session_id))?;

        let entries = session.drain();
        for entry in &entries {
            entry.cancel_timer();
            self.fail(entry, REASON_SESSION_CLOSED);
        }
        self.metrics.evicted.add(entries.len() as u64);
        self.store.evict_session(session_id);

        tracing::debug!(
            session.id = %session_id,
            removed = entries.len(),
            "Session closed"
        );
        Ok(entries.len())
    }

    fn session(&self, session_id: &SessionId) -> Result<Arc<SessionExpectations>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| NetExpectError::session_not_found(session_id))
    }

    fn entry(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Result<Arc<ExpectationEntry>> {
        self.session(session_id)?
            .find(response_id)
            .ok_or_else(|| NetExpectError::not_found(session_id, response_id))
    }

    /// Register an expectation and start its timer.
    ///
    /// Validation happens before any state is created: criteria first, then
    /// the timeout. Terminal entries past the retention window are reaped
    /// from the session before the duplicate check, so their ids can be
    /// reused.
    ///
    /// # Errors
    ///
    /// - [`NetExpectError::InvalidPattern`], [`NetExpectError::InvalidStatusCode`]
    ///   or [`NetExpectError::InvalidTimeout`] for bad input.
    /// - [`NetExpectError::SessionNotFound`] if the session is not open.
    /// - [`NetExpectError::DuplicateExpectation`] if the id is still held.
    /// - [`NetExpectError::SetupFailed`] if no tokio runtime is available to
    ///   run the timer. The expectation stays queryable as `failed`.
    pub fn register(&self, request: NewExpectation) -> Result<NetworkExpectation> {
        let compiled = request.criteria.compile(&self.cache)?;
        let timeout_ms =
            validate_timeout(request.timeout_ms.unwrap_or(self.config.default_timeout_ms))?;

        let session = self.session(&request.session_id)?;
        self.reap_session(&session);

        let response_id = request.response_id.unwrap_or_else(ResponseId::generate);
        let entry = Arc::new(ExpectationEntry::new(
            request.session_id,
            response_id,
            request.criteria,
            compiled,
            request.capture,
            timeout_ms,
        ));
        session.insert(Arc::clone(&entry))?;

        self.metrics.registered.inc();
        self.metrics.waiting.inc();

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let reason = format!("cannot schedule timeout: {e}");
                self.fail(&entry, &reason);
                return Err(NetExpectError::setup_failed(reason));
            }
        };
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let timer = handle.spawn(expire_at(
            Arc::clone(&entry),
            Arc::clone(&self.metrics),
            deadline,
        ));
        entry.arm_timer(timer.abort_handle());

        tracing::debug!(
            session.id = %entry.session_id,
            response.id = %entry.response_id,
            url_pattern = %entry.criteria.url_pattern,
            method = %entry.criteria.method,
            timeout_ms,
            "Expectation registered"
        );
        Ok(entry.snapshot())
    }

    fn fail(&self, entry: &ExpectationEntry, reason: &str) {
        if entry.resolve(ExpectationStatus::Failed, Some(reason.to_string())) {
            self.metrics.failed.inc();
            self.metrics.waiting.dec();
            tracing::warn!(
                session.id = %entry.session_id,
                response.id = %entry.response_id,
                reason,
                "Expectation failed"
            );
        }
    }

    /// Route one completed exchange.
    ///
    /// Waiting expectations of the exchange's session are tried in
    /// registration order and the first that matches is fulfilled; the
    /// exchange is not offered to the rest. Exchanges for unknown sessions
    /// are ignored. Terminal entries past the retention window are reaped
    /// from the session first. Returns the id of the fulfilled expectation,
    /// if any.
    pub fn on_exchange_observed(&self, exchange: &ObservedExchange) -> Option<ResponseId> {
        self.metrics.exchanges_observed.inc();

        let Ok(session) = self.session(&exchange.session_id) else {
            tracing::trace!(
                session.id = %exchange.session_id,
                url = %exchange.request.url,
                "Exchange for unknown session ignored"
            );
            return None;
        };
        self.reap_session(&session);

        let entries = session.lock();
        for entry in entries.iter() {
            if entry.status() != ExpectationStatus::Waiting {
                continue;
            }
            if let Err(miss) = check(exchange, &entry.compiled) {
                tracing::trace!(
                    session.id = %exchange.session_id,
                    response.id = %entry.response_id,
                    url = %exchange.request.url,
                    %miss,
                    "Exchange did not match"
                );
                continue;
            }

            // Stored before the transition so a fulfilled status always has
            // a response behind it.
            let captured = Arc::new(CapturedResponse::capture(
                exchange,
                entry.capture,
                self.config.max_body_bytes,
            ));
            self.store
                .put(&entry.session_id, &entry.response_id, Arc::clone(&captured));

            if entry.fulfil(captured) {
                entry.cancel_timer();
                self.metrics.fulfilled.inc();
                self.metrics.exchanges_matched.inc();
                self.metrics.waiting.dec();
                tracing::info!(
                    session.id = %entry.session_id,
                    response.id = %entry.response_id,
                    url = %exchange.request.url,
                    status = exchange.response.status,
                    "Expectation fulfilled"
                );
                return Some(entry.response_id.clone());
            }

            // The timer won the race.
            self.store.evict(&entry.session_id, &entry.response_id);
        }

        None
    }

    /// Convenience wrapper building the exchange from its parts.
    pub fn observe(
        &self,
        session_id: impl Into<SessionId>,
        request: NetworkRequest,
        response: NetworkResponse,
    ) -> Option<ResponseId> {
        self.on_exchange_observed(&ObservedExchange::new(session_id, request, response))
    }

    /// Current snapshot of an expectation.
    pub fn get_status(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Result<NetworkExpectation> {
        Ok(self.entry(session_id, response_id)?.snapshot())
    }

    /// Snapshots of a session's expectations in registration order.
    pub fn list(&self, session_id: &SessionId) -> Result<Vec<NetworkExpectation>> {
        Ok(self
            .session(session_id)?
            .snapshot()
            .iter()
            .map(|entry| entry.snapshot())
            .collect())
    }

    /// Whether the expectation's timer is still scheduled.
    pub fn has_pending_timer(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Result<bool> {
        Ok(self.entry(session_id, response_id)?.has_pending_timer())
    }

    /// The response that fulfilled an expectation.
    ///
    /// `Ok(None)` while the expectation is not fulfilled.
    pub fn captured(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Result<Option<Arc<CapturedResponse>>> {
        let entry = self.entry(session_id, response_id)?;
        if entry.status() != ExpectationStatus::Fulfilled {
            return Ok(None);
        }
        Ok(entry.response())
    }

    /// Wait until the expectation is terminal, for at most `max_wait`.
    ///
    /// Giving up does not touch the expectation: it keeps its own deadline
    /// and can still be fulfilled later.
    ///
    /// # Errors
    ///
    /// [`NetExpectError::WaitTimeout`] if `max_wait` elapses first, or a
    /// not-found error if the session or expectation does not exist.
    pub async fn wait_for(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
        max_wait: Duration,
    ) -> Result<NetworkExpectation> {
        Ok(self
            .wait_for_entry(session_id, response_id, max_wait)
            .await?
            .snapshot())
    }

    /// Like [`wait_for`](Self::wait_for), also returning the fulfilling
    /// response.
    ///
    /// The response is taken from the expectation itself, so it is present
    /// for every fulfilled snapshot even if the expectation is evicted or
    /// reaped concurrently.
    ///
    /// # Errors
    ///
    /// As for [`wait_for`](Self::wait_for).
    pub async fn wait_for_response(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
        max_wait: Duration,
    ) -> Result<(NetworkExpectation, Option<Arc<CapturedResponse>>)> {
        let entry = self
            .wait_for_entry(session_id, response_id, max_wait)
            .await?;
        Ok((entry.snapshot(), entry.response()))
    }

    async fn wait_for_entry(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
        max_wait: Duration,
    ) -> Result<Arc<ExpectationEntry>> {
        let entry = self.entry(session_id, response_id)?;
        let mut status = entry.subscribe();

        // The sender lives in the entry held here, so the channel cannot
        // close first; once woken the snapshot is authoritative.
        let woke = tokio::time::timeout(max_wait, status.wait_for(|s| s.is_terminal()))
            .await
            .is_ok();
        if woke {
            return Ok(entry);
        }
        Err(NetExpectError::WaitTimeout {
            response_id: response_id.clone(),
            waited: max_wait,
            status: entry.status(),
        })
    }

    /// Remove an expectation and its captured response.
    ///
    /// A still-waiting expectation is failed with [`REASON_EVICTED`] first,
    /// so anyone waiting on it wakes up. Returns the final snapshot.
    pub fn evict(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Result<NetworkExpectation> {
        let entry = self
            .session(session_id)?
            .remove(response_id)
            .ok_or_else(|| NetExpectError::not_found(session_id, response_id))?;

        entry.cancel_timer();
        self.fail(&entry, REASON_EVICTED);
        self.store.evict(session_id, response_id);
        self.metrics.evicted.inc();

        tracing::debug!(
            session.id = %session_id,
            response.id = %response_id,
            status = %entry.status(),
            "Expectation evicted"
        );
        Ok(entry.snapshot())
    }

    /// Evict terminal expectations older than the retention window, across
    /// all sessions. Returns how many were removed.
    ///
    /// Each session is also reaped on its own whenever it registers an
    /// expectation or observes an exchange. A session that does neither
    /// keeps its terminal entries, and their captured bodies, until this
    /// runs or the session closes.
    pub fn reap_terminal(&self) -> usize {
        let sessions: Vec<_> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        sessions
            .iter()
            .map(|session| self.reap_session(session))
            .sum()
    }

    fn reap_session(&self, session: &SessionExpectations) -> usize {
        let reaped = session.reap(self.config.terminal_retention(), Instant::now());
        for entry in &reaped {
            self.store.evict(&entry.session_id, &entry.response_id);
            tracing::debug!(
                session.id = %entry.session_id,
                response.id = %entry.response_id,
                status = %entry.status(),
                "Terminal expectation reaped"
            );
        }
        self.metrics.evicted.add(reaped.len() as u64);
        reaped.len()
    }

    /// Number of expectations held for a session, terminal ones included.
    pub fn session_len(&self, session_id: &SessionId) -> Result<usize> {
        Ok(self.session(session_id)?.len())
    }
}

/// Timer body: expire the entry at `deadline` unless something else won.
async fn expire_at(
    entry: Arc<ExpectationEntry>,
    metrics: Arc<RegistryMetrics>,
    deadline: Instant,
) {
    tokio::time::sleep_until(deadline).await;
    entry.disarm_timer();
    if entry.resolve(ExpectationStatus::Expired, None) {
        metrics.expired.inc();
        metrics.waiting.dec();
        tracing::warn!(
            session.id = %entry.session_id,
            response.id = %entry.response_id,
            timeout_ms = entry.timeout_ms(),
            "Expectation expired"
        );
    }
}
