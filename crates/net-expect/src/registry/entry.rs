//! A single registered expectation.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::expect::{CompiledCriteria, MatchCriteria};
use crate::types::{
    CaptureOptions, CapturedResponse, ExpectationStatus, NetworkExpectation, ResponseId,
    SessionId, StatusCell,
};

/// How and when an expectation left `waiting`.
#[derive(Debug)]
struct Resolution {
    at: DateTime<Utc>,
    instant: Instant,
    reason: Option<String>,
}

/// Live state of one expectation.
///
/// The status only ever moves out of `waiting` through [`StatusCell`], so a
/// fulfilling exchange and a firing timer cannot both win. The timer handle
/// is kept next to the status so cancelling it is explicit.
#[derive(Debug)]
pub(crate) struct ExpectationEntry {
    pub(crate) response_id: ResponseId,
    pub(crate) session_id: SessionId,
    pub(crate) criteria: MatchCriteria,
    pub(crate) compiled: CompiledCriteria,
    pub(crate) capture: CaptureOptions,
    timeout_ms: u64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    status: StatusCell,
    resolution: OnceLock<Resolution>,
    response: OnceLock<Arc<CapturedResponse>>,
    notify: watch::Sender<ExpectationStatus>,
    timer: Mutex<Option<AbortHandle>>,
}

impl ExpectationEntry {
    pub(crate) fn new(
        session_id: SessionId,
        response_id: ResponseId,
        criteria: MatchCriteria,
        compiled: CompiledCriteria,
        capture: CaptureOptions,
        timeout_ms: u64,
    ) -> Self {
        let created_at = Utc::now();
        let expires_at = created_at + chrono::Duration::milliseconds(timeout_ms as i64);
        let (notify, _) = watch::channel(ExpectationStatus::Waiting);

        Self {
            response_id,
            session_id,
            criteria,
            compiled,
            capture,
            timeout_ms,
            created_at,
            expires_at,
            status: StatusCell::new(ExpectationStatus::Waiting),
            resolution: OnceLock::new(),
            response: OnceLock::new(),
            notify,
            timer: Mutex::new(None),
        }
    }

    pub(crate) fn status(&self) -> ExpectationStatus {
        self.status.load()
    }

    pub(crate) const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Leave `waiting` for `to`. Returns `false` if another transition won,
    /// in which case nothing about the entry changes.
    pub(crate) fn resolve(&self, to: ExpectationStatus, reason: Option<String>) -> bool {
        self.settle(to, reason, None)
    }

    /// Leave `waiting` for `fulfilled`, keeping `response` with the entry so
    /// waiters still see it after the store lets go.
    pub(crate) fn fulfil(&self, response: Arc<CapturedResponse>) -> bool {
        self.settle(ExpectationStatus::Fulfilled, None, Some(response))
    }

    fn settle(
        &self,
        to: ExpectationStatus,
        reason: Option<String>,
        response: Option<Arc<CapturedResponse>>,
    ) -> bool {
        if !self.status.transition(to) {
            return false;
        }
        if let Some(response) = response {
            let _ = self.response.set(response);
        }
        let _ = self.resolution.set(Resolution {
            at: Utc::now(),
            instant: Instant::now(),
            reason,
        });
        self.notify.send_replace(to);
        true
    }

    /// Store the timer that will expire this entry.
    pub(crate) fn arm_timer(&self, handle: AbortHandle) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.status().is_terminal() {
            handle.abort();
        } else {
            *timer = Some(handle);
        }
    }

    /// Abort the timer if it is still pending. Returns whether one was.
    pub(crate) fn cancel_timer(&self) -> bool {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        handle.map(|h| h.abort()).is_some()
    }

    /// Forget the timer without aborting it (called by the timer itself).
    pub(crate) fn disarm_timer(&self) {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn has_pending_timer(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ExpectationStatus> {
        self.notify.subscribe()
    }

    /// The fulfilling response, set before waiters are woken.
    pub(crate) fn response(&self) -> Option<Arc<CapturedResponse>> {
        self.response.get().cloned()
    }

    /// When the entry became terminal, on the tokio clock.
    pub(crate) fn resolved_instant(&self) -> Option<Instant> {
        self.resolution.get().map(|r| r.instant)
    }

    pub(crate) fn snapshot(&self) -> NetworkExpectation {
        let resolution = self.resolution.get();
        NetworkExpectation {
            response_id: self.response_id.clone(),
            session_id: self.session_id.clone(),
            criteria: self.criteria.clone(),
            timeout_ms: self.timeout_ms,
            capture_response_body: self.capture.body,
            capture_response_headers: self.capture.headers,
            status: self.status(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            resolved_at: resolution.map(|r| r.at),
            failure_reason: resolution.and_then(|r| r.reason.clone()),
        }
    }
}
