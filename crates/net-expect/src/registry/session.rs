//! Per-session expectation shard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::entry::ExpectationEntry;
use crate::error::{NetExpectError, Result};
use crate::types::{ResponseId, SessionId};

/// Expectations owned by one session, in registration order.
///
/// The lock also serializes exchange matching for the session, so traffic
/// from one session never contends with another.
#[derive(Debug)]
pub(crate) struct SessionExpectations {
    session_id: SessionId,
    entries: Mutex<Vec<Arc<ExpectationEntry>>>,
}

impl SessionExpectations {
    pub(crate) fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Arc<ExpectationEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn find(&self, response_id: &ResponseId) -> Option<Arc<ExpectationEntry>> {
        self.lock()
            .iter()
            .find(|entry| &entry.response_id == response_id)
            .cloned()
    }

    /// Append an entry unless its id is already present.
    pub(crate) fn insert(&self, entry: Arc<ExpectationEntry>) -> Result<()> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.response_id == entry.response_id) {
            return Err(NetExpectError::duplicate(
                &self.session_id,
                &entry.response_id,
            ));
        }
        entries.push(entry);
        Ok(())
    }

    pub(crate) fn remove(&self, response_id: &ResponseId) -> Option<Arc<ExpectationEntry>> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| &e.response_id == response_id)?;
        Some(entries.remove(index))
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<ExpectationEntry>> {
        self.lock().clone()
    }

    pub(crate) fn drain(&self) -> Vec<Arc<ExpectationEntry>> {
        std::mem::take(&mut *self.lock())
    }

    /// Remove terminal entries resolved at least `retention` before `now`.
    pub(crate) fn reap(&self, retention: Duration, now: Instant) -> Vec<Arc<ExpectationEntry>> {
        let mut entries = self.lock();
        let (stale, live): (Vec<_>, Vec<_>) = entries.drain(..).partition(|entry| {
            entry
                .resolved_instant()
                .is_some_and(|at| now.saturating_duration_since(at) >= retention)
        });
        *entries = live;
        stale
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
