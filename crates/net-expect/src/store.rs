//! Captured response storage.
//!
//! The store holds exactly the responses of fulfilled expectations that are
//! still reachable from the registry. It has no eviction policy of its own;
//! entries leave when the registry evicts the owning expectation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{CapturedResponse, ResponseId, SessionId};

type Shard = RwLock<HashMap<ResponseId, Arc<CapturedResponse>>>;

/// Thread-safe storage of captured responses keyed by session and response id.
///
/// Each session has its own shard, so writers on different sessions never
/// contend beyond the brief outer lookup.
#[derive(Debug, Default)]
pub struct CapturedResponseStore {
    shards: RwLock<HashMap<SessionId, Arc<Shard>>>,
}

impl CapturedResponseStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, session_id: &SessionId) -> Option<Arc<Shard>> {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn shard_or_insert(&self, session_id: &SessionId) -> Arc<Shard> {
        if let Some(shard) = self.shard(session_id) {
            return shard;
        }
        let mut shards = self.shards.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(shards.entry(session_id.clone()).or_default())
    }

    /// Store a response, returning the one it replaced.
    pub fn put(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
        response: impl Into<Arc<CapturedResponse>>,
    ) -> Option<Arc<CapturedResponse>> {
        let shard = self.shard_or_insert(session_id);
        let mut entries = shard.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(response_id.clone(), response.into())
    }

    /// Fetch a stored response.
    ///
    /// Returns `None` until the fulfilling exchange has been stored; consult
    /// the expectation status first.
    #[must_use]
    pub fn get(
        &self,
        session_id: &SessionId,
        response_id: &ResponseId,
    ) -> Option<Arc<CapturedResponse>> {
        let shard = self.shard(session_id)?;
        let entries = shard.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(response_id).cloned()
    }

    /// Remove a stored response. Returns whether one was present.
    pub fn evict(&self, session_id: &SessionId, response_id: &ResponseId) -> bool {
        let Some(shard) = self.shard(session_id) else {
            return false;
        };
        let mut entries = shard.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(response_id).is_some()
    }

    /// Drop every response of a session. Returns how many were removed.
    pub fn evict_session(&self, session_id: &SessionId) -> usize {
        let removed = self
            .shards
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        removed.map_or(0, |shard| {
            shard.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    /// Number of responses stored for a session.
    #[must_use]
    pub fn session_len(&self, session_id: &SessionId) -> usize {
        self.shard(session_id).map_or(0, |shard| {
            shard.read().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    /// Total number of stored responses.
    #[must_use]
    pub fn len(&self) -> usize {
        let shards = self.shards.read().unwrap_or_else(PoisonError::into_inner);
        shards
            .values()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Check if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaptureOptions, NetworkRequest, NetworkResponse, ObservedExchange};

    fn captured(status: u16) -> CapturedResponse {
        let exchange = ObservedExchange::new(
            "s1",
            NetworkRequest::default(),
            NetworkResponse {
                status,
                ..Default::default()
            },
        );
        CapturedResponse::capture(&exchange, CaptureOptions::default(), 1024)
    }

    #[test]
    fn put_get_evict() {
        let store = CapturedResponseStore::new();
        let session = SessionId::from("s1");
        let id = ResponseId::from("r1");

        assert!(store.get(&session, &id).is_none());
        assert!(store.put(&session, &id, captured(200)).is_none());
        assert_eq!(store.get(&session, &id).unwrap().status, 200);
        assert_eq!(store.len(), 1);

        assert!(store.evict(&session, &id));
        assert!(!store.evict(&session, &id));
        assert!(store.is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = CapturedResponseStore::new();
        let id = ResponseId::from("same-id");
        store.put(&SessionId::from("a"), &id, captured(200));
        store.put(&SessionId::from("b"), &id, captured(404));

        assert_eq!(store.get(&SessionId::from("a"), &id).unwrap().status, 200);
        assert_eq!(store.get(&SessionId::from("b"), &id).unwrap().status, 404);

        assert_eq!(store.evict_session(&SessionId::from("a")), 1);
        assert!(store.get(&SessionId::from("a"), &id).is_none());
        assert_eq!(store.session_len(&SessionId::from("b")), 1);
    }

    #[test]
    fn concurrent_puts_for_different_ids() {
        let store = Arc::new(CapturedResponseStore::new());
        let session = SessionId::from("s1");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let session = session.clone();
                std::thread::spawn(move || {
                    store.put(&session, &ResponseId::new(format!("r{i}")), captured(200));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.session_len(&session), 8);
    }
}
