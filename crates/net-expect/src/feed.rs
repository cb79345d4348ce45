//! Traffic feeds.
//!
//! The browser session manager reports completed exchanges; a feed hands
//! them to the registry one at a time, in arrival order, on its own task.
//! Feeds for different sessions run independently.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{NetExpectError, Result};
use crate::registry::ExpectationRegistry;
use crate::types::{NetworkRequest, NetworkResponse, ObservedExchange, SessionId};

/// Default capacity of a traffic channel.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Something that accepts observed exchanges.
pub trait TrafficSink: Send + Sync {
    /// Deliver one completed exchange.
    fn deliver(&self, exchange: ObservedExchange) -> Result<()>;
}

impl TrafficSink for ExpectationRegistry {
    fn deliver(&self, exchange: ObservedExchange) -> Result<()> {
        self.on_exchange_observed(&exchange);
        Ok(())
    }
}

impl<T: TrafficSink + ?Sized> TrafficSink for Arc<T> {
    fn deliver(&self, exchange: ObservedExchange) -> Result<()> {
        (**self).deliver(exchange)
    }
}

/// Sending half of a session's traffic channel.
#[derive(Debug, Clone)]
pub struct TrafficSender {
    session_id: SessionId,
    tx: mpsc::Sender<ObservedExchange>,
}

impl TrafficSender {
    /// The session this sender reports for.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Report an exchange, waiting for channel capacity.
    pub async fn send(&self, request: NetworkRequest, response: NetworkResponse) -> Result<()> {
        let exchange = ObservedExchange::new(self.session_id.clone(), request, response);
        self.tx
            .send(exchange)
            .await
            .map_err(|_| feed_closed(&self.session_id))
    }
}

impl TrafficSink for TrafficSender {
    fn deliver(&self, exchange: ObservedExchange) -> Result<()> {
        self.tx.try_send(exchange).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NetExpectError::setup_failed(format!(
                "traffic feed for session '{}' is full",
                self.session_id
            )),
            mpsc::error::TrySendError::Closed(_) => feed_closed(&self.session_id),
        })
    }
}

fn feed_closed(session_id: &SessionId) -> NetExpectError {
    NetExpectError::setup_failed(format!("traffic feed for session '{session_id}' is closed"))
}

/// Create a bounded channel for one session's traffic.
#[must_use]
pub fn traffic_channel(
    session_id: impl Into<SessionId>,
    capacity: usize,
) -> (TrafficSender, ReceiverStream<ObservedExchange>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TrafficSender {
            session_id: session_id.into(),
            tx,
        },
        ReceiverStream::new(rx),
    )
}

/// Run a session's feed on its own task.
///
/// Exchanges are delivered in stream order. Exchanges tagged with another
/// session are dropped. The task ends when the stream does and yields the
/// number of exchanges delivered.
pub fn spawn_traffic_feed<S>(
    registry: Arc<ExpectationRegistry>,
    session_id: SessionId,
    exchanges: S,
) -> JoinHandle<u64>
where
    S: Stream<Item = ObservedExchange> + Send + 'static,
{
    tokio::spawn(async move {
        let mut exchanges = std::pin::pin!(exchanges);
        let mut delivered = 0;
        while let Some(exchange) = exchanges.next().await {
            if exchange.session_id != session_id {
                tracing::warn!(
                    session.id = %session_id,
                    other = %exchange.session_id,
                    "Dropping exchange tagged with another session"
                );
                continue;
            }
            registry.on_exchange_observed(&exchange);
            delivered += 1;
        }
        tracing::debug!(session.id = %session_id, delivered, "Traffic feed ended");
        delivered
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::NewExpectation;
    use crate::types::ExpectationStatus;

    fn request(url: &str) -> NetworkRequest {
        NetworkRequest {
            url: url.into(),
            method: "GET".into(),
            ..Default::default()
        }
    }

    fn ok() -> NetworkResponse {
        NetworkResponse {
            status: 200,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn feed_delivers_in_order_and_counts() {
        let registry = Arc::new(ExpectationRegistry::default());
        registry.open_session("s1");
        let first = registry
            .register(NewExpectation::new("s1", "/items").response_id("first"))
            .unwrap();
        let second = registry
            .register(NewExpectation::new("s1", "/items").response_id("second"))
            .unwrap();

        let (tx, rx) = traffic_channel("s1", 8);
        let feed = spawn_traffic_feed(Arc::clone(&registry), SessionId::from("s1"), rx);

        tx.send(request("/items?page=1"), ok()).await.unwrap();
        tx.send(request("/other"), ok()).await.unwrap();
        tx.send(request("/items?page=2"), ok()).await.unwrap();
        drop(tx);

        assert_eq!(feed.await.unwrap(), 3);
        let session = SessionId::from("s1");
        for id in [&first.response_id, &second.response_id] {
            assert_eq!(
                registry.get_status(&session, id).unwrap().status,
                ExpectationStatus::Fulfilled
            );
        }
        let captured = registry
            .captured(&session, &second.response_id)
            .unwrap()
            .unwrap();
        assert!(captured.url.ends_with("page=2"));
    }

    #[tokio::test]
    async fn foreign_exchanges_are_dropped() {
        let registry = Arc::new(ExpectationRegistry::default());
        let stream = futures::stream::iter(vec![
            ObservedExchange::new("s1", request("/a"), ok()),
            ObservedExchange::new("s2", request("/a"), ok()),
        ]);
        let delivered = spawn_traffic_feed(registry, SessionId::from("s1"), stream)
            .await
            .unwrap();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn sink_reports_closed_feed() {
        let (tx, rx) = traffic_channel("s1", 1);
        drop(rx);
        let err = tx
            .deliver(ObservedExchange::new("s1", request("/a"), ok()))
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
