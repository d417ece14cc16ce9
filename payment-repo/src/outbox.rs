//! Forwards outbox events to an HTTP endpoint.
//!
//! One delivery attempt per event: the outcome is recorded and the event is
//! never picked up again.

use std::sync::Arc;
use std::time::Duration;

use payment_types::{OutboxEvent, OutboxStatus};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::Repo;

/// Events fetched per poll.
const BATCH_SIZE: i64 = 10;

pub struct OutboxWorker {
    repo: Arc<Repo>,
    client: reqwest::Client,
    target_url: String,
    poll_interval: Duration,
}

impl OutboxWorker {
    pub fn new(repo: Arc<Repo>, target_url: String) -> Self {
        Self {
            repo,
            client: reqwest::Client::new(),
            target_url,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!("Starting outbox worker sending to {}", self.target_url);
        loop {
            if let Err(e) = self.run_once().await {
                error!("Failed to fetch outbox events: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Delivers one batch of pending events; returns how many were attempted.
    pub async fn run_once(&self) -> Result<usize, payment_types::RepoError> {
        let events = self.repo.pending_events(BATCH_SIZE).await?;
        if !events.is_empty() {
            info!("Forwarding {} outbox events", events.len());
        }

        let count = events.len();
        for event in events {
            self.deliver(event).await;
        }
        Ok(count)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    async fn deliver(&self, event: OutboxEvent) {
        let result = self
            .client
            .post(&self.target_url)
            .header("X-Event-Type", &event.event_type)
            .json(&event.payload)
            .send()
            .await;

        let (status, last_error) = match result {
            Ok(resp) if resp.status().is_success() => (OutboxStatus::Delivered, None),
            Ok(resp) => (
                OutboxStatus::Failed,
                Some(format!("HTTP {}", resp.status())),
            ),
            Err(e) => (OutboxStatus::Failed, Some(e.to_string())),
        };

        if let Some(reason) = &last_error {
            warn!("Event delivery failed: {}", reason);
        }

        if let Err(e) = self.repo.mark_event(event.id, status, last_error).await {
            error!("Failed to update outbox status: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{Router, extract::State, http::HeaderMap, routing::post};
    use payment_types::{
        EventDispatcher, Money, OrderId, Payment, PaymentEvent, PaymentId, UserId,
    };

    use super::*;
    use crate::InMemoryRepo;

    type Received = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

    async fn record(
        State(received): State<Received>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<serde_json::Value>,
    ) {
        let event_type = headers
            .get("X-Event-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        received.lock().unwrap().push((event_type, body));
    }

    async fn spawn_sink() -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route("/events", post(record))
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/events", addr), received)
    }

    async fn repo_with_event() -> (Arc<Repo>, PaymentId) {
        let repo = Arc::new(Repo::Memory(InMemoryRepo::new()));
        let payment = Payment::new(
            PaymentId::new(),
            OrderId::new(),
            UserId::new(),
            Money::from_minor(9999).unwrap(),
        )
        .unwrap();
        repo.dispatch(&PaymentEvent::initiated(&payment))
            .await
            .unwrap();
        (repo, payment.id)
    }

    #[tokio::test]
    async fn test_delivers_pending_events() {
        let (url, received) = spawn_sink().await;
        let (repo, payment_id) = repo_with_event().await;
        let worker = OutboxWorker::new(repo.clone(), url);

        assert_eq!(worker.run_once().await.unwrap(), 1);

        let received = received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "PaymentInitiated");
        assert_eq!(received[0].1["type"], "PaymentInitiated");
        assert_eq!(received[0].1["payment_id"], payment_id.to_string());

        assert!(repo.pending_events(10).await.unwrap().is_empty());
        assert_eq!(worker.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_sink_marks_event_failed_without_retry() {
        // Nothing listens on the discard port.
        let (repo, _) = repo_with_event().await;
        let worker = OutboxWorker::new(repo.clone(), "http://127.0.0.1:9/events".into());

        assert_eq!(worker.run_once().await.unwrap(), 1);
        assert_eq!(worker.run_once().await.unwrap(), 0);

        let Repo::Memory(memory) = repo.as_ref() else {
            unreachable!()
        };
        let events = memory.events().await;
        assert_eq!(events[0].status, OutboxStatus::Failed);
        assert_eq!(events[0].attempts, 1);
        assert!(events[0].last_error.is_some());
    }
}
