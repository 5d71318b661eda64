//! Test utilities for webhook delivery.
//!
//! Provides an in-memory event store, a queue that records scheduled tasks
//! and a local HTTP receiver that captures deliveries.

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use pingfox_common::{AppError, AppResult, SIGNATURE_HEADER};
use pingfox_db::entities::webhook_event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::services::delivery::{DeliveryTask, WebhookQueue};
use crate::services::store::WebhookEventStore;

/// Event store backed by a hash map.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, webhook_event::Model>>,
    concurrent_attempts: AtomicI32,
}

impl MemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event directly, bypassing the dispatcher.
    pub async fn seed(&self, event: webhook_event::Model) {
        self.events.write().await.insert(event.id.clone(), event);
    }

    /// Current state of an event.
    pub async fn get(&self, id: &str) -> Option<webhook_event::Model> {
        self.events.read().await.get(id).cloned()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether the store holds no events.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Make each of the next `attempts` calls to `record_attempt` find one
    /// more attempt, recorded by another worker in the meantime.
    pub fn simulate_concurrent_attempts(&self, attempts: i32) {
        self.concurrent_attempts.store(attempts, Ordering::SeqCst);
    }
}

#[async_trait]
impl WebhookEventStore for MemoryEventStore {
    async fn insert(&self, event: webhook_event::Model) -> AppResult<webhook_event::Model> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(AppError::Conflict(format!("Duplicate event ID {}", event.id)));
        }
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<webhook_event::Model>> {
        Ok(self.get(id).await)
    }

    async fn record_attempt(
        &self,
        id: &str,
        expected_attempts: i32,
        delivered: bool,
        status: &str,
    ) -> AppResult<bool> {
        let mut events = self.events.write().await;
        let Some(event) = events.get_mut(id) else {
            return Ok(false);
        };

        if self.concurrent_attempts.load(Ordering::SeqCst) > 0 {
            self.concurrent_attempts.fetch_sub(1, Ordering::SeqCst);
            event.delivery_attempts += 1;
        }
        if event.delivery_attempts != expected_attempts {
            return Ok(false);
        }

        event.delivery_attempts += 1;
        event.last_delivery_status = Some(status.to_string());
        if delivered {
            event.delivered = true;
        }
        Ok(true)
    }

    async fn find_failed(&self, limit: u64) -> AppResult<Vec<webhook_event::Model>> {
        let failed: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| !e.delivered && e.delivery_attempts > 0)
            .cloned()
            .collect();
        Ok(newest_first(failed, limit))
    }

    async fn find_by_team(
        &self,
        team_id: &str,
        limit: u64,
    ) -> AppResult<Vec<webhook_event::Model>> {
        let events: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.team_id == team_id)
            .cloned()
            .collect();
        Ok(newest_first(events, limit))
    }
}

fn newest_first(
    mut events: Vec<webhook_event::Model>,
    limit: u64,
) -> Vec<webhook_event::Model> {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    events
}

/// Queue that records scheduled deliveries instead of running them.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<DeliveryTask>>,
    retries: Mutex<Vec<(DeliveryTask, Duration)>>,
    fail: bool,
}

impl RecordingQueue {
    /// Create a queue that accepts every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that rejects every task.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Tasks scheduled so far.
    #[must_use]
    pub fn tasks(&self) -> Vec<DeliveryTask> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Retries scheduled so far, with their delays.
    #[must_use]
    pub fn retries(&self) -> Vec<(DeliveryTask, Duration)> {
        self.retries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WebhookQueue for RecordingQueue {
    async fn queue_delivery(&self, task: DeliveryTask) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Queue("queue unavailable".to_string()));
        }
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
        Ok(())
    }

    async fn queue_retry(&self, task: DeliveryTask, delay: Duration) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Queue("queue unavailable".to_string()));
        }
        self.retries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((task, delay));
        Ok(())
    }
}

/// A request captured by [`TestReceiver`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub signature: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct ReceiverState {
    statuses: Arc<Vec<u16>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// Local webhook endpoint running on an ephemeral port.
pub struct TestReceiver {
    url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl TestReceiver {
    /// Endpoint URL to deliver to.
    #[must_use]
    pub fn url(&self) -> String {
        self.url.clone()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn capture(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let index = {
        let mut requests = state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        requests.push(CapturedRequest {
            content_type: header_value(header::CONTENT_TYPE.as_str()),
            user_agent: header_value(header::USER_AGENT.as_str()),
            signature: header_value(SIGNATURE_HEADER),
            body: body.to_vec(),
        });
        requests.len() - 1
    };

    let status = state
        .statuses
        .get(index)
        .or_else(|| state.statuses.last())
        .copied()
        .unwrap_or(200);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if status.is_success() { "ok" } else { "unavailable" };
    (status, body)
}

/// Start a receiver answering with `statuses` in order; the last one repeats.
pub async fn spawn_receiver(statuses: Vec<u16>) -> TestReceiver {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = ReceiverState {
        statuses: Arc::new(statuses),
        requests: requests.clone(),
    };
    let app = Router::new().route("/hook", post(capture)).with_state(state);

    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        return TestReceiver {
            url: unreachable_url().await,
            requests,
        };
    };
    let url = listener
        .local_addr()
        .map(|addr| format!("http://{addr}/hook"))
        .unwrap_or_default();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestReceiver { url, requests }
}

/// URL of a local port nothing listens on.
pub async fn unreachable_url() -> String {
    let addr = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener.local_addr().ok(),
        Err(_) => None,
    };
    addr.map_or_else(
        || "http://127.0.0.1:9/hook".to_string(),
        |addr| format!("http://{addr}/hook"),
    )
}
