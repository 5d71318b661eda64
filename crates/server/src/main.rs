//! PingFox webhook server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use apalis::prelude::*;
use axum::Router;
use pingfox_api::{AppState, router as api_router};
use pingfox_common::Config;
use pingfox_core::{EventStore, WebhookDispatcher, WebhookQueueService};
use pingfox_db::repositories::WebhookEventRepository;
use pingfox_queue::{
    DeliverWebhookJob, RedisWebhookQueue, RetryConfig, WebhookWorkerContext,
    deliver_webhook_worker,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pingfox=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting PingFox webhook server...");

    let config = Config::load()?;

    // Database
    let db = Arc::new(pingfox_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    pingfox_db::migrate(&db).await?;
    info!("Migrations completed");

    // Redis job queue
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let redis_storage = apalis_redis::RedisStorage::<DeliverWebhookJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // Dispatcher
    let event_store: EventStore = Arc::new(WebhookEventRepository::new(Arc::clone(&db)));
    let webhook_queue: WebhookQueueService =
        Arc::new(RedisWebhookQueue::new(redis_storage.clone()));
    let dispatcher = Arc::new(WebhookDispatcher::new(
        event_store.clone(),
        webhook_queue,
        &config.webhook,
    )?);

    // Delivery worker
    let worker_ctx =
        WebhookWorkerContext::new(dispatcher, RetryConfig::from_config(&config.webhook));
    let concurrency = config.webhook.worker_concurrency.max(1);
    tokio::spawn(async move {
        let monitor = Monitor::new().register({
            WorkerBuilder::new("deliver-webhook")
                .concurrency(concurrency)
                .data(worker_ctx)
                .backend(redis_storage)
                .build_fn(deliver_webhook_worker)
        });

        if let Err(e) = monitor.run().await {
            tracing::error!(error = %e, "Webhook delivery worker failed");
        }
    });
    info!(concurrency = concurrency, "Webhook delivery worker started");

    // Router
    let state = AppState::new(event_store, config.webhook.receiver_secret.clone());
    let app = Router::new()
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
