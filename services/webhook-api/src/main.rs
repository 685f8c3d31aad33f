//! OpsDesk Webhook API
//!
//! Ingests payment and invoicing webhooks and exposes dead-letter replay
//! to operators.
//!
//! ## Webhook Endpoints
//!
//! - `POST /webhooks/stripe` - Stripe events (signature-verified)
//! - `POST /webhooks/invoiceninja` - Invoice Ninja events (HMAC-verified)
//!
//! ## Admin Endpoints
//!
//! - `POST /api/admin/replay` - Replay a dead-lettered event
//! - `GET /api/admin/replay` - List dead-lettered events
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opsdesk_db::pg::Repositories;
use opsdesk_webhook_core::{
    AdminToken, NinjaSignatureVerifier, ReplayEngine, StripeSignatureVerifier, WebhookIngestor,
    WebhookProcessor, WorkflowTrigger,
};

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("webhook_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpsDesk Webhook API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        app_env = ?config.app_env,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = opsdesk_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Create repositories
    let repos = Repositories::new(pool.clone());

    // Workflow automation trigger
    if config.n8n_webhook_url.is_none() {
        tracing::info!("Workflow trigger disabled (N8N_WEBHOOK_URL unset)");
    }
    let trigger = WorkflowTrigger::new(
        config.n8n_webhook_url.clone(),
        config.n8n_api_key.clone(),
    );

    // Wire the ingestion pipeline; ingestion and replay share one processor
    let processor = Arc::new(WebhookProcessor::new(
        Arc::new(repos.payments.clone()),
        Arc::new(repos.invoices.clone()),
        Arc::new(repos.estimates.clone()),
        Arc::new(repos.clients.clone()),
        trigger,
    ));
    let dlq = Arc::new(repos.dlq.clone());

    let ingestor = WebhookIngestor::new(
        StripeSignatureVerifier::new(&config.stripe_webhook_secret),
        NinjaSignatureVerifier::new(config.ninja_webhook_secret.clone()),
        config.verification_mode,
        dlq.clone(),
        processor.clone(),
    );
    let replay = ReplayEngine::new(dlq, processor);
    let admin = AdminToken::new(&config.admin_api_key);

    // Create application state
    let state = AppState::new(ingestor, replay, admin, pool, config.clone());

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    // Start server
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // Webhook routes (raw body, no JSON extractor)
    let webhook_routes = Router::new()
        .route("/webhooks/stripe", post(handlers::stripe_webhook))
        .route("/webhooks/invoiceninja", post(handlers::ninja_webhook));

    // Admin replay routes
    let admin_routes = Router::new().route(
        "/admin/replay",
        post(handlers::replay_event).get(handlers::list_dlq_events),
    );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    // Combine all routes
    Router::new()
        .nest("/api", admin_routes)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Webhook handling is dominated by a couple of Postgres round trips
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("webhook_processing_duration_seconds".to_string()),
            latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "webhooks_received_total",
        "Total webhook deliveries by source and status"
    );
    metrics::describe_counter!(
        "webhooks_dead_lettered_total",
        "Total webhook events captured into the DLQ by source"
    );
    metrics::describe_counter!("dlq_replays_total", "Total DLQ replay attempts by status");
    metrics::describe_histogram!(
        "webhook_processing_duration_seconds",
        "Webhook handling latency in seconds by source"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );

    Ok(handle)
}

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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
