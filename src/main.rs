mod approvals;
mod audit;
mod config;
mod connector;
mod errors;
mod executor;
mod handlers;
mod models;
mod pipeline;
mod scoring;
mod strategy;
mod validator;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::approvals::ApprovalGate;
use crate::audit::AuditAggregator;
use crate::config::Config;
use crate::connector::{LogConnector, OutboundConnector, WebhookConnector};
use crate::executor::Executor;
use crate::pipeline::PipelineOrchestrator;

/// Main entry point for the application.
///
/// Initializes logging and tracing, loads configuration (failing fast on
/// invalid thresholds or weights), wires the pipeline components, and starts
/// the Axum server.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revenuepilot_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; invalid weights or thresholds must not start serving
    let config = Config::from_env()?;

    // Outbound-action collaborator: HTTP webhook when configured, local
    // logging otherwise (development mode)
    let connector: Arc<dyn OutboundConnector> = match config.outbound_webhook_url.clone() {
        Some(url) => {
            let client = WebhookConnector::new(url.clone())
                .map_err(|e| anyhow::anyhow!("Failed to initialize outbound connector: {}", e))?;
            tracing::info!("Outbound webhook connector initialized: {}", url);
            Arc::new(client)
        }
        None => {
            tracing::info!("No outbound webhook configured, using log connector");
            Arc::new(LogConnector)
        }
    };

    // Shared mutable state: the pending-approval queue and the audit counters
    let gate = Arc::new(ApprovalGate::new(&config));
    let audit = Arc::new(AuditAggregator::new(&config));
    let executor = Executor::new(connector);

    let pipeline = PipelineOrchestrator::new(
        &config,
        Arc::clone(&gate),
        executor.clone(),
        Arc::clone(&audit),
    );

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        pipeline,
        gate,
        executor,
        audit,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/analyze", post(handlers::analyze))
        .route(
            "/api/v1/approvals/pending",
            get(handlers::list_pending_approvals),
        )
        .route(
            "/api/v1/approvals/decide",
            post(handlers::decide_approval),
        )
        .route("/api/v1/metrics", get(handlers::get_metrics))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
