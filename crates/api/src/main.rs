use std::net::SocketAddr;
use std::sync::Arc;

use offnotes_core::rate_limit::{InMemoryRateGuard, RateGuard};
use offnotes_llm::annotator::Annotator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offnotes_api::config::ServerConfig;
use offnotes_api::router::build_app_router;
use offnotes_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "offnotes_api=debug,offnotes_llm=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        rate_limit_per_minute = config.rate_limit_per_minute,
        trust_proxy_headers = config.trust_proxy_headers,
        "Loaded server configuration",
    );

    if !config.request_timeout_covers_gateway() {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            gateway_worst_case_secs = config.gateway.worst_case_duration().as_secs_f64(),
            "REQUEST_TIMEOUT_SECS is shorter than the gateway retry budget; \
             slow annotations will time out before falling back",
        );
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = offnotes_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    offnotes_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    offnotes_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Annotator ---
    let annotator = Annotator::from_config(config.gateway.clone())
        .expect("Failed to build LLM gateway client");
    if annotator.is_configured() {
        tracing::info!(
            base_url = %config.gateway.base_url,
            model = %config.gateway.default_model,
            max_retries = config.gateway.retry.max_retries,
            "LLM gateway configured",
        );
    } else {
        tracing::warn!("EMERGENT_LLM_KEY not set, annotations will use the local fallback");
    }

    // --- Rate guard ---
    let rate_guard: Arc<dyn RateGuard> =
        Arc::new(InMemoryRateGuard::new(config.rate_limit_per_minute));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        annotator: Arc::new(annotator),
        rate_guard,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the per-client rate limit.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
