use std::net::SocketAddr;
use std::sync::Arc;

use photoshare_core::gateway::AccessGateway;
use photoshare_core::memory::MemoryEngagementStore;
use photoshare_core::store::{EngagementStore, ViewHistory};
use photoshare_db::PgEngagementStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoshare_api::config::ServerConfig;
use photoshare_api::router::build_app_router;
use photoshare_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "photoshare_api=debug,photoshare_core=debug,photoshare_db=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Engagement store ---
    let (store, history) = open_store(&config).await;

    // --- Gateway ---
    let signer = config
        .media
        .build_signer()
        .expect("Invalid media signing configuration");
    tracing::info!(
        active_key_id = signer.active_key_id(),
        retired_keys = config.media.retired_keys.len(),
        url_ttl_secs = config.media.url_ttl_secs,
        "Media signer ready"
    );
    let gateway = AccessGateway::new(
        Arc::new(signer),
        store,
        history,
        config.media.gateway_config(),
    );

    // --- App state + router ---
    let state = AppState {
        gateway: Arc::new(gateway),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST:PORT combination");

    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Shutdown complete");
}

/// Connect to PostgreSQL when `DATABASE_URL` is set, else fall back to the
/// in-memory store.
async fn open_store(config: &ServerConfig) -> (Arc<dyn EngagementStore>, Arc<dyn ViewHistory>) {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory engagement store (data is not persisted)");
        let store = Arc::new(MemoryEngagementStore::new());
        let history: Arc<dyn ViewHistory> = store.clone();
        return (store, history);
    };

    let pool = photoshare_db::create_pool(database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    photoshare_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    photoshare_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgEngagementStore::new(pool));
    let history: Arc<dyn ViewHistory> = store.clone();
    (store, history)
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
