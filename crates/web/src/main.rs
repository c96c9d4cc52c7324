//! Stockroom - inventory web application.
//!
//! Serves the item list, login and registration pages on port 3000.
//!
//! # Storage
//!
//! - `development` / `production`: `PostgreSQL` for users, items and sessions
//! - `testing` without a database URL: in-memory stores and sessions
//!
//! Migrations are NOT run automatically on startup. Run them explicitly via
//! `cargo run -p stockroom-cli -- migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::error::Error;
use std::net::SocketAddr;

use axum::Router;
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockroom_web::app::build_app;
use stockroom_web::config::StockroomConfig;
use stockroom_web::db::{self, Stores};
use stockroom_web::middleware::signing_key;
use stockroom_web::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StockroomConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Owned(config.sentry.environment.clone())),
            sample_rate: config.sentry.sample_rate,
            traces_sample_rate: config.sentry.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber: JSON lines in production, text elsewhere.
fn init_tracing(config: &StockroomConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockroom_web=info,tower_http=debug".into());

    let json = config.profile.is_production();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = StockroomConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    tracing::info!(profile = %config.profile, "Starting stockroom");

    let key = signing_key(&config);
    let addr = config.socket_addr();

    let app = match config.database_url.clone() {
        Some(database_url) => {
            let pool = db::create_pool(&database_url).await?;
            tracing::info!("Database pool created");

            let session_store = PostgresStore::new(pool.clone());
            let state = AppState::new(config, Stores::postgres(pool));
            build_app(state, session_store, key)
        }
        None => {
            tracing::warn!("No database configured; using in-memory stores");
            let state = AppState::new(config, Stores::memory());
            build_app(state, MemoryStore::default(), key)
        }
    };

    serve(app, addr).await
}

/// Bind and serve until a shutdown signal arrives.
async fn serve(app: Router, addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    let app = app
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("stockroom listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
