use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use hearth_server::catalog::RemoteCatalog;
use hearth_server::config::Config;
use hearth_server::library::MemoryLibrary;
use hearth_server::middleware::SESSION_HEADER;
use hearth_server::{app, AppState, SessionManager};
use hearth_task_processor::jobs::{OnlineRefreshSchedule, RescanDirectoryTask};
use hearth_task_processor::TaskProcessor;
use hearth_timer::IntervalTimer;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the CORS layer based on configuration.
///
/// In production mode:
/// - If `CORS_ORIGINS` is set, only those origins are allowed
/// - If `CORS_ORIGINS` is not set, CORS requests are rejected
///
/// In development mode:
/// - If `CORS_ORIGINS` is set, those origins are used
/// - If `CORS_ORIGINS` is not set, permissive CORS is used
fn build_cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<_> = origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!("Invalid CORS origin '{}', skipping", origin);
                        None
                    })
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::error!("No valid CORS origins configured, CORS requests will be rejected");
                return CorsLayer::new();
            }

            tracing::info!(
                "CORS configured with {} allowed origin(s): {:?}",
                allowed_origins.len(),
                origins
            );
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, SESSION_HEADER.clone()])
                .max_age(std::time::Duration::from_secs(3600))
        }
        _ if config.is_production() => {
            tracing::warn!(
                "CORS_ORIGINS not configured in production mode. \
                 CORS requests will be rejected."
            );
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Using permissive CORS in development mode");
            CorsLayer::permissive()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth_server=debug,hearth_task_processor=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        environment = %config.environment(),
        library = %config.common.media_library_path.display(),
        "Starting Hearth server"
    );
    tracing::debug!(ui = ?config.ui, "UI configuration");

    let timer = Arc::new(IntervalTimer::current());
    let sessions = SessionManager::new(timer.clone(), &config.ui);
    let processor = TaskProcessor::start();
    let library = Arc::new(MemoryLibrary::new());

    let media_root = config.common.media_library_path.clone();
    if media_root.is_dir() {
        let id = processor.add_task(
            RescanDirectoryTask::new(
                media_root.clone(),
                library.clone(),
                Arc::new(sessions.clone()),
            )
            .non_cancellable(),
        );
        tracing::info!(task_id = %id, "Initial library scan queued");
    } else {
        tracing::warn!(
            path = %media_root.display(),
            "Media library path is not a directory, skipping initial scan"
        );
    }

    let catalog_schedule = match &config.catalog {
        Some(catalog) => {
            let service = RemoteCatalog::new("catalog", catalog.url.as_str(), library.clone())?
                .every(catalog.refresh_interval());
            let schedule = OnlineRefreshSchedule::new(
                processor.clone(),
                Arc::new(service),
                Arc::new(sessions.clone()),
                timer.clone(),
            );
            let scheduled = schedule.start();
            let id = schedule.refresh_now(false);
            tracing::info!(task_id = %id, scheduled, "Initial catalog refresh queued");
            Some(schedule)
        }
        None => None,
    };

    let state = AppState::new(sessions, processor.clone(), library, media_root);
    let router = app(state).layer(build_cors_layer(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(schedule) = &catalog_schedule {
        schedule.stop();
    }
    tracing::info!(pending = processor.queue_len(), "Waiting for background tasks");
    processor.shutdown().await;
    timer.shutdown();

    tracing::info!("Hearth server stopped");
    Ok(())
}
