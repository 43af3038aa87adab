//! # pixora-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the verification service.
//! Binds to configurable port (default 8080).

use pixora_api::state::{AppConfig, AppState};
use pixora_api::users::UserDirectory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing. `LOG_FORMAT=json` switches to JSON lines.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set, every API request will be rejected with 401");
    }

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = pixora_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let port = config.port;
    let state = match db_pool {
        Some(pool) => AppState::with_pool(config, pool),
        None => {
            let users = match &config.users_file {
                Some(path) => UserDirectory::from_json_file(path).map_err(|e| {
                    tracing::error!("Loading users failed: {e}");
                    e
                })?,
                None => {
                    tracing::warn!("USERS_FILE not set, user directory is empty");
                    UserDirectory::in_memory([])
                }
            };
            AppState::with_config(config, users)
        }
    };

    let app = pixora_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Pixora API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
