//! Book Club Backend
//!
//! REST backend for a reading community: catalogue, chapter discussions and
//! reading lists.

use book_club::api::handlers::{ensure_bootstrap_admin, AppState};
use book_club::db::{TokenRepository, TokenStore};
use book_club::{api, core, db};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (handles CLI args, env vars, and config file)
    let config = match core::config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Print error to stderr since logging isn't initialized yet
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let _logger = match core::Logger::init(&config.logging) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return Err(e);
        }
    };

    info!("Starting Book Club Backend v{}", book_club::VERSION);
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Server configuration"
    );
    info!(path = ?config.database.path, "Database configuration");

    if let Some(dir) = config.database.path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            info!("Creating directory: {:?}", dir);
            std::fs::create_dir_all(dir)
                .map_err(|e| anyhow::anyhow!("Failed to create directory {:?}: {}", dir, e))?;
        }
    }

    info!("Initializing database...");
    let db = Arc::new(db::DatabaseManager::new(
        &config.database.path,
        config.database.connection_pool_size,
        std::time::Duration::from_millis(config.database.busy_timeout),
    )?);
    info!("Running database migrations...");
    db.migrate()?;
    info!("Database initialized successfully");

    let purged = TokenRepository::new(db.clone()).delete_expired().await?;
    if purged > 0 {
        info!(purged, "Removed expired tokens");
    }

    let state = AppState::new(db.clone(), config.security.clone());
    if let Some(admin) = ensure_bootstrap_admin(&state, &config.bootstrap).await? {
        info!(user_id = admin.id, username = %admin.username, "Bootstrap admin created");
    }

    let server_url = format!("http://{}", config.server.bind_address());
    let server = api::ApiServer::new(config, db)?;
    info!(url = %server_url, "Server ready - starting to serve requests");

    // Start serving (this will block until shutdown signal)
    server.serve().await?;

    Ok(())
}
