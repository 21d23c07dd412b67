use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;

use pmsflow::api::configure_routes;
use pmsflow::authz::{AuthorizationEngine, PermissionTable};
use pmsflow::core::config::AppConfig;
use pmsflow::core::shared::state::AppState;
use pmsflow::core::shared::utils::{create_conn, run_migrations};
use pmsflow::storage::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let pool = create_conn(&config.database).context("Failed to create database pool")?;
    info!("Running database migrations...");
    if let Err(e) = run_migrations(&pool) {
        error!("Failed to run migrations: {}", e);
        anyhow::bail!("database migrations failed");
    }
    info!("Database migrations completed successfully");

    let permissions = PermissionTable::with_overrides(&config.permissions)
        .context("Invalid permission overrides")?;
    if !config.permissions.is_empty() {
        warn!(
            "Permission table overridden for roles: {:?}",
            config.permissions.keys().collect::<Vec<_>>()
        );
    }

    let addr = config.bind_address();
    let store = Arc::new(PgStore::new(pool));
    let state = Arc::new(AppState::new(
        config,
        store,
        AuthorizationEngine::new(permissions),
    ));

    let app = configure_routes().with_state(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("pmsflow listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
