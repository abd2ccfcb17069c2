use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use visitlog::api::{self, AppState};
use visitlog::config::Config;
use visitlog::storage::{self, SCHEMA_SQL};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = storage::connect(&config.database).await?;

    // A missing table degrades writes rather than blocking startup
    match storage.init().await {
        Ok(()) => info!("✅ Connected to storage successfully"),
        Err(e) => {
            warn!("⚠️  Storage connection issue: {e:#}");
            warn!("📋 To create the visits table, run:\n{SCHEMA_SQL}");
        }
    }

    let state = AppState::new(&config, storage);
    if state.admin.is_enabled() {
        info!("🔐 Admin listing enabled at /admin?key=...");
    } else {
        info!("🔓 Admin listing disabled (ADMIN_KEY not set)");
    }
    if !config.tracking.reverse_dns_enabled {
        info!("Reverse DNS lookups are disabled");
    }

    let router = api::create_router(Arc::new(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - Raw info available at http://{}/raw", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
