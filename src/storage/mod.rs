pub mod memory;
pub mod postgres;
pub mod supabase;
pub mod trait_def;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use supabase::SupabaseStorage;
pub use trait_def::{StorageError, StorageResult, VisitStorage};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{DatabaseBackend, DatabaseConfig};

/// DDL for the `visits` table, printed when the startup probe fails.
pub const SCHEMA_SQL: &str = r#"CREATE TABLE IF NOT EXISTS visits (
    id SERIAL PRIMARY KEY,
    ts TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ip INET,
    x_forwarded_for TEXT,
    headers JSONB,
    user_agent TEXT,
    referer TEXT,
    remote_host TEXT
);"#;

/// Build the configured storage backend.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn VisitStorage>> {
    let storage: Arc<dyn VisitStorage> = match config.backend {
        DatabaseBackend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .context("Supabase backend selected without SUPABASE_URL/SUPABASE_KEY")?;
            tracing::info!("Using Supabase storage: {}", supabase.url);
            Arc::new(SupabaseStorage::new(supabase, config.timeout())?)
        }
        DatabaseBackend::Postgres => {
            let url = config
                .url
                .as_deref()
                .context("Postgres backend selected without DATABASE_URL")?;
            tracing::info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(url, config.max_connections, config.timeout()).await?)
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory storage, visits will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    };

    Ok(storage)
}
