use crate::models::{NewVisit, Visit};
use crate::storage::{StorageError, StorageResult, VisitStorage, SCHEMA_SQL};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Postgres SQLSTATE for `invalid_text_representation`, raised by `::inet`.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) {
            return StorageError::InvalidAddress(db.message().to_string());
        }
    }
    StorageError::Other(err.into())
}

#[async_trait]
impl VisitStorage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_visits_ts ON visits(ts DESC)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert(&self, visit: &NewVisit) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO visits (ts, ip, x_forwarded_for, headers, user_agent, referer, remote_host)
            VALUES ($1, $2::inet, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(visit.ts)
        .bind(visit.ip.as_deref())
        .bind(visit.x_forwarded_for.as_deref())
        .bind(Json(&visit.headers))
        .bind(visit.user_agent.as_deref())
        .bind(visit.referer.as_deref())
        .bind(visit.remote_host.as_deref())
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> StorageResult<Vec<Visit>> {
        let visits = sqlx::query_as::<_, Visit>(
            r#"
            SELECT id::bigint AS id, ts, host(ip) AS ip, x_forwarded_for, headers,
                   user_agent, referer, remote_host
            FROM visits
            ORDER BY ts DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(visits)
    }
}
