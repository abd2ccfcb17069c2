use crate::models::{NewVisit, Visit};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store's address column rejected the `ip` value.
    #[error("invalid client address: {0}")]
    InvalidAddress(String),
    #[error("storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to decode storage response: {0}")]
    Decode(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait VisitStorage: Send + Sync {
    /// Check the store is reachable and the `visits` table exists,
    /// creating it where the backend allows.
    async fn init(&self) -> Result<()>;

    /// Insert a single visit
    async fn insert(&self, visit: &NewVisit) -> StorageResult<()>;

    /// Most recent visits first, at most `limit` rows
    async fn list_recent(&self, limit: i64) -> StorageResult<Vec<Visit>>;
}
