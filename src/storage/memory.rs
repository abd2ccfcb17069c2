use crate::models::{NewVisit, Visit};
use crate::storage::{StorageError, StorageResult, VisitStorage};
use anyhow::Result;
use async_trait::async_trait;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// In-process store for local runs and tests.
///
/// Mirrors the `INET` column: an `ip` that is not an IP literal is rejected
/// with [`StorageError::InvalidAddress`].
#[derive(Default)]
pub struct MemoryStorage {
    rows: RwLock<Vec<Visit>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl VisitStorage for MemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, visit: &NewVisit) -> StorageResult<()> {
        if let Some(ip) = visit.ip.as_deref() {
            if ip.parse::<IpAddr>().is_err() {
                return Err(StorageError::InvalidAddress(format!(
                    "invalid input syntax for type inet: \"{ip}\""
                )));
            }
        }

        let headers = serde_json::to_value(&visit.headers)
            .map_err(|e| StorageError::Other(e.into()))?;

        let mut rows = self.rows.write().await;
        let id = rows.last().map(|v| v.id + 1).unwrap_or(1);
        rows.push(Visit {
            id,
            ts: visit.ts,
            ip: visit.ip.clone(),
            x_forwarded_for: visit.x_forwarded_for.clone(),
            headers: Some(headers),
            user_agent: visit.user_agent.clone(),
            referer: visit.referer.clone(),
            remote_host: visit.remote_host.clone(),
        });

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> StorageResult<Vec<Visit>> {
        let rows = self.rows.read().await;
        let mut recent: Vec<Visit> = rows.clone();
        recent.sort_by(|a, b| b.ts.cmp(&a.ts).then(b.id.cmp(&a.id)));
        recent.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;

    fn visit(ip: Option<&str>, seconds_ago: i64) -> NewVisit {
        NewVisit {
            ts: Utc::now() - Duration::seconds(seconds_ago),
            ip: ip.map(str::to_string),
            x_forwarded_for: None,
            headers: BTreeMap::new(),
            user_agent: Some("test-agent".to_string()),
            referer: None,
            remote_host: None,
        }
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first_and_bounded() {
        let storage = MemoryStorage::new();
        storage.insert(&visit(Some("10.0.0.1"), 30)).await.unwrap();
        storage.insert(&visit(Some("10.0.0.2"), 10)).await.unwrap();
        storage.insert(&visit(Some("10.0.0.3"), 20)).await.unwrap();

        let recent = storage.list_recent(2).await.unwrap();
        let ips: Vec<_> = recent.iter().map(|v| v.ip.as_deref().unwrap()).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_rejects_malformed_address() {
        let storage = MemoryStorage::new();
        let err = storage
            .insert(&visit(Some("not-an-ip"), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidAddress(_)));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_accepts_null_and_ipv6_addresses() {
        let storage = MemoryStorage::new();
        storage.insert(&visit(None, 0)).await.unwrap();
        storage.insert(&visit(Some("2001:db8::1"), 0)).await.unwrap();
        assert_eq!(storage.len().await, 2);
    }
}
