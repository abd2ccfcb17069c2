use axum::http::HeaderMap;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, warn};

use crate::models::NewVisit;
use crate::storage::{StorageError, StorageResult, VisitStorage};
use crate::tracking::ip_extractor::resolve_client;
use crate::tracking::reverse_dns::ReverseDns;

/// Builds visit records from requests and hands them to storage.
#[derive(Clone)]
pub struct VisitRecorder {
    storage: Arc<dyn VisitStorage>,
    dns: ReverseDns,
}

impl VisitRecorder {
    pub fn new(storage: Arc<dyn VisitStorage>, dns: ReverseDns) -> Self {
        Self { storage, dns }
    }

    /// Assemble the visit for the current request without storing it
    pub async fn capture(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> NewVisit {
        let client = resolve_client(headers, peer);

        let remote_host = match client.ip.as_deref() {
            Some(ip) => self.dns.lookup(ip).await,
            None => None,
        };

        NewVisit {
            ts: chrono::Utc::now(),
            ip: client.ip,
            x_forwarded_for: client.forwarded_for,
            headers: header_map(headers),
            user_agent: single_header(headers, "user-agent"),
            referer: single_header(headers, "referer"),
            remote_host,
        }
    }

    /// Insert a visit. An address the store refuses is replaced by null and
    /// the insert is attempted once more.
    pub async fn record(&self, visit: &NewVisit) -> StorageResult<()> {
        match self.storage.insert(visit).await {
            Err(StorageError::InvalidAddress(reason)) if visit.ip.is_some() => {
                warn!(
                    ip = ?visit.ip,
                    reason = %reason,
                    "storage rejected client address, recording visit without it"
                );
                self.storage.insert(&visit.without_ip()).await
            }
            other => other,
        }
    }

    /// Capture and record, logging storage failures instead of returning them
    pub async fn track(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> NewVisit {
        let visit = self.capture(headers, peer).await;

        if let Err(e) = self.record(&visit).await {
            error!(ip = ?visit.ip, error = %e, "failed to record visit");
        }

        visit
    }
}

/// Flatten request headers into name → value, joining repeated headers
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    map
}

fn single_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
