use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// A visit as captured from an incoming request, ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub ts: DateTime<Utc>,
    pub ip: Option<String>,
    pub x_forwarded_for: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub remote_host: Option<String>,
}

impl NewVisit {
    /// Same visit with the address dropped, for stores that reject it.
    pub fn without_ip(&self) -> Self {
        Self {
            ip: None,
            ..self.clone()
        }
    }
}

/// A stored row in the `visits` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub ip: Option<String>,
    pub x_forwarded_for: Option<String>,
    #[serde(default)]
    pub headers: Option<serde_json::Value>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub remote_host: Option<String>,
}
