use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Supabase,
    Postgres,
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Shared secret for `/admin`. `None` disables the admin listing.
    pub key: Option<String>,
    #[serde(default = "AdminConfig::default_list_limit")]
    pub list_limit: i64,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub reverse_dns_enabled: bool,
    #[serde(default = "TrackingConfig::default_reverse_dns_timeout_ms")]
    pub reverse_dns_timeout_ms: u64,
}

impl DatabaseConfig {
    const fn default_max_connections() -> u32 {
        5
    }

    const fn default_timeout_secs() -> u64 {
        10
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AdminConfig {
    pub const MAX_LIST_LIMIT: i64 = 1000;

    const fn default_list_limit() -> i64 {
        100
    }
}

impl TrackingConfig {
    const fn default_reverse_dns_timeout_ms() -> u64 {
        800
    }

    pub fn reverse_dns_timeout(&self) -> Duration {
        Duration::from_millis(self.reverse_dns_timeout_ms)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            reverse_dns_enabled: true,
            reverse_dns_timeout_ms: Self::default_reverse_dns_timeout_ms(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "supabase".to_string());
        let backend = parse_backend(&backend_str);

        let supabase = if backend == DatabaseBackend::Supabase {
            let url = non_empty_var("SUPABASE_URL")
                .context("SUPABASE_URL environment variable is required")?;
            let key = non_empty_var("SUPABASE_KEY")
                .context("SUPABASE_KEY environment variable is required")?;
            Some(SupabaseConfig { url, key })
        } else {
            None
        };

        let url = if backend == DatabaseBackend::Postgres {
            Some(
                non_empty_var("DATABASE_URL")
                    .context("DATABASE_URL must be set when DATABASE_BACKEND=postgres")?,
            )
        } else {
            None
        };

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_else(DatabaseConfig::default_max_connections);

        let timeout_secs = std::env::var("DATABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(DatabaseConfig::default_timeout_secs);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let admin_key = non_empty_var("ADMIN_KEY");
        if admin_key.is_none() {
            tracing::warn!("ADMIN_KEY is not set, the admin listing will deny every request");
        }

        let list_limit = std::env::var("ADMIN_LIST_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(clamp_list_limit)
            .unwrap_or_else(AdminConfig::default_list_limit);

        let reverse_dns_enabled = std::env::var("REVERSE_DNS_ENABLED")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let reverse_dns_timeout_ms = std::env::var("REVERSE_DNS_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(TrackingConfig::default_reverse_dns_timeout_ms);

        Ok(Config {
            database: DatabaseConfig {
                backend,
                supabase,
                url,
                max_connections,
                timeout_secs,
            },
            server: ServerConfig { host, port },
            admin: AdminConfig {
                key: admin_key,
                list_limit,
            },
            tracking: TrackingConfig {
                reverse_dns_enabled,
                reverse_dns_timeout_ms,
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_backend(value: &str) -> DatabaseBackend {
    match value.trim().to_lowercase().as_str() {
        "supabase" => DatabaseBackend::Supabase,
        "postgres" | "postgresql" => DatabaseBackend::Postgres,
        "memory" => DatabaseBackend::Memory,
        other => {
            tracing::warn!(
                "Unknown DATABASE_BACKEND '{other}', falling back to 'supabase'. Supported values: supabase, postgres, memory"
            );
            DatabaseBackend::Supabase
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn clamp_list_limit(limit: i64) -> i64 {
    limit.clamp(1, AdminConfig::MAX_LIST_LIMIT)
}
