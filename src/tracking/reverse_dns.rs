//! Best-effort reverse DNS (PTR) enrichment.
//!
//! Every failure, including a timeout or an unparseable address, comes back
//! as `None`. Nothing here is allowed to fail or stall a visitor request
//! beyond the configured bound.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

use crate::config::TrackingConfig;

/// A PTR lookup backend.
#[async_trait]
pub trait PtrLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<Option<String>>;
}

/// PTR lookups through hickory's tokio resolver
pub struct HickoryPtrLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryPtrLookup {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

#[async_trait]
impl PtrLookup for HickoryPtrLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<Option<String>> {
        let response = self.resolver.reverse_lookup(ip).await?;
        Ok(response.iter().next().map(|name| name.to_utf8()))
    }
}

#[derive(Clone)]
pub struct ReverseDns {
    backend: Option<Arc<dyn PtrLookup>>,
    timeout: Duration,
}

impl ReverseDns {
    pub fn new(backend: Arc<dyn PtrLookup>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    /// A helper that never resolves anything
    pub fn disabled() -> Self {
        Self {
            backend: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        if !config.reverse_dns_enabled {
            return Self::disabled();
        }

        let timeout = config.reverse_dns_timeout();
        Self::new(Arc::new(HickoryPtrLookup::new(timeout)), timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Resolve `ip` to a hostname, or `None` on any failure.
    pub async fn lookup(&self, ip: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;

        let addr = match ip.trim().parse::<IpAddr>() {
            Ok(addr) => addr,
            Err(_) => {
                debug!(ip = %ip, "skipping reverse DNS for unparseable address");
                return None;
            }
        };

        match tokio::time::timeout(self.timeout, backend.lookup(addr)).await {
            Ok(Ok(Some(name))) => normalize_hostname(&name, addr),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                debug!(ip = %addr, error = %e, "reverse DNS lookup failed");
                None
            }
            Err(_) => {
                debug!(ip = %addr, timeout_ms = self.timeout.as_millis() as u64, "reverse DNS lookup timed out");
                None
            }
        }
    }
}

/// Strip the root label and discard answers that merely echo the address
fn normalize_hostname(name: &str, addr: IpAddr) -> Option<String> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() || name == addr.to_string() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Instant;

    struct FixedLookup(Option<&'static str>);

    #[async_trait]
    impl PtrLookup for FixedLookup {
        async fn lookup(&self, _ip: IpAddr) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl PtrLookup for FailingLookup {
        async fn lookup(&self, _ip: IpAddr) -> Result<Option<String>> {
            Err(anyhow!("NXDOMAIN"))
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl PtrLookup for SlowLookup {
        async fn lookup(&self, _ip: IpAddr) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Some("too-late.example.com.".to_string()))
        }
    }

    #[tokio::test]
    async fn test_resolves_and_strips_root_label() {
        let dns = ReverseDns::new(
            Arc::new(FixedLookup(Some("host-1.example.net."))),
            Duration::from_millis(500),
        );
        assert_eq!(
            dns.lookup("203.0.113.1").await.as_deref(),
            Some("host-1.example.net")
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_is_none() {
        let dns = ReverseDns::new(Arc::new(FailingLookup), Duration::from_millis(500));
        assert_eq!(dns.lookup("203.0.113.1").await, None);
    }

    #[tokio::test]
    async fn test_malformed_ip_is_none() {
        let dns = ReverseDns::new(
            Arc::new(FixedLookup(Some("unused.example."))),
            Duration::from_millis(500),
        );
        assert_eq!(dns.lookup("not-an-ip").await, None);
    }

    #[tokio::test]
    async fn test_timeout_is_none_and_bounded() {
        let dns = ReverseDns::new(Arc::new(SlowLookup), Duration::from_millis(50));

        let start = Instant::now();
        let result = dns.lookup("203.0.113.1").await;

        assert_eq!(result, None);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_disabled_never_resolves() {
        let dns = ReverseDns::disabled();
        assert!(!dns.is_enabled());
        assert_eq!(dns.lookup("127.0.0.1").await, None);
    }

    #[test]
    fn test_echoed_address_is_discarded() {
        let addr: IpAddr = "198.51.100.4".parse().unwrap();
        assert_eq!(normalize_hostname("198.51.100.4", addr), None);
        assert_eq!(normalize_hostname(".", addr), None);
        assert_eq!(
            normalize_hostname("edge.example.org.", addr).as_deref(),
            Some("edge.example.org")
        );
    }
}
