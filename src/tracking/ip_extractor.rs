//! Client IP extraction from HTTP headers
//!
//! Picks the most specific address hint available, in a fixed order:
//! - `CF-Connecting-IP` (set by the Cloudflare edge)
//! - the leftmost `X-Forwarded-For` entry
//! - `X-Real-IP`
//! - the socket remote address
//!
//! Values are advisory and are not validated here; the `INET` column in
//! storage is what rejects malformed input.

use axum::http::HeaderMap;
use serde::Serialize;
use std::net::IpAddr;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Best-guess client address plus the raw forwarding chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedClient {
    pub ip: Option<String>,
    pub forwarded_for: Option<String>,
}

/// Resolve the client address for a request
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `peer` - The socket remote address, if the transport supplied one
pub fn resolve_client(headers: &HeaderMap, peer: Option<IpAddr>) -> ResolvedClient {
    let forwarded_for = headers
        .get(X_FORWARDED_FOR)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string);

    let ip = header_value(headers, CF_CONNECTING_IP)
        .map(str::to_string)
        .or_else(|| forwarded_for.as_deref().and_then(first_forwarded))
        .or_else(|| header_value(headers, X_REAL_IP).map(str::to_string))
        .or_else(|| peer.map(|addr| addr.to_string()));

    ResolvedClient { ip, forwarded_for }
}

/// Trimmed header value, `None` if absent, blank or not visible ASCII
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Leftmost `X-Forwarded-For` entry, i.e. the original client in a proxy chain
fn first_forwarded(xff: &str) -> Option<String> {
    xff.split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<IpAddr> {
        Some("192.168.1.1".parse().unwrap())
    }

    fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_peer_address_fallback() {
        let result = resolve_client(&HeaderMap::new(), peer());
        assert_eq!(result.ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(result.forwarded_for, None);
    }

    #[test]
    fn test_no_hint_and_no_peer() {
        let result = resolve_client(&HeaderMap::new(), None);
        assert_eq!(result.ip, None);
    }

    #[test]
    fn test_cloudflare_wins_over_everything() {
        let headers = header_map(&[
            ("cf-connecting-ip", "203.0.113.1"),
            ("x-forwarded-for", "198.51.100.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.9"),
        ]);

        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("203.0.113.1"));
        assert_eq!(
            result.forwarded_for.as_deref(),
            Some("198.51.100.7, 10.0.0.1")
        );
    }

    #[test]
    fn test_x_forwarded_for_takes_leftmost_entry() {
        let headers = header_map(&[
            ("x-forwarded-for", " 203.0.113.1 , 198.51.100.1, 10.0.0.1"),
            ("x-real-ip", "198.51.100.9"),
        ]);

        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("203.0.113.1"));
        assert_eq!(
            result.forwarded_for.as_deref(),
            Some(" 203.0.113.1 , 198.51.100.1, 10.0.0.1")
        );
    }

    #[test]
    fn test_x_real_ip_alone() {
        let headers = header_map(&[("x-real-ip", "2001:db8::7")]);
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("2001:db8::7"));
    }

    #[test]
    fn test_empty_x_forwarded_for_is_absent() {
        let headers = header_map(&[("x-forwarded-for", ""), ("x-real-ip", "198.51.100.9")]);
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("198.51.100.9"));
        assert_eq!(result.forwarded_for, None);

        let headers = header_map(&[("x-forwarded-for", "   ")]);
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("192.168.1.1"));
    }

    #[test]
    fn test_blank_leading_forwarded_entry_falls_through() {
        let headers = header_map(&[("x-forwarded-for", " , 198.51.100.1")]);
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(result.forwarded_for.as_deref(), Some(" , 198.51.100.1"));
    }

    #[test]
    fn test_malformed_values_pass_through() {
        let headers = header_map(&[("cf-connecting-ip", "definitely-not-an-ip")]);
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("definitely-not-an-ip"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::HeaderName::from_bytes(b"X-Real-IP").unwrap(),
            HeaderValue::from_static("203.0.113.50"),
        );
        let result = resolve_client(&headers, peer());
        assert_eq!(result.ip.as_deref(), Some("203.0.113.50"));
    }
}
