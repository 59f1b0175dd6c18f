//! Client identification
//!
//! Refresh sessions are bound to the client that created them. The binding is
//! the SHA-256 of the User-Agent; the IP is stored for display only because it
//! legitimately changes on mobile networks.

use axum::http::{HeaderMap, header};
use ipnetwork::{IpNetwork, IpNetworkError};
use std::net::IpAddr;

use crate::crypto::sha256;

/// User-Agent strings longer than this are truncated before storage
const MAX_USER_AGENT_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct ClientFingerprint {
    /// SHA-256 of the User-Agent header
    pub hash: [u8; 32],
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientFingerprint {
    pub fn new(hash: [u8; 32], ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self {
            hash,
            ip,
            user_agent,
        }
    }

    /// Hash as stored in `refresh_sessions.client_fingerprint_hash`
    pub fn hash_vec(&self) -> Vec<u8> {
        self.hash.to_vec()
    }

    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }

    /// True when `stored` was produced by the same client
    pub fn matches(&self, stored: &[u8]) -> bool {
        crate::crypto::constant_time_eq(&self.hash, stored)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FingerprintError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),
}

/// Fingerprint the calling client
///
/// Fails when the User-Agent header is absent or not valid visible ASCII.
pub fn extract_fingerprint(
    headers: &HeaderMap,
    client_ip: Option<IpAddr>,
) -> Result<ClientFingerprint, FingerprintError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .ok_or(FingerprintError::MissingHeader("User-Agent"))?;

    let hash = sha256(user_agent.as_bytes());
    let display: String = user_agent.chars().take(MAX_USER_AGENT_LEN).collect();

    Ok(ClientFingerprint::new(hash, client_ip, Some(display)))
}

/// Reverse proxies allowed to report the client address
///
/// Empty means forwarding headers are never read.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Vec<IpNetwork>);

impl TrustedProxies {
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Self(networks)
    }

    /// Comma-separated addresses or CIDR ranges, e.g. `10.0.0.0/8, ::1`
    pub fn parse_list(raw: &str) -> Result<Self, IpNetworkError> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<IpNetwork>)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.0.iter().any(|network| network.contains(ip))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve the client IP
///
/// Forwarding headers count only when the socket peer is a trusted proxy.
/// X-Forwarded-For is walked from the right, skipping trusted hops, so a
/// client cannot pick its own address by prepending entries. X-Real-IP is
/// the fallback when the proxy sends no X-Forwarded-For.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer_ip: Option<IpAddr>,
    trusted: &TrustedProxies,
) -> Option<IpAddr> {
    let peer = peer_ip?;
    if !trusted.contains(peer) {
        return Some(peer);
    }

    let hops: Vec<IpAddr> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|xff| xff.split(','))
        .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
        .collect();

    if let Some(client) = hops.iter().rev().find(|ip| !trusted.contains(**ip)) {
        return Some(*client);
    }
    if let Some(first) = hops.first() {
        return Some(*first);
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
        .or(Some(peer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_fingerprint() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 Test Browser"),
        );

        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        let fp = extract_fingerprint(&headers, Some(ip)).unwrap();
        assert_eq!(fp.user_agent.as_deref(), Some("Mozilla/5.0 Test Browser"));
        assert_eq!(fp.ip_string().as_deref(), Some("10.1.2.3"));
        assert!(fp.matches(&sha256(b"Mozilla/5.0 Test Browser")));
        assert!(!fp.matches(&sha256(b"curl/8.0")));
    }

    #[test]
    fn test_extract_fingerprint_missing_ua() {
        let headers = HeaderMap::new();
        let result = extract_fingerprint(&headers, None);
        assert!(matches!(
            result,
            Err(FingerprintError::MissingHeader("User-Agent"))
        ));
    }

    fn proxies(raw: &str) -> TrustedProxies {
        TrustedProxies::parse_list(raw).unwrap()
    }

    #[test]
    fn test_parse_trusted_proxies() {
        let trusted = proxies("10.0.0.0/8, 127.0.0.1 ,");
        assert!(trusted.contains("10.20.30.40".parse().unwrap()));
        assert!(trusted.contains("127.0.0.1".parse().unwrap()));
        assert!(!trusted.contains("127.0.0.2".parse().unwrap()));
        assert!(proxies("").is_empty());
        assert!(TrustedProxies::parse_list("10.0.0.0/40").is_err());
    }

    #[test]
    fn test_untrusted_peer_headers_ignored() {
        let peer: IpAddr = "203.0.113.7".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-real-ip", HeaderValue::from_static("5.6.7.8"));

        assert_eq!(
            extract_client_ip(&headers, Some(peer), &TrustedProxies::default()),
            Some(peer)
        );
        assert_eq!(
            extract_client_ip(&headers, Some(peer), &proxies("10.0.0.0/8")),
            Some(peer)
        );
        assert_eq!(extract_client_ip(&headers, None, &proxies("10.0.0.0/8")), None);
    }

    #[test]
    fn test_trusted_peer_forwarded_chain() {
        let peer: IpAddr = "10.0.0.2".parse().unwrap();
        let trusted = proxies("10.0.0.0/8");

        let mut headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers, Some(peer), &trusted), Some(peer));

        headers.insert("x-real-ip", HeaderValue::from_static("172.16.0.9"));
        assert_eq!(
            extract_client_ip(&headers, Some(peer), &trusted),
            Some("172.16.0.9".parse().unwrap())
        );

        // the spoofed leftmost entry loses to the hop the proxy appended
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("9.9.9.9, 198.51.100.4, 10.0.0.1"),
        );
        assert_eq!(
            extract_client_ip(&headers, Some(peer), &trusted),
            Some("198.51.100.4".parse().unwrap())
        );

        headers.insert("x-forwarded-for", HeaderValue::from_static("10.1.1.1, 10.0.0.1"));
        assert_eq!(
            extract_client_ip(&headers, Some(peer), &trusted),
            Some("10.1.1.1".parse().unwrap())
        );
    }
}
