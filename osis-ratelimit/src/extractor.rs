//! Key extraction for rate limiting
//!
//! Clients are identified by their socket peer address. Forwarding headers
//! are only read when the peer is one of the trusted proxies: the nearest
//! `X-Forwarded-For` hop that is not itself a trusted proxy, then
//! `X-Real-IP`, then the peer.

use http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Information about an incoming request used for key extraction
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Client IP address
    pub ip: Option<IpAddr>,
    /// Request path
    pub path: String,
    /// Request method (GET, POST, etc.)
    pub method: String,
    /// Headers that might be useful for key extraction
    pub headers: Vec<(String, String)>,
}

impl RequestInfo {
    /// Create a new request info
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            ip: None,
            path: path.into(),
            method: method.into(),
            headers: Vec::new(),
        }
    }

    /// Build from HTTP request parts, resolving the client address
    pub fn from_parts(
        method: &http::Method,
        path: &str,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trusted_proxies: &[IpAddr],
    ) -> Self {
        let mut info = Self::new(path, method.as_str());
        info.ip = client_ip(headers, peer, trusted_proxies);
        info.headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        info
    }

    /// Set the IP address
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Resolve the client address.
///
/// Headers sent by a peer outside `trusted_proxies` are ignored, so a
/// direct client cannot pick its own key.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer_ip = peer.map(|addr| addr.ip());
    if !peer_ip.is_some_and(|ip| trusted_proxies.contains(&ip)) {
        return peer_ip;
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| parse_x_forwarded_for(raw, trusted_proxies))
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .and_then(parse_ip_addr)
        })
        .or(peer_ip)
}

// Hops are appended left to right, so walk back from the nearest one
fn parse_x_forwarded_for(raw: &str, trusted_proxies: &[IpAddr]) -> Option<IpAddr> {
    raw.rsplit(',')
        .map(str::trim)
        .filter_map(parse_ip_addr)
        .find(|ip| !trusted_proxies.contains(ip))
}

fn parse_ip_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Key extraction strategies
#[derive(Debug, Clone, Default)]
pub enum KeyExtractor {
    /// Extract key from IP address
    #[default]
    Ip,
    /// Extract key from a custom header
    Header {
        /// Header name to extract
        name: String,
    },
    /// Combine IP and path for per-endpoint limiting
    IpAndPath,
}

impl KeyExtractor {
    /// Create a header-based extractor
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header { name: name.into() }
    }

    /// Extract the key from request info
    pub fn extract(&self, info: &RequestInfo) -> Option<String> {
        match self {
            Self::Ip => info.ip.map(|ip| ip.to_string()),
            Self::Header { name } => info.get_header(name).map(|s| s.to_string()),
            Self::IpAndPath => info.ip.map(|ip| format!("{}:{}", ip, info.path)),
        }
    }

    /// Get a description of this extractor
    pub fn description(&self) -> &str {
        match self {
            Self::Ip => "IP address",
            Self::Header { .. } => "Custom header",
            Self::IpAndPath => "IP + Path",
        }
    }
}
