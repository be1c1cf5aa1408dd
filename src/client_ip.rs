use std::net::IpAddr;

use axum::http::HeaderMap;
use ipnet::IpNet;

/// Resolve the address used for rate limiting and log lines.
///
/// `X-Forwarded-For` is only honoured when the direct peer is a trusted proxy.
pub fn resolve(headers: &HeaderMap, peer: IpAddr, trusted_proxies: &[IpNet]) -> IpAddr {
    if !trusted_proxies.iter().any(|net| net.contains(&peer)) {
        return peer;
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return peer;
    };

    // Take the first (leftmost) IP that isn't a trusted proxy
    xff.split(',')
        .filter_map(|s| s.trim().parse::<IpAddr>().ok())
        .find(|ip| !trusted_proxies.iter().any(|net| net.contains(ip)))
        .unwrap_or(peer)
}
