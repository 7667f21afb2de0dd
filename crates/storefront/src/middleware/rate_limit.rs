//! Rate limiting for authentication endpoints, using governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Single-address proxy headers consulted after `X-Forwarded-For`.
const FALLBACK_IP_HEADERS: [&str; 2] = ["x-real-ip", "fly-client-ip"];

/// Key extractor that trusts proxy headers, then falls back to the peer address.
///
/// Checks `CF-Connecting-IP`, the first hop of `X-Forwarded-For`, `X-Real-IP`
/// and `Fly-Client-IP`. Without any of them the socket peer address is used,
/// which requires serving with `into_make_service_with_connect_info`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req).ok_or(GovernorError::UnableToExtractKey)
    }
}

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

fn client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    if let Some(ip) = header_ip(req, "cf-connecting-ip") {
        return Some(ip);
    }

    if let Some(ip) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    FALLBACK_IP_HEADERS
        .iter()
        .find_map(|name| header_ip(req, name))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// One token every 6 seconds with a burst of 5. Returns `None` only if
/// governor refuses the quota.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap_or_default()
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.2, 10.0.0.3"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(client_ip(&req), "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.1, 10.0.0.3")]);
        assert_eq!(client_ip(&req), "198.51.100.1".parse().ok());
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut req = request(&[]);
        assert_eq!(client_ip(&req), None);

        let peer: SocketAddr = ([192, 0, 2, 10], 5000).into();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_ip(&req), Some(peer.ip()));
    }

    #[test]
    fn test_auth_limiter_builds() {
        assert!(auth_rate_limiter().is_some());
    }
}
