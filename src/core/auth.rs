//! API 密钥访问控制
//!
//! 两段式过滤：
//! 1. 调用方 IP 与允许的环回地址相同时，强制写入有效密钥（覆盖调用方传入的值）；
//! 2. 请求头中的密钥与有效密钥不完全相同时返回 401。
//!
//! 这是不安全的设计：来自环回地址的请求（在信任转发头时，任何伪造
//! `X-Forwarded-For: 127.0.0.1` 的请求）都会绕过认证，密钥也是硬编码的。
//! 策略通过 [`AccessPolicy`] 注入，真实部署应替换 [`LoopbackBypassPolicy`]。

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tracing::{debug, warn};

use super::error::{BootstrapError, CoreError};
use crate::config::AuthConfig;

/// 访问控制策略
pub trait AccessPolicy: Send + Sync {
    /// 携带密钥的请求头
    fn header_name(&self) -> &HeaderName;

    /// 对受信任的调用方返回需要注入的密钥
    fn trusted_key(&self, client_ip: IpAddr) -> Option<HeaderValue>;

    /// 校验请求携带的密钥
    fn is_authorized(&self, presented: Option<&HeaderValue>) -> bool;

    /// 解析调用方 IP 时是否信任转发头
    fn trust_forwarded_headers(&self) -> bool {
        false
    }
}

pub type SharedPolicy = Arc<dyn AccessPolicy>;

/// 环回地址免认证 + 固定密钥
#[derive(Debug, Clone)]
pub struct LoopbackBypassPolicy {
    allowed_ip: IpAddr,
    header_name: HeaderName,
    api_key: HeaderValue,
    trust_forwarded_headers: bool,
}

impl LoopbackBypassPolicy {
    pub fn from_config(config: &AuthConfig) -> Result<Self, BootstrapError> {
        let header_name = HeaderName::from_bytes(config.header_name.as_bytes()).map_err(|err| {
            BootstrapError::Config(format!(
                "invalid auth header name {:?}: {}",
                config.header_name, err
            ))
        })?;
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|err| BootstrapError::Config(format!("invalid api key value: {}", err)))?;

        Ok(Self {
            allowed_ip: normalize_ip(config.allowed_ip),
            header_name,
            api_key,
            trust_forwarded_headers: config.trust_forwarded_headers,
        })
    }
}

impl Default for LoopbackBypassPolicy {
    fn default() -> Self {
        Self {
            allowed_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            header_name: HeaderName::from_static("x-api-key"),
            api_key: HeaderValue::from_static("supersecretkey"),
            trust_forwarded_headers: true,
        }
    }
}

impl AccessPolicy for LoopbackBypassPolicy {
    fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    fn trusted_key(&self, client_ip: IpAddr) -> Option<HeaderValue> {
        (normalize_ip(client_ip) == self.allowed_ip).then(|| self.api_key.clone())
    }

    fn is_authorized(&self, presented: Option<&HeaderValue>) -> bool {
        presented.is_some_and(|value| value.as_bytes() == self.api_key.as_bytes())
    }

    fn trust_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }
}

/// IPv6 环回和 IPv4 映射地址统一为 IPv4
pub fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) if v6.is_loopback() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

/// 解析调用方 IP
///
/// 信任转发头时依次取 `X-Forwarded-For`、`X-Real-IP`，
/// 否则（或都不可用时）取 TCP 对端地址。
pub fn client_ip(req: &Request, trust_forwarded_headers: bool) -> Option<IpAddr> {
    if trust_forwarded_headers {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return Some(ip);
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    ["x-forwarded-for", "x-real-ip"]
        .into_iter()
        .find_map(|name| headers.get(name).and_then(|h| h.to_str().ok()).and_then(first_hop))
}

/// 转发链中每一项都必须是合法 IP，否则整个头无效；合法时取最左一项
fn first_hop(chain: &str) -> Option<IpAddr> {
    let hops = chain
        .split(',')
        .map(|hop| hop.trim().parse::<IpAddr>().ok())
        .collect::<Option<Vec<_>>>()?;
    hops.first().copied()
}

/// 第一段：受信任调用方注入密钥
pub async fn inject_trusted_key(
    State(policy): State<SharedPolicy>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(ip) = client_ip(&req, policy.trust_forwarded_headers()) {
        if let Some(key) = policy.trusted_key(ip) {
            debug!("Trusted caller {}, injecting API key", ip);
            req.headers_mut().insert(policy.header_name().clone(), key);
        }
    }

    next.run(req).await
}

/// 第二段：校验密钥
pub async fn require_api_key(
    State(policy): State<SharedPolicy>,
    req: Request,
    next: Next,
) -> Result<Response, CoreError> {
    if !policy.is_authorized(req.headers().get(policy.header_name())) {
        warn!("Rejected {} {}: invalid API key", req.method(), req.uri());
        return Err(CoreError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::net::Ipv6Addr;

    fn request_from(peer: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/products");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(peer.parse().unwrap(), 50000)));
        req
    }

    #[test]
    fn test_normalize_ip() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert_eq!(normalize_ip(IpAddr::V6(Ipv6Addr::LOCALHOST)), localhost);
        assert_eq!(normalize_ip("::ffff:127.0.0.1".parse().unwrap()), localhost);
        assert_eq!(normalize_ip(localhost), localhost);
        assert_eq!(
            normalize_ip("10.0.0.1".parse().unwrap()),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            normalize_ip("2001:db8::1".parse().unwrap()),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_trusted_key_only_for_loopback() {
        let policy = LoopbackBypassPolicy::default();
        assert!(policy.trusted_key("127.0.0.1".parse().unwrap()).is_some());
        assert!(policy.trusted_key("::1".parse().unwrap()).is_some());
        assert!(policy.trusted_key("127.0.0.2".parse().unwrap()).is_none());
        assert!(policy.trusted_key("192.168.1.10".parse().unwrap()).is_none());
    }

    #[test]
    fn test_is_authorized_requires_exact_match() {
        let policy = LoopbackBypassPolicy::default();
        assert!(policy.is_authorized(Some(&HeaderValue::from_static("supersecretkey"))));
        assert!(!policy.is_authorized(Some(&HeaderValue::from_static("SUPERSECRETKEY"))));
        assert!(!policy.is_authorized(Some(&HeaderValue::from_static("supersecretkey "))));
        assert!(!policy.is_authorized(Some(&HeaderValue::from_static(""))));
        assert!(!policy.is_authorized(None));
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig {
            allowed_ip: "::1".parse().unwrap(),
            header_name: "X-Token".to_string(),
            api_key: "other".to_string(),
            trust_forwarded_headers: false,
        };
        let policy = LoopbackBypassPolicy::from_config(&config).unwrap();
        assert_eq!(policy.header_name().as_str(), "x-token");
        assert!(policy.trusted_key("127.0.0.1".parse().unwrap()).is_some());
        assert!(policy.is_authorized(Some(&HeaderValue::from_static("other"))));
        assert!(!policy.trust_forwarded_headers());

        let bad = AuthConfig {
            header_name: "bad header".to_string(),
            ..AuthConfig::default()
        };
        assert!(LoopbackBypassPolicy::from_config(&bad).is_err());
    }

    #[test]
    fn test_client_ip_resolution() {
        let req = request_from("203.0.113.5", &[]);
        assert_eq!(client_ip(&req, true), Some("203.0.113.5".parse().unwrap()));

        let req = request_from("203.0.113.5", &[("x-forwarded-for", "127.0.0.1, 10.0.0.1")]);
        assert_eq!(client_ip(&req, true), Some("127.0.0.1".parse().unwrap()));
        assert_eq!(client_ip(&req, false), Some("203.0.113.5".parse().unwrap()));

        let req = request_from("203.0.113.5", &[("x-real-ip", "::1")]);
        assert_eq!(client_ip(&req, true), Some("::1".parse().unwrap()));

        // 无法解析的转发头回退到对端地址
        let req = request_from("203.0.113.5", &[("x-forwarded-for", "unknown")]);
        assert_eq!(client_ip(&req, true), Some("203.0.113.5".parse().unwrap()));

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req, true), None);
    }

    #[test]
    fn test_forwarded_chain_must_be_fully_valid() {
        assert_eq!(first_hop("127.0.0.1"), Some("127.0.0.1".parse().unwrap()));
        assert_eq!(
            first_hop(" 127.0.0.1 , 10.0.0.1,::1"),
            Some("127.0.0.1".parse().unwrap())
        );
        assert_eq!(first_hop("127.0.0.1, garbage"), None);
        assert_eq!(first_hop("garbage, 127.0.0.1"), None);
        assert_eq!(first_hop(""), None);

        // 链无效时回退到 X-Real-IP，再回退到对端地址
        let req = request_from(
            "203.0.113.5",
            &[("x-forwarded-for", "127.0.0.1, garbage"), ("x-real-ip", "10.0.0.9")],
        );
        assert_eq!(client_ip(&req, true), Some("10.0.0.9".parse().unwrap()));

        let req = request_from("203.0.113.5", &[("x-forwarded-for", "127.0.0.1, garbage")]);
        assert_eq!(client_ip(&req, true), Some("203.0.113.5".parse().unwrap()));
    }
}
