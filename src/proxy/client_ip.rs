//! 客户端 IP 提取
//!
//! 按优先级取第一个非空值：
//! 1. `CF-Connecting-IP`
//! 2. `True-Client-IP`
//! 3. `X-Forwarded-For` 的第一项
//! 4. `X-Real-IP`
//! 5. 连接的对端地址（只取 host 部分）

use std::net::SocketAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 从请求头和对端地址中提取客户端 IP，全部缺失时返回空字符串
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, CF_CONNECTING_IP) {
        return ip.to_string();
    }

    if let Some(ip) = header_str(headers, TRUE_CLIENT_IP) {
        return ip.to_string();
    }

    if let Some(first) = header_str(headers, X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    if let Some(ip) = header_str(headers, X_REAL_IP) {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

pub fn client_ip(req: &HttpRequest) -> String {
    extract_client_ip(req.headers(), req.peer_addr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                HeaderName::from_static(k),
                HeaderValue::from_static(v),
            );
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.9:51234".parse().unwrap())
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let h = headers(&[
            ("x-forwarded-for", "1.1.1.1"),
            ("cf-connecting-ip", "2.2.2.2"),
            ("true-client-ip", "3.3.3.3"),
        ]);
        assert_eq!(extract_client_ip(&h, peer()), "2.2.2.2");
    }

    #[test]
    fn test_true_client_ip_before_forwarded_for() {
        let h = headers(&[("x-forwarded-for", "1.1.1.1"), ("true-client-ip", "3.3.3.3")]);
        assert_eq!(extract_client_ip(&h, peer()), "3.3.3.3");
    }

    #[test]
    fn test_first_forwarded_for_entry_trimmed() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1, 10.0.0.2"),
            ("x-real-ip", "4.4.4.4"),
        ]);
        assert_eq!(extract_client_ip(&h, peer()), "203.0.113.7");
    }

    #[test]
    fn test_real_ip_then_peer() {
        let h = headers(&[("x-real-ip", "4.4.4.4")]);
        assert_eq!(extract_client_ip(&h, peer()), "4.4.4.4");
        assert_eq!(extract_client_ip(&HeaderMap::new(), peer()), "10.0.0.9");
    }

    #[test]
    fn test_empty_header_is_skipped() {
        let h = headers(&[("cf-connecting-ip", ""), ("x-real-ip", "5.5.5.5")]);
        assert_eq!(extract_client_ip(&h, peer()), "5.5.5.5");
    }

    #[test]
    fn test_ipv6_peer_without_port() {
        let p: Option<SocketAddr> = Some("[2001:db8::1]:443".parse().unwrap());
        assert_eq!(extract_client_ip(&HeaderMap::new(), p), "2001:db8::1");
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), "");
    }
}
