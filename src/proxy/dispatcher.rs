//! Request dispatch: host → routing target → upstream

use std::sync::Arc;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use tracing::{error, instrument};

use super::client_ip::client_ip;
use super::completion::CompletionGuard;
use super::fallback;
use super::forwarder::{Forwarder, parse_upstream};
use crate::analytics::AnalyticsQueue;
use crate::errors::ProxyError;
use crate::services::{TargetResolver, is_browser};

/// Host name without port, `[v6]:port` included.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split_once(']').map(|(h, _)| h).unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((h, port)) if !h.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    }
}

/// Request host from the `Host` header, or the URI authority (HTTP/2).
pub fn request_host(req: &HttpRequest) -> Option<String> {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))?;

    let host = strip_port(raw.trim()).to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub struct Dispatcher {
    resolver: TargetResolver,
    forwarder: Forwarder,
    queue: Arc<AnalyticsQueue>,
}

impl Dispatcher {
    pub fn new(resolver: TargetResolver, forwarder: Forwarder, queue: Arc<AnalyticsQueue>) -> Self {
        Self {
            resolver,
            forwarder,
            queue,
        }
    }

    /// Proxy the request using its `Host` header as the target name.
    pub async fn handle_host(&self, req: &HttpRequest, body: Bytes) -> HttpResponse {
        let name = request_host(req).unwrap_or_default();
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        self.handle_proxy(req, body, &name, &path).await
    }

    /// Shared entry point of the host-based and parameterized invocations.
    #[instrument(skip(self, req, body), fields(name = %name, path = %path))]
    pub async fn handle_proxy(
        &self,
        req: &HttpRequest,
        body: Bytes,
        name: &str,
        path: &str,
    ) -> HttpResponse {
        if name.is_empty() {
            return fallback::deny_page();
        }

        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let browser = is_browser(&user_agent);

        let target = match self.resolver.resolve(name).await {
            Ok((target, _)) => target,
            Err(e @ ProxyError::NotConfigured(_)) => {
                return fallback::not_configured(browser, &e);
            }
            Err(e) => {
                error!("Failed to resolve routing target for {}: {}", name, e);
                return if browser {
                    fallback::deny_page()
                } else {
                    fallback::error_response(&e)
                };
            }
        };

        // browsers are never proxied
        if browser {
            return fallback::deny_page();
        }

        let upstream = match parse_upstream(&target.upstream_url) {
            Ok(url) => url,
            Err(e) => {
                error!(
                    "Routing target {} has a malformed upstream url: {}",
                    target.id, e
                );
                return fallback::error_response(&e);
            }
        };

        let guard = CompletionGuard::new(self.queue.clone(), target, client_ip(req), user_agent);
        self.forwarder
            .forward(req, body, &upstream, &normalize_path(path), guard)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("video.example.com:8443"), "video.example.com");
        assert_eq!(strip_port("video.example.com"), "video.example.com");
        assert_eq!(strip_port("[2001:db8::1]:80"), "2001:db8::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
    }

    #[test]
    fn test_request_host_lowercases() {
        let req = TestRequest::default()
            .insert_header(("Host", "Video.Example.COM:8080"))
            .to_http_request();
        assert_eq!(request_host(&req).as_deref(), Some("video.example.com"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("live.m3u8"), "/live.m3u8");
        assert_eq!(normalize_path("/a?b=1"), "/a?b=1");
    }
}
