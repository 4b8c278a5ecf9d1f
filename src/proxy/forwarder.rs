//! Upstream forwarding over reqwest
//!
//! The request is rewritten onto the upstream base URL and the upstream
//! response is streamed back unchanged. Every body chunk passes through the
//! [`CompletionGuard`], which fires the analytics events once the stream is
//! finished or dropped.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, warn};
use url::Url;

use super::completion::CompletionGuard;
use super::fallback;
use crate::config::ProxyConfig;
use crate::errors::{ProxyError, Result};

/// RFC 7230 hop-by-hop headers, never forwarded in either direction
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Parse a routing target's upstream URL; only absolute http(s) URLs work.
pub fn parse_upstream(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ProxyError::malformed_upstream_url(format!(
            "unsupported upstream url: {}",
            raw
        ))),
    }
}

fn split_path_query(request_path: &str) -> (&str, Option<&str>) {
    match request_path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request_path, None),
    }
}

fn join_slash(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Outbound URL: upstream base path joined with the request path, base
/// query and request query concatenated with `&`.
pub fn build_upstream_url(base: &Url, request_path: &str) -> Url {
    let (path, query) = split_path_query(request_path);
    let mut url = base.clone();

    url.set_path(&join_slash(base.path(), path));

    let query = match (base.query().filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
        (Some(b), Some(r)) => Some(format!("{}&{}", b, r)),
        (Some(b), None) => Some(b.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    };
    url.set_query(query.as_deref());
    url
}

/// Where a client is sent when the upstream cannot be reached: upstream
/// scheme and host with the originally requested path and query.
pub fn fallback_url(base: &Url, request_path: &str) -> Url {
    let (path, query) = split_path_query(request_path);
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(query.filter(|q| !q.is_empty()));
    url.set_fragment(None);
    url
}

pub struct Forwarder {
    client: reqwest::Client,
    redirect_on_failure: bool,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.upstream_timeout_secs))
            // 3xx from the upstream goes back to the client as-is
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ProxyError::validation(format!("failed to build upstream client: {}", e))
            })?;

        Ok(Self {
            client,
            redirect_on_failure: config.redirect_on_upstream_failure,
        })
    }

    fn build_request(
        &self,
        req: &HttpRequest,
        body: Bytes,
        url: Url,
    ) -> reqwest::RequestBuilder {
        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut builder = self.client.request(method, url);

        let mut forwarded_for = None;
        let mut original_host = None;
        for (name, value) in req.headers().iter() {
            let key = name.as_str();
            match key {
                "host" => original_host = value.to_str().ok().map(str::to_string),
                "x-forwarded-for" => forwarded_for = value.to_str().ok().map(str::to_string),
                "content-length" | "x-forwarded-host" => {}
                _ if is_hop_by_hop(key) => {}
                _ => builder = builder.header(key, value.as_bytes()),
            }
        }

        if let Some(host) = original_host {
            builder = builder.header("x-forwarded-host", host);
        }

        if let Some(peer) = req.peer_addr() {
            let peer = peer.ip().to_string();
            let chain = match forwarded_for {
                Some(prior) if !prior.is_empty() => format!("{}, {}", prior, peer),
                _ => peer,
            };
            builder = builder.header("x-forwarded-for", chain);
        } else if let Some(prior) = forwarded_for {
            builder = builder.header("x-forwarded-for", prior);
        }

        if body.is_empty() {
            builder
        } else {
            builder.body(body)
        }
    }

    /// Forward `req` to `upstream` and stream the answer back.
    ///
    /// A transport failure answers 301 to [`fallback_url`] (or 502 when
    /// redirects are disabled). `guard` is dropped when the response body
    /// is done, or right away on failure.
    pub async fn forward(
        &self,
        req: &HttpRequest,
        body: Bytes,
        upstream: &Url,
        request_path: &str,
        mut guard: CompletionGuard,
    ) -> HttpResponse {
        let url = build_upstream_url(upstream, request_path);
        debug!("Forwarding {} {} -> {}", req.method(), request_path, url);

        let resp = match self.build_request(req, body, url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let err = ProxyError::upstream_unreachable(format!("{}: {}", url, e));
                warn!("{}", err);
                return self.upstream_failure(upstream, request_path, &err);
            }
        };

        let status = StatusCode::from_u16(resp.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let mut builder = HttpResponse::build(status);

        for (name, value) in resp.headers().iter() {
            let key = name.as_str();
            if is_hop_by_hop(key) || key == "content-length" {
                continue;
            }
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                builder.append_header((n, v));
            }
        }

        if let Some(len) = resp.content_length() {
            builder.no_chunking(len);
        }

        let stream = resp.bytes_stream().map(move |chunk| {
            if let Ok(bytes) = &chunk {
                guard.add_bytes(bytes.len() as u64);
            }
            chunk
        });

        builder.streaming(stream)
    }

    fn upstream_failure(&self, upstream: &Url, request_path: &str, err: &ProxyError) -> HttpResponse {
        if !self.redirect_on_failure {
            return fallback::error_response(err);
        }

        let location = fallback_url(upstream, request_path);
        HttpResponse::MovedPermanently()
            .insert_header(("Location", location.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_path_and_query_unchanged() {
        let url = build_upstream_url(&base("http://origin.example.com/"), "/video.m3u8?token=x");
        assert_eq!(url.as_str(), "http://origin.example.com/video.m3u8?token=x");
    }

    #[test]
    fn test_base_path_is_prefixed() {
        let url = build_upstream_url(&base("https://cdn.example.com/live"), "/ch1/index.m3u8");
        assert_eq!(url.as_str(), "https://cdn.example.com/live/ch1/index.m3u8");

        let url = build_upstream_url(&base("https://cdn.example.com/live/"), "seg-1.ts");
        assert_eq!(url.as_str(), "https://cdn.example.com/live/seg-1.ts");
    }

    #[test]
    fn test_queries_are_merged() {
        let url = build_upstream_url(&base("http://o.example.com/?key=abc"), "/a.ts?t=1");
        assert_eq!(url.as_str(), "http://o.example.com/a.ts?key=abc&t=1");

        let url = build_upstream_url(&base("http://o.example.com/?key=abc"), "/a.ts");
        assert_eq!(url.query(), Some("key=abc"));
    }

    #[test]
    fn test_fallback_replaces_path() {
        let url = fallback_url(&base("http://origin.example.com:8080/base?k=1"), "/v.m3u8?token=x");
        assert_eq!(url.as_str(), "http://origin.example.com:8080/v.m3u8?token=x");

        let url = fallback_url(&base("http://origin.example.com/"), "/v.m3u8");
        assert_eq!(url.as_str(), "http://origin.example.com/v.m3u8");
    }

    #[test]
    fn test_parse_upstream() {
        assert!(parse_upstream("http://origin.example.com/").is_ok());
        assert!(parse_upstream(" https://origin.example.com ").is_ok());
        assert!(matches!(
            parse_upstream("origin.example.com"),
            Err(ProxyError::MalformedUpstreamUrl(_))
        ));
        assert!(matches!(
            parse_upstream("ftp://origin.example.com/"),
            Err(ProxyError::MalformedUpstreamUrl(_))
        ));
        assert!(parse_upstream("http://").is_err());
    }

    #[test]
    fn test_hop_by_hop() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("content-type"));
    }
}
