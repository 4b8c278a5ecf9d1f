//! Control-plane host matching
//!
//! Requests whose Host belongs to the operator are served by the local API
//! routes; every other host is proxy traffic.

use std::sync::Arc;

use actix_web::guard::{Guard, GuardContext};
use actix_web::http::header;

use crate::config::ServerConfig;
use crate::proxy::strip_port;

/// Route guard and handler-side check sharing one host list
#[derive(Clone)]
pub struct ControlPlane {
    server: Arc<ServerConfig>,
}

impl ControlPlane {
    pub fn new(server: Arc<ServerConfig>) -> Self {
        Self { server }
    }

    /// `host` may still carry a port.
    pub fn matches(&self, host: &str) -> bool {
        self.server.is_control_plane_host(strip_port(host.trim()))
    }
}

impl Guard for ControlPlane {
    fn check(&self, ctx: &GuardContext<'_>) -> bool {
        let head = ctx.head();
        let host = head
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| head.uri.host());

        host.is_some_and(|h| self.matches(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn control_plane() -> ControlPlane {
        ControlPlane::new(Arc::new(ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            cpu_count: 1,
            control_plane_hosts: vec!["localhost".into(), "panel.example.com".into()],
            control_plane_prefixes: vec!["api.".into()],
        }))
    }

    #[test]
    fn test_matches_with_port() {
        let cp = control_plane();
        assert!(cp.matches("localhost:8080"));
        assert!(cp.matches("api.example.com"));
        assert!(cp.matches("Panel.Example.com"));
        assert!(!cp.matches("video.example.com:8080"));
    }

    #[test]
    fn test_guard_reads_host_header() {
        let cp = control_plane();
        let req = TestRequest::default()
            .insert_header(("Host", "localhost:8080"))
            .to_srv_request();
        assert!(cp.check(&req.guard_ctx()));

        let req = TestRequest::default()
            .insert_header(("Host", "video.example.com"))
            .to_srv_request();
        assert!(!cp.check(&req.guard_ctx()));
    }
}
