use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::api::middleware::ControlPlane;
use crate::proxy::{Dispatcher, fallback, request_host};

/// Explicit proxy invocation parameters
#[derive(Debug, Default, Deserialize)]
pub struct ProxyParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

pub struct ProxyService;

impl ProxyService {
    /// `GET /api/streaming/proxy?name=&path=`
    pub async fn proxy_get(
        req: HttpRequest,
        params: web::Query<ProxyParams>,
        dispatcher: web::Data<Arc<Dispatcher>>,
    ) -> impl Responder {
        dispatcher
            .handle_proxy(&req, Bytes::new(), &params.name, &params.path)
            .await
    }

    /// `POST /api/streaming/proxy` with `{"name", "path"}`; an unreadable
    /// body counts as an empty name.
    pub async fn proxy_post(
        req: HttpRequest,
        body: Bytes,
        dispatcher: web::Data<Arc<Dispatcher>>,
    ) -> impl Responder {
        let params: ProxyParams = serde_json::from_slice(&body).unwrap_or_else(|e| {
            debug!("Invalid proxy request body: {}", e);
            ProxyParams::default()
        });

        dispatcher
            .handle_proxy(&req, Bytes::new(), &params.name, &params.path)
            .await
    }

    /// Catch-all: proxy by Host unless the host is the control plane.
    pub async fn proxy_host(
        req: HttpRequest,
        body: Bytes,
        dispatcher: web::Data<Arc<Dispatcher>>,
        control_plane: web::Data<ControlPlane>,
    ) -> HttpResponse {
        let host = request_host(&req).unwrap_or_default();
        if host.is_empty() {
            return HttpResponse::NotFound().finish();
        }
        if control_plane.matches(&host) {
            return if req.path() == "/" {
                fallback::online_banner()
            } else {
                HttpResponse::NotFound().finish()
            };
        }

        dispatcher.handle_host(&req, body).await
    }
}
