use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::debug;

use crate::services::GeoResolver;

#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    pub ip: Option<String>,
}

pub struct GeolocationService;

impl GeolocationService {
    /// Cached lookup through the shared resolver.
    ///
    /// 400 without `ip`, 503 when every provider failed.
    pub async fn lookup(
        query: web::Query<GeoQuery>,
        geo: web::Data<Arc<GeoResolver>>,
    ) -> impl Responder {
        let Some(ip) = query.ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty()) else {
            return HttpResponse::BadRequest()
                .content_type("text/plain; charset=utf-8")
                .body("IP address is required");
        };

        match geo.resolve(ip).await {
            Ok(location) => HttpResponse::Ok().json(location),
            Err(e) => {
                debug!("Geolocation lookup for {} failed: {}", ip, e);
                HttpResponse::ServiceUnavailable()
                    .content_type("text/plain; charset=utf-8")
                    .body(e.message().to_string())
            }
        }
    }
}
