pub mod geolocation;
pub mod proxy;
pub mod status;

use actix_web::web;

pub use geolocation::GeolocationService;
pub use proxy::{ProxyParams, ProxyService};
pub use status::{AppStartTime, StatusResponse, StatusService};

/// Routes served on control-plane hosts only
pub fn control_plane_routes() -> actix_web::Scope {
    web::scope("")
        .route("/", web::get().to(StatusService::online))
        .route("/api/status", web::get().to(StatusService::status))
        .route(
            "/api/streaming/geolocation",
            web::get().to(GeolocationService::lookup),
        )
        .route(
            "/api/utils/geolocation_original",
            web::get().to(GeolocationService::lookup),
        )
        .route("/api/streaming/proxy", web::get().to(ProxyService::proxy_get))
        .route(
            "/api/streaming/proxy",
            web::post().to(ProxyService::proxy_post),
        )
}
