//! HTTP surface
//!
//! - control-plane hosts: status, geolocation lookup, parameterized proxy
//! - every other host: proxied by `Host` header

pub mod middleware;
pub mod services;

use std::sync::Arc;

use actix_web::web;

use crate::proxy::Dispatcher;
use crate::services::GeoResolver;
use crate::storage::SeaOrmStorage;

use middleware::ControlPlane;
use services::{AppStartTime, ProxyService, control_plane_routes};

/// Shared handles every worker's `App` needs
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SeaOrmStorage>,
    pub geo: Arc<GeoResolver>,
    pub dispatcher: Arc<Dispatcher>,
    pub control_plane: ControlPlane,
    pub start_time: AppStartTime,
}

/// Register data, control-plane routes and the proxy catch-all.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.storage))
            .app_data(web::Data::new(state.geo))
            .app_data(web::Data::new(state.dispatcher))
            .app_data(web::Data::new(state.control_plane.clone()))
            .app_data(web::Data::new(state.start_time))
            .service(control_plane_routes().guard(state.control_plane))
            .default_service(web::to(ProxyService::proxy_host));
    }
}
