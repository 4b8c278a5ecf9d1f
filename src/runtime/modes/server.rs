//! Server mode
//!
//! Builds the runtime context, serves HTTP until the server stops or a
//! shutdown signal arrives, then drains the analytics queue.

use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpServer, web};
use anyhow::Result;
use tracing::warn;

use crate::api::middleware::{ControlPlane, RequestIdMiddleware};
use crate::api::services::AppStartTime;
use crate::api::{AppState, configure};
use crate::config::get_config;
use crate::runtime::lifetime;

/// Request body limit, proxied uploads included.
const MAX_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Run the HTTP server
///
/// **Note**: Logging system and config must be initialized before calling
/// this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let config = get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let state = AppState {
        storage: startup.storage.clone(),
        geo: startup.geo.clone(),
        dispatcher: startup.dispatcher.clone(),
        control_plane: ControlPlane::new(Arc::new(config.server.clone())),
        start_time: app_start_time,
    };

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // no compression or cache-header rewriting, upstream responses pass through
    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(DefaultHeaders::new().add(("X-Served-By", "cdnproxy")))
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
            .configure(configure(state.clone()))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .disable_signals()
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();
    let handle = server.handle();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::wait_for_signal() => {
            handle.stop(true).await;
        }
    }

    lifetime::shutdown::perform_shutdown(
        startup.queue.clone(),
        startup.storage.clone(),
        Duration::from_secs(config.analytics.shutdown_drain_secs),
    )
    .await;

    warn!("Graceful shutdown: all tasks completed");
    Ok(())
}
