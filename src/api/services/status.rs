use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use tracing::{trace, warn};

use crate::proxy::fallback;
use crate::storage::SeaOrmStorage;

const DB_PING_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub database_connected: bool,
    pub database_latency_ms: Option<u64>,
    pub uptime_secs: u64,
}

pub struct StatusService;

impl StatusService {
    /// 存活检查，附带限时的数据库 ping。始终返回 200，数据库状态写在响应体里
    pub async fn status(
        storage: web::Data<Arc<SeaOrmStorage>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received status request");

        let (database_connected, database_latency_ms) = match storage.ping(DB_PING_TIMEOUT).await
        {
            Ok(latency) => (true, Some(latency.as_millis() as u64)),
            Err(e) => {
                warn!("Status check: {}", e);
                (false, None)
            }
        };

        let uptime_secs = (chrono::Utc::now() - app_start_time.start_datetime)
            .num_seconds()
            .max(0) as u64;

        HttpResponse::Ok().json(StatusResponse {
            status: "ok",
            database_connected,
            database_latency_ms,
            uptime_secs,
        })
    }

    pub async fn online() -> impl Responder {
        fallback::online_banner()
    }
}
