use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analytics::AnalyticsQueue;
use crate::storage::SeaOrmStorage;

/// 关闭超时时间（秒），在队列排空时间之外额外预留
const SHUTDOWN_GRACE_SECS: u64 = 20;

pub async fn wait_for_signal() {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, draining analytics...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}

/// 排空分析队列并关闭数据库连接
pub async fn perform_shutdown(
    queue: Arc<AnalyticsQueue>,
    storage: Arc<SeaOrmStorage>,
    drain: Duration,
) {
    let budget = drain + Duration::from_secs(SHUTDOWN_GRACE_SECS);
    let result = timeout(budget, async {
        queue.shutdown(drain).await;

        let dropped = queue.dropped_count();
        if dropped > 0 {
            warn!("{} analytics events were dropped during this run", dropped);
        }

        // 队列排空后才能关闭连接池
        if let Err(e) = storage.close().await {
            error!("Failed to close database: {}", e);
        }
    })
    .await;

    match result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds",
            budget.as_secs()
        ),
    }
}
