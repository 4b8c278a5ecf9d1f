use chrono::NaiveDate;

use super::{BandwidthDelta, TrafficPeriod};
use crate::storage::AccessLogEntry;

/// 访问日志 Sink
#[async_trait::async_trait]
pub trait AccessLogSink: Send + Sync {
    async fn write_access_log(&self, entry: AccessLogEntry) -> anyhow::Result<()>;
}

/// 流量计数 Sink
///
/// 增量必须在存储端原子完成，调用方不会先读取当前值
#[async_trait::async_trait]
pub trait TrafficSink: Send + Sync {
    async fn add_daily_hits(&self, date: NaiveDate, hits: i64) -> anyhow::Result<()>;

    async fn add_monthly_traffic(
        &self,
        period: TrafficPeriod,
        delta: &BandwidthDelta,
    ) -> anyhow::Result<()>;

    /// 删除 `period` 以外的所有月度记录，返回删除的行数
    async fn prune_monthly_except(&self, period: TrafficPeriod) -> anyhow::Result<u64>;
}
