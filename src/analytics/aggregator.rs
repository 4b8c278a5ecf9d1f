//! Daily and monthly traffic counters
//!
//! Both counters are upserts in the sink. Monthly rows are kept to a rolling
//! current-month window: rows for any other (month, year) are pruned once at
//! startup and again the first time a write lands in a new month. The window
//! only moves forward: a write for a month older than the pruned one is
//! discarded.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::TrafficSink;

/// (month, year) key of the monthly counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrafficPeriod {
    pub month: u32,
    pub year: i32,
}

impl TrafficPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }

    /// Current period in the local timezone.
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }
}

impl Ord for TrafficPeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month).cmp(&(other.year, other.month))
    }
}

impl PartialOrd for TrafficPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte counts added to one owner's monthly row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthDelta {
    pub owner_user_id: i64,
    pub download_bytes: i64,
    pub upload_bytes: i64,
    pub bandwidth_bytes: i64,
}

impl BandwidthDelta {
    /// Proxied response body: everything is download, nothing is upload.
    pub fn download(owner_user_id: i64, bytes: i64) -> Self {
        Self {
            owner_user_id,
            download_bytes: bytes,
            upload_bytes: 0,
            bandwidth_bytes: bytes,
        }
    }
}

pub struct TrafficAggregator {
    sink: Arc<dyn TrafficSink>,
    last_pruned: Mutex<Option<TrafficPeriod>>,
}

impl TrafficAggregator {
    pub fn new(sink: Arc<dyn TrafficSink>) -> Self {
        Self {
            sink,
            last_pruned: Mutex::new(None),
        }
    }

    pub async fn record_daily_hit(&self) -> anyhow::Result<()> {
        self.record_daily_hit_on(Local::now().date_naive()).await
    }

    pub async fn record_daily_hit_on(&self, date: NaiveDate) -> anyhow::Result<()> {
        self.sink.add_daily_hits(date, 1).await
    }

    pub async fn record_bandwidth(&self, delta: BandwidthDelta) -> anyhow::Result<()> {
        self.record_bandwidth_in(TrafficPeriod::current(), delta)
            .await
    }

    pub async fn record_bandwidth_in(
        &self,
        period: TrafficPeriod,
        delta: BandwidthDelta,
    ) -> anyhow::Result<()> {
        // held through the upsert so a prune for a newer month cannot land in between
        let mut last = self.last_pruned.lock().await;
        match *last {
            Some(current) if current > period => {
                debug!(
                    "Discarding {} bytes for owner {} in stale period {}/{}",
                    delta.bandwidth_bytes, delta.owner_user_id, period.month, period.year
                );
                return Ok(());
            }
            Some(current) if current == period => {}
            _ => {
                let removed = self.sink.prune_monthly_except(period).await?;
                debug!(
                    "Period changed to {}/{}, pruned {} stale monthly rows",
                    period.month, period.year, removed
                );
                *last = Some(period);
            }
        }
        self.sink.add_monthly_traffic(period, &delta).await
    }

    /// Delete every monthly row outside `period`.
    pub async fn prune_stale_months(&self, period: TrafficPeriod) -> anyhow::Result<u64> {
        let mut last = self.last_pruned.lock().await;
        let removed = self.sink.prune_monthly_except(period).await?;
        *last = (*last).max(Some(period));

        if removed > 0 {
            info!(
                "Pruned {} monthly traffic rows outside {}/{}",
                removed, period.month, period.year
            );
        }
        Ok(removed)
    }

    pub async fn last_pruned(&self) -> Option<TrafficPeriod> {
        *self.last_pruned.lock().await
    }
}
