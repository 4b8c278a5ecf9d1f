//! TrafficSink implementation for SeaOrmStorage
//!
//! Both counters are written as a single upsert so concurrent increments
//! never read-modify-write:
//! - SQLite/PostgreSQL: `col = col + excluded.col`
//! - MySQL: `col = col + VALUES(col)`

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Condition, Expr, OnConflict, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, ExprTrait,
    QueryFilter,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::model_to_monthly_usage;
use super::retry;
use crate::analytics::{BandwidthDelta, TrafficPeriod, TrafficSink};
use crate::errors::Result;
use crate::storage::MonthlyUsage;

use migration::entities::{daily_traffic, monthly_traffic};

/// `column + <incoming value>` in the dialect of `backend`.
fn accumulate<C: ColumnTrait>(backend: DatabaseBackend, column: C, name: &str) -> SimpleExpr {
    let incoming = match backend {
        DatabaseBackend::MySql => format!("VALUES({})", name),
        _ => format!("excluded.{}", name),
    };
    Expr::col(column).add(Expr::cust(incoming))
}

#[async_trait]
impl TrafficSink for SeaOrmStorage {
    async fn add_daily_hits(&self, date: NaiveDate, hits: i64) -> anyhow::Result<()> {
        let now = Utc::now();
        let model = daily_traffic::ActiveModel {
            date: Set(date),
            hit_count: Set(hits),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let backend = self.db.get_database_backend();
        let on_conflict = OnConflict::column(daily_traffic::Column::Date)
            .value(
                daily_traffic::Column::HitCount,
                accumulate(backend, daily_traffic::Column::HitCount, "hit_count"),
            )
            .update_column(daily_traffic::Column::UpdatedAt)
            .to_owned();

        let db = &self.db;
        retry::with_retry("add_daily_hits", self.retry_config, || async {
            daily_traffic::Entity::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upsert daily traffic for {}: {}", date, e))?;

        debug!("Daily traffic for {} incremented by {}", date, hits);
        Ok(())
    }

    async fn add_monthly_traffic(
        &self,
        period: TrafficPeriod,
        delta: &BandwidthDelta,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        let model = monthly_traffic::ActiveModel {
            owner_user_id: Set(delta.owner_user_id),
            month: Set(period.month as i32),
            year: Set(period.year),
            download_bytes: Set(delta.download_bytes),
            upload_bytes: Set(delta.upload_bytes),
            bandwidth_bytes: Set(delta.bandwidth_bytes),
            request_count: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let backend = self.db.get_database_backend();
        let on_conflict = OnConflict::columns([
            monthly_traffic::Column::OwnerUserId,
            monthly_traffic::Column::Month,
            monthly_traffic::Column::Year,
        ])
        .value(
            monthly_traffic::Column::DownloadBytes,
            accumulate(backend, monthly_traffic::Column::DownloadBytes, "download_bytes"),
        )
        .value(
            monthly_traffic::Column::UploadBytes,
            accumulate(backend, monthly_traffic::Column::UploadBytes, "upload_bytes"),
        )
        .value(
            monthly_traffic::Column::BandwidthBytes,
            accumulate(backend, monthly_traffic::Column::BandwidthBytes, "bandwidth_bytes"),
        )
        .value(
            monthly_traffic::Column::RequestCount,
            accumulate(backend, monthly_traffic::Column::RequestCount, "request_count"),
        )
        .update_column(monthly_traffic::Column::UpdatedAt)
        .to_owned();

        let db = &self.db;
        retry::with_retry("add_monthly_traffic", self.retry_config, || async {
            monthly_traffic::Entity::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
        })
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to upsert monthly traffic for user {}: {}",
                delta.owner_user_id,
                e
            )
        })?;

        debug!(
            "Monthly traffic for user {} ({}/{}) += {} bytes",
            delta.owner_user_id, period.month, period.year, delta.bandwidth_bytes
        );
        Ok(())
    }

    async fn prune_monthly_except(&self, period: TrafficPeriod) -> anyhow::Result<u64> {
        let db = &self.db;
        let result = retry::with_retry("prune_monthly_traffic", self.retry_config, || async {
            monthly_traffic::Entity::delete_many()
                .filter(
                    Condition::any()
                        .add(monthly_traffic::Column::Month.ne(period.month as i32))
                        .add(monthly_traffic::Column::Year.ne(period.year)),
                )
                .exec(db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prune monthly traffic: {}", e))?;

        Ok(result.rows_affected)
    }
}

impl SeaOrmStorage {
    pub async fn daily_hits(&self, date: NaiveDate) -> Result<Option<i64>> {
        let row = daily_traffic::Entity::find()
            .filter(daily_traffic::Column::Date.eq(date))
            .one(&self.db)
            .await?;
        Ok(row.map(|r| r.hit_count))
    }

    pub async fn monthly_usage(
        &self,
        owner_user_id: i64,
        period: TrafficPeriod,
    ) -> Result<Option<MonthlyUsage>> {
        let row = monthly_traffic::Entity::find()
            .filter(monthly_traffic::Column::OwnerUserId.eq(owner_user_id))
            .filter(monthly_traffic::Column::Month.eq(period.month as i32))
            .filter(monthly_traffic::Column::Year.eq(period.year))
            .one(&self.db)
            .await?;
        Ok(row.map(model_to_monthly_usage))
    }
}
