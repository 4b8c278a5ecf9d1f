//! AccessLogSink implementation for SeaOrmStorage

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use tracing::trace;

use super::SeaOrmStorage;
use super::converters::{access_log_to_active_model, model_to_access_log};
use super::retry;
use crate::analytics::AccessLogSink;
use crate::errors::Result;
use crate::storage::AccessLogEntry;

use migration::entities::streaming_access_log;

#[async_trait]
impl AccessLogSink for SeaOrmStorage {
    async fn write_access_log(&self, entry: AccessLogEntry) -> anyhow::Result<()> {
        let model = access_log_to_active_model(&entry);

        let db = &self.db;
        retry::with_retry("write_access_log", self.retry_config, || async {
            streaming_access_log::Entity::insert(model.clone())
                .exec_without_returning(db)
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to insert access log: {}", e))?;

        trace!(
            "Access log written for routing target {} ({})",
            entry.routing_target_id, entry.device_type
        );
        Ok(())
    }
}

impl SeaOrmStorage {
    pub async fn count_access_logs(&self, routing_target_id: i64) -> Result<u64> {
        let count = streaming_access_log::Entity::find()
            .filter(streaming_access_log::Column::StreamingProxyId.eq(routing_target_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// Most recent access log row of a routing target.
    pub async fn latest_access_log(&self, routing_target_id: i64) -> Result<Option<AccessLogEntry>> {
        let model = streaming_access_log::Entity::find()
            .filter(streaming_access_log::Column::StreamingProxyId.eq(routing_target_id))
            .order_by_desc(streaming_access_log::Column::Id)
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_access_log))
    }
}
