//! Routing target lookups and lazy creation

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{model_to_domain, model_to_routing_target};
use super::retry;
use crate::errors::{ProxyError, Result};
use crate::storage::{DomainRecord, RoutingTarget};

use migration::entities::{domain, streaming_proxy};

impl SeaOrmStorage {
    /// Active routing target joined to its domain by host name.
    pub async fn find_active_target_by_host(&self, host: &str) -> Result<Option<RoutingTarget>> {
        let row = streaming_proxy::Entity::find()
            .find_also_related(domain::Entity)
            .filter(domain::Column::HostName.eq(host))
            .filter(streaming_proxy::Column::Active.eq(true))
            .one(&self.db)
            .await?;

        Ok(row.and_then(|(proxy, domain)| {
            domain.map(|d| model_to_routing_target(proxy, d.owner_user_id))
        }))
    }

    pub async fn find_domain_by_host(&self, host: &str) -> Result<Option<DomainRecord>> {
        let model = domain::Entity::find()
            .filter(domain::Column::HostName.eq(host))
            .one(&self.db)
            .await?;

        Ok(model.map(model_to_domain))
    }

    /// Any routing target of a domain, active or not.
    pub async fn find_target_by_domain(&self, domain: &DomainRecord) -> Result<Option<RoutingTarget>> {
        let model = streaming_proxy::Entity::find()
            .filter(streaming_proxy::Column::DomainId.eq(domain.id))
            .one(&self.db)
            .await?;

        Ok(model.map(|m| model_to_routing_target(m, domain.owner_user_id)))
    }

    /// Insert an active routing target seeded from `domain.target_url`.
    ///
    /// `domain_id` is unique, so a concurrent creator loses the insert and
    /// reads back the winner's row. The flag is `true` only for the caller
    /// whose insert landed.
    pub async fn create_routing_target(&self, domain: &DomainRecord) -> Result<(RoutingTarget, bool)> {
        let now = Utc::now();
        let model = streaming_proxy::ActiveModel {
            domain_id: Set(domain.id),
            upstream_url: Set(domain.target_url.clone()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let on_conflict = OnConflict::column(streaming_proxy::Column::DomainId)
            .do_nothing()
            .to_owned();

        let db = &self.db;
        let inserted = retry::with_retry("create_routing_target", self.retry_config, || async {
            match streaming_proxy::Entity::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
            {
                Err(DbErr::RecordNotInserted) => Ok(0),
                other => other,
            }
        })
        .await?;

        let target = self.find_target_by_domain(domain).await?.ok_or_else(|| {
            ProxyError::persistence_failure(format!(
                "routing target for domain {} vanished after insert",
                domain.id
            ))
        })?;

        debug!(
            "Routing target {} for {} (inserted: {})",
            target.id,
            domain.host_name,
            inserted > 0
        );

        Ok((target, inserted > 0))
    }

    /// Insert a customer domain.
    ///
    /// Domains belong to the admin subsystem; this exists so the proxy can
    /// run standalone and for seeding test databases.
    pub async fn insert_domain(
        &self,
        host_name: &str,
        owner_user_id: i64,
        target_url: &str,
    ) -> Result<DomainRecord> {
        let now = Utc::now();
        let model = domain::ActiveModel {
            host_name: Set(host_name.to_string()),
            owner_user_id: Set(owner_user_id),
            target_url: Set(target_url.to_string()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        Ok(model_to_domain(inserted))
    }

    /// Flip `active` on a routing target; returns false when the id is unknown.
    pub async fn set_routing_target_active(&self, id: i64, active: bool) -> Result<bool> {
        let result = streaming_proxy::Entity::update_many()
            .col_expr(streaming_proxy::Column::Active, Expr::value(active))
            .col_expr(streaming_proxy::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(streaming_proxy::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_routing_targets(&self, domain_id: i64) -> Result<u64> {
        let count = streaming_proxy::Entity::find()
            .filter(streaming_proxy::Column::DomainId.eq(domain_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
