//! Host → routing target resolution with lazy materialization

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::{ProxyError, Result};
use crate::storage::{RoutingTarget, SeaOrmStorage};

pub struct TargetResolver {
    storage: Arc<SeaOrmStorage>,
}

impl TargetResolver {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Resolve `host` to its routing target.
    ///
    /// 1. Active target joined to the domain → return it.
    /// 2. No domain, or an empty `target_url` → `NotConfigured`.
    /// 3. Otherwise create an active target from `target_url`.
    ///
    /// The returned flag is `true` only when this call inserted the row.
    /// A domain whose single target exists but is inactive stays
    /// `NotConfigured`; it is never silently re-created.
    #[instrument(skip(self), fields(host = %host))]
    pub async fn resolve(&self, host: &str) -> Result<(RoutingTarget, bool)> {
        if let Some(target) = self.storage.find_active_target_by_host(host).await? {
            return Ok((target, false));
        }

        let domain = match self.storage.find_domain_by_host(host).await? {
            Some(d) if !d.target_url.trim().is_empty() => d,
            Some(_) => {
                debug!("Domain {} has no target_url", host);
                return Err(ProxyError::not_configured(format!(
                    "domain {} has no target url",
                    host
                )));
            }
            None => {
                return Err(ProxyError::not_configured(format!(
                    "no domain configured for {}",
                    host
                )));
            }
        };

        let (target, created) = self.storage.create_routing_target(&domain).await?;
        if !target.active {
            return Err(ProxyError::not_configured(format!(
                "routing target {} for {} is inactive",
                target.id, host
            )));
        }

        if created {
            info!(
                "Materialized routing target {} for {} -> {}",
                target.id, host, target.upstream_url
            );
        }
        Ok((target, created))
    }
}
