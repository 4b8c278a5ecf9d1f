//! GeoIP Provider 抽象层
//!
//! [`GeoResolver`] 持有缓存和有序的 provider 列表：
//! 1. 缓存命中 → 直接返回
//! 2. 未命中 → 依次尝试 provider，第一个成功的结果写入缓存
//! 3. 全部失败 → `AllProvidersFailed`，不写缓存

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::external_api::ExternalApiProvider;
use crate::config::AnalyticsConfig;
use crate::errors::{ProxyError, Result};

/// 地理位置信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub ip: String,
    /// ISO 3166-1 alpha-2 国家代码（如 "CN"、"US"）
    pub country_code: String,
    pub country_name: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// 查询 IP 地址的地理位置；非成功状态也算作错误
    async fn lookup(&self, ip: &str) -> anyhow::Result<Geolocation>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 带缓存的多 provider 解析器
///
/// 可放在 `Arc` 后共享；唯一的可变状态是缓存，并发访问和同 key 合并由 moka 处理
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoIpLookup>>,
    cache: Cache<String, Geolocation>,
}

impl GeoResolver {
    pub fn with_providers(
        providers: Vec<Arc<dyn GeoIpLookup>>,
        ttl: Duration,
        max_capacity: u64,
    ) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();

        Self { providers, cache }
    }

    /// 根据 AnalyticsConfig 初始化，provider 顺序与配置一致
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        let timeout = Duration::from_secs(config.geo_http_timeout_secs);
        let providers: Vec<Arc<dyn GeoIpLookup>> = config
            .geo_providers
            .iter()
            .map(|p| {
                Arc::new(ExternalApiProvider::new(p.kind, &p.url_template, timeout))
                    as Arc<dyn GeoIpLookup>
            })
            .collect();

        if providers.is_empty() {
            warn!("GeoIP: no providers configured, every lookup will fail");
        } else {
            info!(
                "GeoIP: Initialized with providers [{}]",
                providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Self::with_providers(
            providers,
            Duration::from_secs(config.geo_cache_ttl_secs),
            config.geo_cache_max_capacity,
        )
    }

    /// 查询 IP 地址的地理位置（带缓存）
    ///
    /// `try_get_with` 对同一 key 的并发调用只执行一次闭包，
    /// 返回 Err 时不会写入缓存。
    pub async fn resolve(&self, ip: &str) -> Result<Geolocation> {
        self.cache
            .try_get_with(ip.to_string(), self.lookup_uncached(ip))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn lookup_uncached(&self, ip: &str) -> Result<Geolocation> {
        trace!("GeoIP cache miss for {}", ip);

        for provider in &self.providers {
            match provider.lookup(ip).await {
                Ok(geo) => {
                    debug!(
                        "GeoIP: {} resolved via {} ({})",
                        ip,
                        provider.name(),
                        geo.country_code
                    );
                    return Ok(geo);
                }
                Err(e) => {
                    debug!("GeoIP provider {} failed for {}: {}", provider.name(), ip, e);
                }
            }
        }

        Err(ProxyError::all_providers_failed(format!(
            "no geolocation provider could resolve {}",
            ip
        )))
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        calls: AtomicUsize,
        result: Option<Geolocation>,
    }

    #[async_trait]
    impl GeoIpLookup for Fixed {
        async fn lookup(&self, _ip: &str) -> anyhow::Result<Geolocation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| anyhow::anyhow!("status: fail"))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn us() -> Geolocation {
        Geolocation {
            ip: "8.8.8.8".into(),
            country_code: "US".into(),
            country_name: "United States".into(),
            city: "Mountain View".into(),
            latitude: 37.4,
            longitude: -122.1,
        }
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let failing = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
            result: None,
        });
        let resolver = GeoResolver::with_providers(
            vec![failing.clone()],
            Duration::from_secs(60),
            100,
        );

        assert!(matches!(
            resolver.resolve("1.2.3.4").await,
            Err(ProxyError::AllProvidersFailed(_))
        ));
        assert!(resolver.resolve("1.2.3.4").await.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_providers() {
        let resolver = GeoResolver::with_providers(vec![], Duration::from_secs(60), 10);
        assert_eq!(resolver.provider_count(), 0);
        assert!(resolver.resolve("8.8.8.8").await.is_err());
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let ok = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
            result: Some(us()),
        });
        let resolver =
            GeoResolver::with_providers(vec![ok.clone()], Duration::from_secs(60), 100);

        let first = resolver.resolve("8.8.8.8").await.unwrap();
        let second = resolver.resolve("8.8.8.8").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }
}
