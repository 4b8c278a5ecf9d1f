//! 外部 GeoIP API 实现
//!
//! 每种 provider 的响应格式不同，由 [`GeoProviderKind`] 决定解析方式：
//! - ip-api.com: `{"status": "success", "country", "countryCode", "city", "lat", "lon"}`
//! - freegeoip.app: `{"ip", "country_code", "country_name", "city", "latitude", "longitude"}`，
//!   能解析即视为成功

use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;
use ureq::Agent;

use super::provider::{GeoIpLookup, Geolocation};
use crate::config::GeoProviderKind;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

#[derive(Deserialize)]
struct FreeGeoIpResponse {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    country_name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

/// 解析 ip-api.com 响应，`status != "success"` 视为失败
pub fn parse_ip_api(ip: &str, body: &str) -> anyhow::Result<Geolocation> {
    let r: IpApiResponse = serde_json::from_str(body).context("invalid ip-api response")?;
    if r.status != "success" {
        bail!("ip-api returned status {:?} for {}", r.status, ip);
    }

    Ok(Geolocation {
        ip: ip.to_string(),
        country_code: r.country_code,
        country_name: r.country,
        city: r.city,
        latitude: r.lat,
        longitude: r.lon,
    })
}

/// 解析 freegeoip.app 响应
pub fn parse_freegeoip(ip: &str, body: &str) -> anyhow::Result<Geolocation> {
    let r: FreeGeoIpResponse =
        serde_json::from_str(body).context("invalid freegeoip response")?;

    Ok(Geolocation {
        ip: if r.ip.is_empty() { ip.to_string() } else { r.ip },
        country_code: r.country_code,
        country_name: r.country_name,
        city: r.city,
        latitude: r.latitude,
        longitude: r.longitude,
    })
}

/// 外部 API GeoIP Provider
///
/// 不带缓存，缓存由 `GeoResolver` 统一持有。
pub struct ExternalApiProvider {
    kind: GeoProviderKind,
    url_template: String,
    agent: Agent,
}

impl ExternalApiProvider {
    /// `url_template` 使用 `{ip}` 作为占位符
    /// 例如: `http://ip-api.com/json/{ip}`
    pub fn new(kind: GeoProviderKind, url_template: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            kind,
            url_template: url_template.to_string(),
            agent,
        }
    }

    pub fn kind(&self) -> GeoProviderKind {
        self.kind
    }

    /// 同步 HTTP 请求，在 spawn_blocking 中调用
    fn fetch_sync(agent: &Agent, url: &str) -> anyhow::Result<String> {
        let resp = agent
            .get(url)
            .call()
            .with_context(|| format!("GeoIP request to \"{}\" failed", url))?;

        resp.into_body()
            .read_to_string()
            .with_context(|| format!("GeoIP response from \"{}\" unreadable", url))
    }
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> anyhow::Result<Geolocation> {
        let url = self.url_template.replace("{ip}", ip);
        let agent = self.agent.clone();

        // ureq 是同步的，放到阻塞线程池执行
        let body = tokio::task::spawn_blocking(move || Self::fetch_sync(&agent, &url))
            .await
            .context("GeoIP spawn_blocking failed")??;

        trace!("{} raw response for {}: {}", self.name(), ip, body);

        match self.kind {
            GeoProviderKind::IpApi => parse_ip_api(ip, &body),
            GeoProviderKind::FreeGeoIp => parse_freegeoip(ip, &body),
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            GeoProviderKind::IpApi => "ip-api",
            GeoProviderKind::FreeGeoIp => "freegeoip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip_api_success() {
        let body = r#"{"status":"success","country":"United States","countryCode":"US",
            "region":"VA","city":"Ashburn","lat":39.03,"lon":-77.5,"query":"8.8.8.8"}"#;
        let geo = parse_ip_api("8.8.8.8", body).unwrap();
        assert_eq!(geo.ip, "8.8.8.8");
        assert_eq!(geo.country_code, "US");
        assert_eq!(geo.country_name, "United States");
        assert_eq!(geo.city, "Ashburn");
        assert_eq!(geo.latitude, 39.03);
    }

    #[test]
    fn test_parse_ip_api_fail_status() {
        let body = r#"{"status":"fail","message":"private range","query":"192.168.1.1"}"#;
        assert!(parse_ip_api("192.168.1.1", body).is_err());
    }

    #[test]
    fn test_parse_ip_api_garbage() {
        assert!(parse_ip_api("1.2.3.4", "<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_parse_freegeoip() {
        let body = r#"{"ip":"1.2.3.4","country_code":"AU","country_name":"Australia",
            "region_code":"","city":"","latitude":-33.49,"longitude":143.21}"#;
        let geo = parse_freegeoip("1.2.3.4", body).unwrap();
        assert_eq!(geo.country_code, "AU");
        assert_eq!(geo.country_name, "Australia");
        assert_eq!(geo.city, "");
        assert_eq!(geo.longitude, 143.21);
    }

    #[test]
    fn test_parse_freegeoip_missing_ip_uses_query() {
        let geo = parse_freegeoip("5.6.7.8", r#"{"country_code":"DE"}"#).unwrap();
        assert_eq!(geo.ip, "5.6.7.8");
    }

    #[test]
    fn test_provider_names() {
        let timeout = Duration::from_secs(1);
        let a = ExternalApiProvider::new(GeoProviderKind::IpApi, "http://x/{ip}", timeout);
        let b = ExternalApiProvider::new(GeoProviderKind::FreeGeoIp, "http://y/{ip}", timeout);
        assert_eq!(a.name(), "ip-api");
        assert_eq!(b.name(), "freegeoip");
        assert_eq!(b.kind(), GeoProviderKind::FreeGeoIp);
    }

    /// 依赖外部网络服务，CI 环境可能失败
    #[tokio::test]
    #[ignore]
    async fn test_ip_api_real_lookup() {
        let provider = ExternalApiProvider::new(
            GeoProviderKind::IpApi,
            "http://ip-api.com/json/{ip}",
            Duration::from_secs(2),
        );
        let geo = provider.lookup("8.8.8.8").await.unwrap();
        assert_eq!(geo.country_code, "US");
    }
}
