//! GeoIP 服务模块
//!
//! 客户端 IP → 粗略地理位置：
//! - moka 缓存，TTL 可配置
//! - 外部 HTTP API 按顺序回退 (ip-api.com → freegeoip.app)

mod external_api;
mod provider;

pub use external_api::{ExternalApiProvider, parse_freegeoip, parse_ip_api};
pub use provider::{GeoIpLookup, GeoResolver, Geolocation};
