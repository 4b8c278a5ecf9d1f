use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、控制面主机名
/// - database: 数据库连接与重试
/// - logging: 日志输出
/// - proxy: 上游转发超时与降级策略
/// - analytics: GeoIP 缓存、Provider 链、分析任务队列
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：CDNP，分隔符：__
    /// 示例：CDNP__SERVER__PORT=9090
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CDNP")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> crate::errors::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::errors::ProxyError::serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// Host 完全匹配这些名字的请求属于控制面，不做代理
    #[serde(default = "default_control_plane_hosts")]
    pub control_plane_hosts: Vec<String>,
    /// Host 以这些前缀开头的请求同样属于控制面
    #[serde(default = "default_control_plane_prefixes")]
    pub control_plane_prefixes: Vec<String>,
}

impl ServerConfig {
    /// 判断 Host（不含端口）是否属于控制面
    pub fn is_control_plane_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.control_plane_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&host))
            || self
                .control_plane_prefixes
                .iter()
                .any(|p| host.starts_with(&p.to_ascii_lowercase()))
    }
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 上游转发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 单次上游请求的总超时（含响应体流式传输）
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 上游传输失败时 301 到上游原始地址；关闭后返回 502
    #[serde(default = "default_redirect_on_upstream_failure")]
    pub redirect_on_upstream_failure: bool,
}

/// GeoIP Provider 类型，决定响应 JSON 的解析方式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoProviderKind {
    IpApi,
    FreeGeoIp,
}

/// 单个 GeoIP Provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoProviderConfig {
    pub kind: GeoProviderKind,
    /// 使用 {ip} 作为占位符，例如: http://ip-api.com/json/{ip}
    pub url_template: String,
}

/// 分析统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_geo_cache_ttl_secs")]
    pub geo_cache_ttl_secs: u64,
    #[serde(default = "default_geo_cache_max_capacity")]
    pub geo_cache_max_capacity: u64,
    #[serde(default = "default_geo_http_timeout_secs")]
    pub geo_http_timeout_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_shutdown_drain_secs")]
    pub shutdown_drain_secs: u64,
    /// 按顺序尝试，第一个成功的结果生效（TOML 中为 [[analytics.geo_providers]]，须放在最后）
    #[serde(default = "default_geo_providers")]
    pub geo_providers: Vec<GeoProviderConfig>,
}

// ============================================================
// 默认值函数
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_control_plane_hosts() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

fn default_control_plane_prefixes() -> Vec<String> {
    vec!["app.".to_string(), "api.".to_string()]
}

fn default_database_url() -> String {
    "cdnproxy.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_redirect_on_upstream_failure() -> bool {
    true
}

fn default_geo_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_geo_cache_max_capacity() -> u64 {
    10_000
}

fn default_geo_http_timeout_secs() -> u64 {
    2
}

fn default_geo_providers() -> Vec<GeoProviderConfig> {
    vec![
        GeoProviderConfig {
            kind: GeoProviderKind::IpApi,
            url_template: "http://ip-api.com/json/{ip}".to_string(),
        },
        GeoProviderConfig {
            kind: GeoProviderKind::FreeGeoIp,
            url_template: "https://freegeoip.app/json/{ip}".to_string(),
        },
    ]
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_workers() -> usize {
    4
}

fn default_shutdown_drain_secs() -> u64 {
    10
}

// ============================================================
// Default 实现
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            control_plane_hosts: default_control_plane_hosts(),
            control_plane_prefixes: default_control_plane_prefixes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: default_upstream_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            redirect_on_upstream_failure: default_redirect_on_upstream_failure(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            geo_cache_ttl_secs: default_geo_cache_ttl_secs(),
            geo_cache_max_capacity: default_geo_cache_max_capacity(),
            geo_http_timeout_secs: default_geo_http_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
            shutdown_drain_secs: default_shutdown_drain_secs(),
            geo_providers: default_geo_providers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_plane_exact_and_prefix() {
        let server = ServerConfig::default();
        assert!(server.is_control_plane_host("localhost"));
        assert!(server.is_control_plane_host("127.0.0.1"));
        assert!(server.is_control_plane_host("app.example.com"));
        assert!(server.is_control_plane_host("API.example.com"));
        assert!(!server.is_control_plane_host("cdn.customer.com"));
        assert!(!server.is_control_plane_host("myapp.example.com"));
    }

    #[test]
    fn test_default_provider_order() {
        let analytics = AnalyticsConfig::default();
        let kinds: Vec<_> = analytics.geo_providers.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![GeoProviderKind::IpApi, GeoProviderKind::FreeGeoIp]);
        assert_eq!(analytics.geo_cache_ttl_secs, 86_400);
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[proxy]"));
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.analytics.geo_providers.len(), 2);
        assert!(parsed.proxy.redirect_on_upstream_failure);
    }
}
