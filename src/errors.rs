use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum ProxyError {
    NotConfigured(String),
    UpstreamUnreachable(String),
    AllProvidersFailed(String),
    PersistenceFailure(String),
    MalformedUpstreamUrl(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
}

impl ProxyError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::NotConfigured(_) => "E001",
            ProxyError::UpstreamUnreachable(_) => "E002",
            ProxyError::AllProvidersFailed(_) => "E003",
            ProxyError::PersistenceFailure(_) => "E004",
            ProxyError::MalformedUpstreamUrl(_) => "E005",
            ProxyError::DatabaseConfig(_) => "E006",
            ProxyError::DatabaseConnection(_) => "E007",
            ProxyError::FileOperation(_) => "E008",
            ProxyError::Serialization(_) => "E009",
            ProxyError::Validation(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::NotConfigured(_) => "Proxy Not Configured",
            ProxyError::UpstreamUnreachable(_) => "Upstream Unreachable",
            ProxyError::AllProvidersFailed(_) => "All Geolocation Providers Failed",
            ProxyError::PersistenceFailure(_) => "Persistence Failure",
            ProxyError::MalformedUpstreamUrl(_) => "Malformed Upstream URL",
            ProxyError::DatabaseConfig(_) => "Database Configuration Error",
            ProxyError::DatabaseConnection(_) => "Database Connection Error",
            ProxyError::FileOperation(_) => "File Operation Error",
            ProxyError::Serialization(_) => "Serialization Error",
            ProxyError::Validation(_) => "Validation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ProxyError::NotConfigured(msg) => msg,
            ProxyError::UpstreamUnreachable(msg) => msg,
            ProxyError::AllProvidersFailed(msg) => msg,
            ProxyError::PersistenceFailure(msg) => msg,
            ProxyError::MalformedUpstreamUrl(msg) => msg,
            ProxyError::DatabaseConfig(msg) => msg,
            ProxyError::DatabaseConnection(msg) => msg,
            ProxyError::FileOperation(msg) => msg,
            ProxyError::Serialization(msg) => msg,
            ProxyError::Validation(msg) => msg,
        }
    }

    /// 错误到达响应路径时返回给客户端的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NotConfigured(_) => StatusCode::NOT_FOUND,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::AllProvidersFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ProxyError {}

// 便捷的构造函数
impl ProxyError {
    pub fn not_configured<T: Into<String>>(msg: T) -> Self {
        ProxyError::NotConfigured(msg.into())
    }

    pub fn upstream_unreachable<T: Into<String>>(msg: T) -> Self {
        ProxyError::UpstreamUnreachable(msg.into())
    }

    pub fn all_providers_failed<T: Into<String>>(msg: T) -> Self {
        ProxyError::AllProvidersFailed(msg.into())
    }

    pub fn persistence_failure<T: Into<String>>(msg: T) -> Self {
        ProxyError::PersistenceFailure(msg.into())
    }

    pub fn malformed_upstream_url<T: Into<String>>(msg: T) -> Self {
        ProxyError::MalformedUpstreamUrl(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ProxyError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ProxyError::DatabaseConnection(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ProxyError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ProxyError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ProxyError::Validation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ProxyError {
    fn from(err: sea_orm::DbErr) -> Self {
        ProxyError::PersistenceFailure(err.to_string())
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::MalformedUpstreamUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ProxyError::not_configured(""),
            ProxyError::upstream_unreachable(""),
            ProxyError::all_providers_failed(""),
            ProxyError::persistence_failure(""),
            ProxyError::malformed_upstream_url(""),
            ProxyError::database_config(""),
            ProxyError::database_connection(""),
            ProxyError::file_operation(""),
            ProxyError::serialization(""),
            ProxyError::validation(""),
        ];
        let mut codes: Vec<_> = all.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::not_configured("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::malformed_upstream_url("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::all_providers_failed("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_url_parse_error_maps_to_malformed() {
        let err: ProxyError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, ProxyError::MalformedUpstreamUrl(_)));
        assert!(err.format_simple().starts_with("Malformed Upstream URL"));
    }
}
