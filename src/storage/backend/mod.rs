//! SeaORM 存储后端
//!
//! 支持 SQLite、MySQL/MariaDB 和 PostgreSQL

mod access_log;
mod connection;
mod converters;
pub mod retry;
mod routing;
mod traffic;

use std::time::{Duration, Instant};

use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::errors::{ProxyError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(ProxyError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

async fn open_connection(
    database_url: &str,
    backend_name: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    if backend_name == "sqlite" {
        connect_sqlite(database_url).await
    } else {
        connect_generic(database_url, backend_name, config).await
    }
}

/// 基于 SeaORM 的存储
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryPolicy,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(ProxyError::database_config("database_url is empty"));
        }

        let backend_name = normalize_backend_name(backend_name);

        // 迁移用独立连接：连接池里已打开的 SQLite 连接会缓存迁移前的 schema，
        // 之后的 ON CONFLICT 语句在 prepare 阶段找不到新建的唯一索引
        let migrator = open_connection(database_url, &backend_name, config).await?;
        run_migrations(&migrator).await?;

        let db = if is_in_memory(database_url) {
            // 内存库关闭即丢失，只能沿用同一个连接
            migrator
        } else {
            migrator
                .close()
                .await
                .map_err(|e| ProxyError::database_connection(e.to_string()))?;
            open_connection(database_url, &backend_name, config).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retry_config: retry::RetryPolicy::from(config),
        };

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 执行一次简单查询，返回往返耗时
    pub async fn ping(&self, timeout: Duration) -> Result<Duration> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.db.execute_unprepared("SELECT 1")).await {
            Ok(Ok(_)) => Ok(start.elapsed()),
            Ok(Err(e)) => Err(ProxyError::database_connection(e.to_string())),
            Err(_) => Err(ProxyError::database_connection(format!(
                "ping timed out after {:?}",
                timeout
            ))),
        }
    }

    /// 关闭连接池，共享同一连接池的克隆也随之失效
    pub async fn close(&self) -> Result<()> {
        self.db
            .clone()
            .close()
            .await
            .map_err(|e| ProxyError::database_connection(e.to_string()))?;
        info!("Database connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend() {
        assert_eq!(infer_backend_from_url("cdnproxy.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite:///tmp/x.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url(":memory:").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@h/db").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://u:p@h/db").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_normalize_backend_name() {
        assert_eq!(normalize_backend_name("mariadb"), "mysql");
        assert_eq!(normalize_backend_name("postgres"), "postgres");
    }
}
