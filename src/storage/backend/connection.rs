use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::SqlitePool;
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxSqliteConnector};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::errors::{ProxyError, Result};
use migration::{Migrator, MigratorTrait};

/// 裸路径补上 `sqlite://` 前缀
fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    }
}

/// 打开 SQLite 数据库（不存在则创建），使用 WAL 模式
///
/// 分析 worker 写入的同时请求处理在读取路由目标，`busy_timeout` 覆盖其间短暂的写锁
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    let url = normalize_sqlite_url(database_url);

    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| ProxyError::database_config(format!("invalid SQLite URL {}: {}", url, e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .pragma("temp_store", "memory");

    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| ProxyError::database_connection(format!("SQLite 连接失败: {}", e)))?;
    debug!("SQLite pool opened at {}", url);

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// MySQL / PostgreSQL 连接池
pub async fn connect_generic(
    database_url: &str,
    backend_name: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    let wait = Duration::from_secs(config.timeout);

    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(config.pool_size)
        .min_connections(config.pool_size.min(2))
        .connect_timeout(wait)
        .acquire_timeout(wait)
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let db = Database::connect(options).await.map_err(|e| {
        ProxyError::database_connection(format!("{} 连接失败: {}", backend_name, e))
    })?;
    debug!("{} pool opened (max {})", backend_name, config.pool_size);
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| ProxyError::database_connection(format!("migration failed: {}", e)))?;

    info!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sqlite_url() {
        assert_eq!(normalize_sqlite_url("data/proxy.db"), "sqlite://data/proxy.db");
        assert_eq!(
            normalize_sqlite_url("sqlite://x.db?mode=rwc"),
            "sqlite://x.db?mode=rwc"
        );
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }
}
