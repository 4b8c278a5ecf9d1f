//! tracing 订阅器初始化
//!
//! 日志输出到 stdout，或配置的文件（可按天滚动）。`RUST_LOG` 优先于
//! `logging.level`。

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

type BoxedWriter = Box<dyn Write + Send + Sync>;

fn rolling_writer(log_file: &str, keep: usize) -> Result<BoxedWriter> {
    let path = Path::new(log_file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cdnproxy");

    let appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(keep)
        .build(dir)
        .with_context(|| format!("cannot set up rolling log in {}", dir.display()))?;
    Ok(Box::new(appender))
}

fn append_writer(log_file: &str) -> Result<BoxedWriter> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("cannot open log file {}", log_file))?;
    Ok(Box::new(file))
}

/// 安装全局 subscriber，配置加载后调用一次
///
/// 返回的 guard 需保持到进程退出，否则缓冲中的日志会丢失
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let log_file = config.file.as_deref().filter(|f| !f.is_empty());

    let writer = match log_file {
        Some(f) if config.enable_rotation => rolling_writer(f, config.max_backups as usize)?,
        Some(f) => append_writer(f)?,
        None => Box::new(std::io::stdout()),
    };
    let (writer, guard) = tracing_appender::non_blocking(writer);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_ansi(log_file.is_none());

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("tracing subscriber already set: {}", e))?;

    Ok(guard)
}
