//! Retry wrapper for database writes
//!
//! Analytics workers and first-request routing-target creation write to one
//! pool concurrently. Lock contention and pool exhaustion are transient, so
//! those writes go through [`with_retry`]; anything else fails immediately.

use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// Why a failed statement is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientFailure {
    /// pool acquire timeout or dropped connection
    Connection,
    /// SQLite BUSY / LOCKED
    Busy,
    /// MySQL 1213/1205, PostgreSQL 40P01
    Deadlock,
    /// PostgreSQL 40001
    Serialization,
}

impl fmt::Display for TransientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransientFailure::Connection => "connection",
            TransientFailure::Busy => "database busy",
            TransientFailure::Deadlock => "deadlock",
            TransientFailure::Serialization => "serialization failure",
        };
        f.write_str(s)
    }
}

/// `None` means the error is permanent (constraint violation, bad SQL, ...).
pub fn classify(err: &DbErr) -> Option<TransientFailure> {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Some(TransientFailure::Connection),
        DbErr::Exec(e) | DbErr::Query(e) => classify_runtime(e),
        _ => None,
    }
}

fn classify_runtime(err: &RuntimeErr) -> Option<TransientFailure> {
    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            let code = sqlx_err
                .deref()
                .as_database_error()
                .and_then(|db| db.code().map(|c| c.into_owned()));
            match code.as_deref() {
                Some("5") | Some("6") => Some(TransientFailure::Busy),
                Some("1213") | Some("1205") | Some("40P01") => Some(TransientFailure::Deadlock),
                Some("40001") => Some(TransientFailure::Serialization),
                Some(_) => None,
                None => classify_message(&sqlx_err.to_string()),
            }
        }
        RuntimeErr::Internal(msg) => classify_message(msg),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn classify_message(msg: &str) -> Option<TransientFailure> {
    let msg = msg.to_lowercase();
    if msg.contains("database is locked") || msg.contains("database table is locked") {
        Some(TransientFailure::Busy)
    } else if msg.contains("deadlock") || msg.contains("lock wait timeout") {
        Some(TransientFailure::Deadlock)
    } else if msg.contains("serialization failure") {
        Some(TransientFailure::Serialization)
    } else {
        None
    }
}

/// Up to `max_retries` retries with exponential backoff capped at `max_delay`
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), plus up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = rand::random_range(0..=capped.as_millis() as u64 / 4);
        capped + Duration::from_millis(jitter_ms)
    }
}

impl From<&DatabaseConfig> for RetryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

/// Run `operation`, retrying transient failures according to `policy`.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let Some(reason) = classify(&err) else {
            debug!("{} failed permanently: {}", operation_name, err);
            return Err(err);
        };
        if attempt >= policy.max_retries {
            warn!(
                "{} gave up after {} attempts ({}): {}",
                operation_name,
                attempt + 1,
                reason,
                err
            );
            return Err(err);
        }

        attempt += 1;
        let delay = policy.delay_for(attempt);
        warn!(
            "{} hit {} (retry {}/{} in {:?}): {}",
            operation_name, reason, attempt, policy.max_retries, delay, err
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::error::ConnAcquireErr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)),
            Some(TransientFailure::Connection)
        );
        assert_eq!(
            classify(&DbErr::Exec(RuntimeErr::Internal(
                "database is locked".to_string()
            ))),
            Some(TransientFailure::Busy)
        );
        assert_eq!(
            classify(&DbErr::Query(RuntimeErr::Internal(
                "Deadlock found when trying to get lock".to_string()
            ))),
            Some(TransientFailure::Deadlock)
        );
    }

    #[test]
    fn test_unique_violation_is_permanent() {
        let err = DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed: streaming_proxies.domain_id".to_string(),
        ));
        assert_eq!(classify(&err), None);
        assert_eq!(classify(&DbErr::RecordNotFound("x".into())), None);
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        };

        let first = policy.delay_for(1).as_millis();
        assert!((100..=125).contains(&first));
        let third = policy.delay_for(3).as_millis();
        assert!((400..=500).contains(&third));
        let capped = policy.delay_for(12).as_millis();
        assert!((2000..=2500).contains(&capped));
    }

    #[test]
    fn test_policy_from_database_config() {
        let db = DatabaseConfig {
            retry_count: 7,
            retry_base_delay_ms: 5,
            retry_max_delay_ms: 40,
            ..Default::default()
        };
        let policy = RetryPolicy::from(&db);
        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.base_delay, Duration::from_millis(5));
        assert_eq!(policy.max_delay, Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_busy_database_is_retried() {
        let calls = AtomicU32::new(0);

        let result = with_retry("add_daily_hits", fast(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbErr::Exec(RuntimeErr::Internal(
                        "database is locked".to_string(),
                    )))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result = with_retry("write_access_log", fast(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_runs_once() {
        let calls = AtomicU32::new(0);

        let result = with_retry("create_routing_target", fast(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::RecordNotFound("gone".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
