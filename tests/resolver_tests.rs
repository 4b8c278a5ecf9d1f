//! 路由目标解析测试
//!
//! 每个测试使用独立的临时 SQLite 数据库

use std::sync::Arc;

use cdnproxy::config::DatabaseConfig;
use cdnproxy::errors::ProxyError;
use cdnproxy::services::TargetResolver;
use cdnproxy::storage::SeaOrmStorage;
use tempfile::TempDir;

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite", &DatabaseConfig::default())
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

#[tokio::test]
async fn test_unknown_host_is_not_configured() {
    let (storage, _dir) = create_temp_storage().await;
    let resolver = TargetResolver::new(storage);

    let result = resolver.resolve("nobody.example.com").await;
    assert!(matches!(result, Err(ProxyError::NotConfigured(_))));
}

#[tokio::test]
async fn test_target_created_once_then_reused() {
    let (storage, _dir) = create_temp_storage().await;
    let domain = storage
        .insert_domain("video.example.com", 42, "http://origin.example.com/")
        .await
        .unwrap();
    let resolver = TargetResolver::new(storage.clone());

    let (first, created) = resolver.resolve("video.example.com").await.unwrap();
    assert!(created);
    assert!(first.active);
    assert_eq!(first.domain_id, domain.id);
    assert_eq!(first.owner_user_id, 42);
    assert_eq!(first.upstream_url, "http://origin.example.com/");

    let (second, created) = resolver.resolve("video.example.com").await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);

    assert_eq!(storage.count_routing_targets(domain.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_create_one_target() {
    let (storage, _dir) = create_temp_storage().await;
    let domain = storage
        .insert_domain("live.example.com", 7, "http://origin.example.com/live")
        .await
        .unwrap();
    let resolver = Arc::new(TargetResolver::new(storage.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            resolver.resolve("live.example.com").await
        }));
    }

    let mut ids = Vec::new();
    let mut creators = 0;
    for h in handles {
        let (target, created) = h.await.unwrap().unwrap();
        ids.push(target.id);
        if created {
            creators += 1;
        }
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(creators, 1);
    assert_eq!(storage.count_routing_targets(domain.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_target_url_is_not_configured() {
    let (storage, _dir) = create_temp_storage().await;
    let domain = storage
        .insert_domain("empty.example.com", 1, "   ")
        .await
        .unwrap();
    let resolver = TargetResolver::new(storage.clone());

    let result = resolver.resolve("empty.example.com").await;
    assert!(matches!(result, Err(ProxyError::NotConfigured(_))));
    assert_eq!(storage.count_routing_targets(domain.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_inactive_target_is_not_recreated() {
    let (storage, _dir) = create_temp_storage().await;
    let domain = storage
        .insert_domain("paused.example.com", 3, "http://origin.example.com/")
        .await
        .unwrap();
    let resolver = TargetResolver::new(storage.clone());

    let (target, _) = resolver.resolve("paused.example.com").await.unwrap();
    assert!(storage.set_routing_target_active(target.id, false).await.unwrap());

    let result = resolver.resolve("paused.example.com").await;
    assert!(matches!(result, Err(ProxyError::NotConfigured(_))));
    assert_eq!(storage.count_routing_targets(domain.id).await.unwrap(), 1);

    // 重新启用后恢复
    assert!(storage.set_routing_target_active(target.id, true).await.unwrap());
    let (again, created) = resolver.resolve("paused.example.com").await.unwrap();
    assert!(!created);
    assert_eq!(again.id, target.id);
}

#[tokio::test]
async fn test_set_active_unknown_id() {
    let (storage, _dir) = create_temp_storage().await;
    assert!(!storage.set_routing_target_active(9999, false).await.unwrap());
}
