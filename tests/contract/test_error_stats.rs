//! 契约测试: get_error_stats
//!
//! 统计结果的JSON形状, 以及对本地日志内容的容错。

use backoffice_observability::models::{Environment, LogLevel, ObservabilityConfig};
use backoffice_observability::services::storage::ERROR_LOG_KEY;
use backoffice_observability::services::{
    ErrorLogger, KeyValueStore, MemoryStore, ReqwestTransport,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn local_logger(store: Arc<MemoryStore>) -> ErrorLogger {
    let config =
        ObservabilityConfig::for_environment(Environment::Development).with_min_log_level(LogLevel::Info);
    ErrorLogger::new(&config, store, Arc::new(ReqwestTransport::new().unwrap()))
}

#[tokio::test]
async fn test_stats_response_shape() {
    let store = Arc::new(MemoryStore::new());
    let logger = local_logger(store);

    logger.log_error("Contract save failed", None);
    logger.log_warning("Stock below threshold", None);
    logger.log_warning("Stock below threshold", None);
    logger.flush().await;

    let stats = serde_json::to_value(logger.get_error_stats().await).unwrap();
    assert_eq!(stats["totalErrors"], 3);
    assert_eq!(stats["errorsByLevel"], json!({"error": 1, "warning": 2}));

    let recent = stats["recentErrors"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["message"], "Contract save failed");
    assert_eq!(recent[1]["fingerprint"], recent[2]["fingerprint"]);
}

#[tokio::test]
async fn test_recent_errors_are_the_last_ten() {
    let store = Arc::new(MemoryStore::new());
    let logger = local_logger(store);

    for i in 0..15 {
        logger.log_info(format!("event {}", i), None);
    }
    logger.flush().await;

    let stats = logger.get_error_stats().await;
    assert_eq!(stats.total_errors, 15);
    assert_eq!(stats.recent_errors.len(), 10);
    assert_eq!(stats.recent_errors[0].message, "event 5");
    assert_eq!(stats.recent_errors[9].message, "event 14");
}

#[tokio::test]
async fn test_corrupt_local_log_yields_empty_stats() {
    let store = Arc::new(MemoryStore::new());
    store.set(ERROR_LOG_KEY, "{not json").await.unwrap();

    let stats = serde_json::to_value(local_logger(store).get_error_stats().await).unwrap();
    assert_eq!(
        stats,
        json!({"totalErrors": 0, "errorsByLevel": {}, "recentErrors": []})
    );
}

#[tokio::test]
async fn test_entries_written_by_older_clients_are_counted() {
    let store = Arc::new(MemoryStore::new());
    let legacy: Value = json!([
        {"level": "error", "message": "legacy"},
        {"level": "info"}
    ]);
    store.set(ERROR_LOG_KEY, &legacy.to_string()).await.unwrap();

    let stats = local_logger(store).get_error_stats().await;
    assert_eq!(stats.total_errors, 2);
    assert_eq!(stats.errors_by_level.get("error"), Some(&1));
    assert_eq!(stats.errors_by_level.get("info"), Some(&1));
}
