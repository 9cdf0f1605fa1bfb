//! 集成测试: 错误日志器的刷新协议
//!
//! 覆盖远端失败重排队、本地持久化独立性、存储故障降级与全局捕获。

mod common;

use backoffice_observability::models::{ErrorContext, LogLevel, PlatformEvent};
use backoffice_observability::services::HttpMethod;
use common::{harness, remote_config, FixedHeapStats, LOG_ENDPOINT};
use std::time::Duration;

#[tokio::test]
async fn test_failed_batch_is_retried_ahead_of_newer_reports() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    let logger = &h.state.error_logger;

    logger.log_warning("first", None);
    h.transport.set_fail(true);
    logger.flush().await;

    // 远端失败后本地仍然写入
    let stats = logger.get_error_stats().await;
    assert_eq!(stats.total_errors, 1);
    assert_eq!(logger.pending_reports().len(), 1);

    logger.log_warning("second", None);
    h.transport.set_fail(false);
    logger.flush().await;

    let batches = h.transport.posted_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], vec!["first"]);
    assert_eq!(batches[1], vec!["first", "second"]);

    // 重试的报告不会在本地重复
    let stats = logger.get_error_stats().await;
    assert_eq!(stats.total_errors, 2);
    assert_eq!(stats.errors_by_level.get("warning"), Some(&2));
    assert!(logger.pending_reports().is_empty());
}

#[tokio::test]
async fn test_rejected_status_counts_as_failure() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    let logger = &h.state.error_logger;

    h.transport.set_status(500);
    logger.log_info("payload", None);
    logger.flush().await;

    assert_eq!(logger.pending_reports().len(), 1);
}

#[tokio::test]
async fn test_storage_outage_never_reaches_caller() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    let logger = &h.state.error_logger;
    h.storage.set_fail(true);

    logger.log_warning("while storage is down", None);
    logger.flush().await;

    // 远端仍然收到, 统计退化为空
    assert_eq!(h.transport.posted_batches(), vec![vec!["while storage is down".to_string()]]);
    assert_eq!(logger.get_error_stats().await.total_errors, 0);
    assert!(logger.pending_reports().is_empty());
}

#[tokio::test]
async fn test_post_request_targets_endpoint_with_json() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    let logger = &h.state.error_logger;

    logger.log_warning(
        "quota nearly exhausted",
        Some(ErrorContext::new().component("Payroll").action("export")),
    );
    logger.flush().await;

    let requests = h.transport.requests();
    let (url, request) = &requests[0];
    assert_eq!(url, LOG_ENDPOINT);
    assert_eq!(request.method, HttpMethod::Post);
    assert!(request
        .headers
        .iter()
        .any(|(name, value)| name == "Content-Type" && value == "application/json"));
}

#[tokio::test]
async fn test_debug_reports_never_leave_the_process() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    let logger = &h.state.error_logger;

    logger.log_debug("cache miss", None);
    logger.flush().await;

    assert!(h.transport.requests().is_empty());
    assert_eq!(logger.get_error_stats().await.total_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn test_global_errors_are_captured_after_start() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    h.state.start().await;

    h.state.events.emit(PlatformEvent::UncaughtError {
        message: "x is undefined".to_string(),
        filename: Some("app.js".to_string()),
        line: Some(10),
        column: Some(4),
        stack: None,
    });
    h.state.events.emit(PlatformEvent::ResourceLoadFailed {
        resource: "logo.png".to_string(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.state.shutdown().await;

    let stats = h.state.error_logger.get_error_stats().await;
    let global: Vec<_> = stats
        .recent_errors
        .iter()
        .filter(|r| r.context.component.as_deref() == Some("Global"))
        .collect();
    assert_eq!(global.len(), 2);
    assert!(global.iter().all(|r| r.level == LogLevel::Error));
    assert!(global
        .iter()
        .any(|r| r.message == "Failed to load resource: logo.png"));
}

#[tokio::test(start_paused = true)]
async fn test_periodic_flush_delivers_queued_warnings() {
    let h = harness(&remote_config(), FixedHeapStats(None));
    h.state.start().await;

    h.state.error_logger.log_warning("slow export", None);
    assert!(h.transport.posted_batches().is_empty());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.transport.posted_batches(), vec![vec!["slow export".to_string()]]);

    h.state.shutdown().await;
}
