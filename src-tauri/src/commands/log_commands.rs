//! 前端日志与监控命令
//!
//! 前端经IPC把诊断事件交给日志器, 并读取统计与健康状态。

use std::collections::HashMap;
use tauri::State;

use crate::models::{ErrorStats, FrontendLog, HealthCheck, PlatformEvent, SystemMetrics};
use crate::state::AppState;

/// 记录单条前端日志事件
#[tauri::command]
pub async fn log_frontend_event(state: State<'_, AppState>, log: FrontendLog) -> Result<(), String> {
    state.error_logger.log_frontend(log);
    Ok(())
}

/// 批量记录前端日志
///
/// 前端可批量发送日志,减少IPC调用次数。
#[tauri::command]
pub async fn log_frontend_batch(state: State<'_, AppState>, logs: Vec<FrontendLog>) -> Result<(), String> {
    tracing::debug!(count = logs.len(), "收到前端日志批次");
    for log in logs {
        state.error_logger.log_frontend(log);
    }
    Ok(())
}

/// 记录前端性能指标
#[tauri::command]
pub async fn record_frontend_metric(
    state: State<'_, AppState>,
    name: String,
    value: f64,
    tags: Option<HashMap<String, String>>,
) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("指标值无效: {}", value));
    }
    state.monitor.record_metric(name, value, tags);
    Ok(())
}

/// 转发宿主平台事件 (全局错误、网络状态、性能条目、卸载)
#[tauri::command]
pub async fn report_platform_event(state: State<'_, AppState>, event: PlatformEvent) -> Result<usize, String> {
    Ok(state.events.emit(event))
}

#[tauri::command]
pub async fn get_error_stats(state: State<'_, AppState>) -> Result<ErrorStats, String> {
    Ok(state.error_logger.get_error_stats().await)
}

#[tauri::command]
pub async fn get_health_status(state: State<'_, AppState>) -> Result<HashMap<String, HealthCheck>, String> {
    Ok(state.monitor.get_health_status())
}

#[tauri::command]
pub async fn get_system_metrics(state: State<'_, AppState>) -> Result<SystemMetrics, String> {
    Ok(state.monitor.get_system_metrics())
}
