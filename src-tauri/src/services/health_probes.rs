//! 健康探测
//!
//! 四个相互独立的周期探测,以及把原始观测值映射为三级状态的分类规则。
//! 探测本身从不返回错误: 任何失败都被归类为某个健康状态。

use chrono::Utc;
use tokio::time::Instant;

use super::error_logger::ErrorLogger;
use super::heap_stats::HeapStatsSource;
use super::storage::KeyValueStore;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::models::{HealthStatus, StorageError, TransportError};

pub const BACKEND_SERVICE: &str = "backend";
pub const STORAGE_SERVICE: &str = "local_storage";
pub const MEMORY_SERVICE: &str = "memory";
pub const ERRORS_SERVICE: &str = "errors";
pub const NETWORK_SERVICE: &str = "network";

pub const BACKEND_RESPONSE_METRIC: &str = "backend_response_time";
pub const MEMORY_USAGE_METRIC: &str = "memory_usage_percent";
pub const ERROR_RATE_METRIC: &str = "error_rate_5min";

const MEMORY_UNHEALTHY_PERCENT: f64 = 90.0;
const MEMORY_DEGRADED_PERCENT: f64 = 75.0;
const ERROR_RATE_UNHEALTHY: usize = 10;
const ERROR_RATE_DEGRADED: usize = 5;
/// 错误量统计窗口(秒)
pub const ERROR_RATE_WINDOW_SECS: i64 = 5 * 60;

const STORAGE_SENTINEL_KEY: &str = "health_check_test";

/// 一次探测的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub service: &'static str,
    pub status: HealthStatus,
    pub response_time: Option<f64>,
    pub error: Option<String>,
    /// 探测附带记录的指标
    pub metric: Option<(&'static str, f64)>,
}

impl ProbeOutcome {
    fn new(service: &'static str, status: HealthStatus) -> Self {
        Self {
            service,
            status,
            response_time: None,
            error: None,
            metric: None,
        }
    }

    fn with_response_time(mut self, response_time: f64) -> Self {
        self.response_time = Some(response_time);
        self
    }

    fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn with_metric(mut self, name: &'static str, value: f64) -> Self {
        self.metric = Some((name, value));
        self
    }
}

// ==================== 分类规则 ====================

/// 内存压力: >90% 不健康, >75% 降级
pub fn classify_memory(usage_percent: f64) -> HealthStatus {
    if usage_percent > MEMORY_UNHEALTHY_PERCENT {
        HealthStatus::Unhealthy
    } else if usage_percent > MEMORY_DEGRADED_PERCENT {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// 近5分钟错误量: >10 不健康, >5 降级
pub fn classify_error_rate(recent_errors: usize) -> HealthStatus {
    if recent_errors > ERROR_RATE_UNHEALTHY {
        HealthStatus::Unhealthy
    } else if recent_errors > ERROR_RATE_DEGRADED {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// 后端可达性: 2xx 健康, 有响应但失败 降级, 请求本身失败 不健康
pub fn classify_backend_response(result: &Result<HttpResponse, TransportError>) -> HealthStatus {
    match result {
        Ok(response) if response.ok => HealthStatus::Healthy,
        Ok(_) => HealthStatus::Degraded,
        Err(_) => HealthStatus::Unhealthy,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

// ==================== 探测 ====================

/// 后端可达性探测
///
/// 对 `{base_url}/rest/v1/` 发送HEAD请求并计时。
pub async fn probe_backend(
    transport: &dyn Transport,
    base_url: &str,
    api_key: Option<&str>,
) -> ProbeOutcome {
    let url = format!("{}/rest/v1/", base_url.trim_end_matches('/'));
    let mut request = HttpRequest::head();
    if let Some(key) = api_key {
        request = request
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key));
    }

    let started = Instant::now();
    let result = transport.send(&url, request).await;
    let response_time = elapsed_ms(started);

    let outcome = ProbeOutcome::new(BACKEND_SERVICE, classify_backend_response(&result))
        .with_response_time(response_time)
        .with_metric(BACKEND_RESPONSE_METRIC, response_time);

    match result {
        Ok(response) if response.ok => outcome,
        Ok(response) => outcome.with_error(format!("HTTP {}", response.status)),
        Err(e) => outcome.with_error(e.to_string()),
    }
}

/// 本地存储完整性探测
///
/// 写入哨兵值、读回、删除,读回值必须完全一致。
pub async fn probe_storage(storage: &dyn KeyValueStore) -> ProbeOutcome {
    let sentinel = format!("health_check_{}", Utc::now().timestamp_millis());
    let started = Instant::now();

    let roundtrip = async {
        storage.set(STORAGE_SENTINEL_KEY, &sentinel).await?;
        let read_back = storage.get(STORAGE_SENTINEL_KEY).await?;
        storage.remove(STORAGE_SENTINEL_KEY).await?;
        Ok::<_, StorageError>(read_back)
    }
    .await;
    let response_time = elapsed_ms(started);

    match roundtrip {
        Ok(Some(value)) if value == sentinel => {
            ProbeOutcome::new(STORAGE_SERVICE, HealthStatus::Healthy).with_response_time(response_time)
        }
        Ok(_) => ProbeOutcome::new(STORAGE_SERVICE, HealthStatus::Unhealthy)
            .with_response_time(response_time)
            .with_error("读回的哨兵值不一致"),
        Err(e) => ProbeOutcome::new(STORAGE_SERVICE, HealthStatus::Unhealthy)
            .with_response_time(response_time)
            .with_error(e.to_string()),
    }
}

/// 内存压力探测, 运行时不提供统计时返回 `None`
pub fn probe_memory(source: &dyn HeapStatsSource) -> Option<ProbeOutcome> {
    let usage_percent = source.heap_stats()?.usage_percent()?;

    Some(
        ProbeOutcome::new(MEMORY_SERVICE, classify_memory(usage_percent))
            .with_metric(MEMORY_USAGE_METRIC, usage_percent),
    )
}

/// 近期错误量探测
pub async fn probe_error_rate(logger: &ErrorLogger) -> ProbeOutcome {
    let since = Utc::now() - chrono::Duration::seconds(ERROR_RATE_WINDOW_SECS);
    let count = logger.recent_errors(since).await.len();

    ProbeOutcome::new(ERRORS_SERVICE, classify_error_rate(count)).with_metric(ERROR_RATE_METRIC, count as f64)
}
