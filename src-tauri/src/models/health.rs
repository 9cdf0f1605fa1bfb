//! 健康检查模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::PerformanceEntry;

/// 三级健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// 单个子系统某一时刻的探测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub service: String,
    pub status: HealthStatus,
    /// 响应耗时(毫秒)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheck {
    pub fn new(
        service: impl Into<String>,
        status: HealthStatus,
        response_time: Option<f64>,
        error: Option<String>,
    ) -> Self {
        Self {
            service: service.into(),
            status,
            response_time,
            error,
            timestamp: Utc::now(),
        }
    }
}

/// 系统指标快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    /// 最近一次 `memory_usage_percent`, 未记录时为0
    pub memory_usage: f64,
    /// 最近的平台性能条目
    pub performance_entries: Vec<PerformanceEntry>,
    pub is_online: bool,
    /// 最近一次任意健康检查的时间, 无检查时为当前时间
    pub last_health_check: DateTime<Utc>,
    /// 最近一次 `error_rate_5min`, 未记录时为0
    pub error_rate: f64,
}
