//! 性能指标模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单次数值观测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl PerformanceMetric {
    pub fn new(name: impl Into<String>, value: f64, tags: Option<HashMap<String, String>>) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Utc::now(),
            tags,
        }
    }

    /// 是否为耗时类指标 (名称包含 `time` 或 `duration`, 大小写敏感)
    pub fn is_timing(&self) -> bool {
        self.name.contains("time") || self.name.contains("duration")
    }
}

/// 平台性能条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Navigation,
    Resource,
    Measure,
}

/// 平台性能条目
///
/// 来自宿主的性能观察器 (页面导航/资源加载),
/// 或由 `measure_operation` 自行产生的 measure 条目。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: EntryType,
    pub start_time: DateTime<Utc>,
    /// 耗时(毫秒)
    pub duration: f64,
}

impl PerformanceEntry {
    pub fn measure(name: impl Into<String>, start_time: DateTime<Utc>, duration: f64) -> Self {
        Self {
            name: name.into(),
            entry_type: EntryType::Measure,
            start_time,
            duration,
        }
    }
}
