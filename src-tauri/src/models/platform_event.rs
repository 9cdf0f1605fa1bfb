//! 平台事件
//!
//! 宿主环境(桌面外壳/前端桥接)推送给监控核心的事件,
//! 取代直接挂载全局 window 监听器。

use serde::{Deserialize, Serialize};

use super::metric::PerformanceEntry;

/// 平台事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// 未捕获的同步错误
    UncaughtError {
        message: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        line: Option<u32>,
        #[serde(default)]
        column: Option<u32>,
        #[serde(default)]
        stack: Option<String>,
    },
    /// 未处理的异步拒绝
    UnhandledRejection {
        reason: String,
        #[serde(default)]
        promise: Option<String>,
    },
    /// 子资源加载失败
    ResourceLoadFailed { resource: String },
    Online,
    Offline,
    /// 平台性能观察器产生的条目
    PerformanceEntry(PerformanceEntry),
    /// 应用即将卸载
    Unload,
}
