//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 存储/传输错误类型
//! - error_report: 错误报告、上下文、指纹与统计
//! - metric: 性能指标与性能条目
//! - health: 健康检查与系统指标快照
//! - config: 不可变的可观测性配置
//! - platform_event: 宿主推送的平台事件
//! - frontend_log: 前端经IPC上报的日志

pub mod config;
pub mod error_report;
pub mod errors;
pub mod frontend_log;
pub mod health;
pub mod metric;
pub mod platform_event;

// 重导出常用类型,简化外部引用
pub use config::{ConfigError, Environment, ObservabilityConfig};
pub use error_report::{fingerprint, ErrorContext, ErrorReport, ErrorStats, Failure, LogLevel};
pub use errors::{StorageError, TransportError};
pub use frontend_log::FrontendLog;
pub use health::{HealthCheck, HealthStatus, SystemMetrics};
pub use metric::{EntryType, PerformanceEntry, PerformanceMetric};
pub use platform_event::PlatformEvent;
