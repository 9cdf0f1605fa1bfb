//! 服务层模块
//!
//! - `error_logger`: 错误日志器, 缓冲/批量刷新/本地持久化
//! - `monitor`: 应用监控器, 指标/健康检查/计时
//! - `health_probes`: 健康探测与分级规则
//! - `storage` / `redis_store`: 本地持久存储
//! - `transport`: 远端HTTP投递
//! - `heap_stats`: 进程内存统计
//! - `platform_events`: 平台事件总线
//! - `config_service`: 环境变量到配置的解析
//!
//! # 服务架构
//!
//! ```text
//!        PlatformEvents
//!         │          │
//!         ▼          ▼
//! ┌──────────────┐  ┌──────────────────┐
//! │ ErrorLogger  │◄─┤ ApplicationMonitor│
//! └──┬────────┬──┘  └──┬─────────┬─────┘
//!    │        │        │         │
//!    ▼        ▼        ▼         ▼
//! KeyValueStore   Transport   HeapStatsSource
//! ```

pub mod config_service;
pub mod error_logger;
pub mod health_probes;
pub mod heap_stats;
pub mod monitor;
pub mod platform_events;
pub mod redis_store;
pub mod storage;
pub mod transport;

// 重导出常用类型,简化外部引用
pub use config_service::ConfigService;
pub use error_logger::ErrorLogger;
pub use heap_stats::{HeapStats, HeapStatsSource, SysinfoHeapStats};
pub use monitor::ApplicationMonitor;
pub use platform_events::PlatformEvents;
pub use redis_store::RedisStore;
pub use storage::{KeyValueStore, MemoryStore};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
