//! 零售后台管理系统的可观测性核心
//!
//! - `ErrorLogger`: 诊断事件的统一出口, 缓冲后批量投递远端并持久化到本地
//! - `ApplicationMonitor`: 性能指标、周期健康检查与操作计时
//!
//! 两者都通过 `AppState` 组装, 宿主通过 `PlatformEvents` 推送全局事件。

pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(feature = "desktop")]
pub mod commands;

pub use state::AppState;
