use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::error_report::LogLevel;

/// 默认刷新周期: 30秒
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
/// 默认健康检查周期: 5分钟
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// 启动后首次健康检查的延迟
pub const DEFAULT_INITIAL_HEALTH_CHECK_DELAY: Duration = Duration::from_secs(1);

/// 配置错误
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ConfigError {
    /// 配置值无效
    #[error("无效的配置值 {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// I/O错误
    ///
    /// 读取 .env 文件时的文件系统错误
    #[error("I/O错误: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

/// 构建模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// 可观测性配置
///
/// 构造时一次性确定,之后不可变。每个影响行为的选项都是具名字段,
/// 不在运行期读取全局环境。
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    pub environment: Environment,
    /// 低于此级别的事件被丢弃
    pub min_log_level: LogLevel,
    /// 是否把事件回显到控制台(tracing)
    pub enable_console_logging: bool,
    /// 是否向远端上报批量报告
    pub enable_remote_reporting: bool,
    /// 自定义日志上报端点
    pub remote_endpoint: Option<String>,
    /// 崩溃上报服务的DSN
    pub crash_reporting_key: Option<String>,
    /// 远端后端基础URL (可达性探测)
    pub backend_base_url: Option<String>,
    pub backend_api_key: Option<String>,
    /// 注入到错误上下文的客户端标识
    pub user_agent: String,
    /// 配置后使用Redis作为本地持久存储
    pub redis_url: Option<String>,
    pub flush_interval: Duration,
    pub health_check_interval: Duration,
    pub initial_health_check_delay: Duration,
}

impl ObservabilityConfig {
    /// 按构建模式生成默认配置
    ///
    /// - 开发模式: 最低级别debug, 开启控制台回显
    /// - 生产模式: 最低级别error, 关闭控制台回显
    pub fn for_environment(environment: Environment) -> Self {
        let development = environment.is_development();
        Self {
            environment,
            min_log_level: if development {
                LogLevel::Debug
            } else {
                LogLevel::Error
            },
            enable_console_logging: development,
            enable_remote_reporting: false,
            remote_endpoint: None,
            crash_reporting_key: None,
            backend_base_url: None,
            backend_api_key: None,
            user_agent: default_user_agent(),
            redis_url: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            initial_health_check_delay: DEFAULT_INITIAL_HEALTH_CHECK_DELAY,
        }
    }

    /// 显式设置最低级别 (构建器模式)
    ///
    /// 显式设为debug时同时开启控制台回显。
    pub fn with_min_log_level(mut self, level: LogLevel) -> Self {
        self.min_log_level = level;
        if level == LogLevel::Debug {
            self.enable_console_logging = true;
        }
        self
    }

    pub fn with_remote_reporting(mut self, endpoint: Option<String>, crash_key: Option<String>) -> Self {
        self.enable_remote_reporting = true;
        self.remote_endpoint = endpoint;
        self.crash_reporting_key = crash_key;
        self
    }

    pub fn with_backend(mut self, base_url: String, api_key: Option<String>) -> Self {
        self.backend_base_url = Some(base_url);
        self.backend_api_key = api_key;
        self
    }

    pub fn with_redis_url(mut self, redis_url: String) -> Self {
        self.redis_url = Some(redis_url);
        self
    }

    /// 获取配置摘要 (用于日志,不记录密钥)
    pub fn summary_for_logging(&self) -> String {
        format!(
            "env={:?} level={} console={} remote={} endpoint={} crash_reporting={} backend={} storage={}",
            self.environment,
            self.min_log_level,
            self.enable_console_logging,
            self.enable_remote_reporting,
            self.remote_endpoint.as_deref().unwrap_or("-"),
            self.crash_reporting_key.is_some(),
            self.backend_base_url.as_deref().unwrap_or("-"),
            if self.redis_url.is_some() { "redis" } else { "memory" },
        )
    }
}

impl Default for ObservabilityConfig {
    /// 默认配置: 生产模式
    fn default() -> Self {
        Self::for_environment(Environment::Production)
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
