use crate::models::{ConfigError, Environment, LogLevel, ObservabilityConfig};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

pub const APP_ENV: &str = "APP_ENV";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENABLE_ERROR_REPORTING: &str = "ENABLE_ERROR_REPORTING";
pub const CRASH_REPORTING_DSN: &str = "CRASH_REPORTING_DSN";
pub const LOGGING_ENDPOINT: &str = "LOGGING_ENDPOINT";
pub const BACKEND_URL: &str = "BACKEND_URL";
pub const BACKEND_API_KEY: &str = "BACKEND_API_KEY";
pub const REDIS_URL: &str = "REDIS_URL";

/// 配置服务
///
/// 把环境变量一次性解析为不可变的 `ObservabilityConfig`,
/// 之后日志器与监控器不再读取全局环境。
pub struct ConfigService;

impl ConfigService {
    /// 获取 .env 文件路径
    ///
    /// 查找顺序:
    /// 1. 当前工作目录的 .env
    /// 2. src-tauri/ 的上层目录(项目根目录)
    fn env_file_path() -> Result<PathBuf, ConfigError> {
        let cwd = env::current_dir()?;

        let env_path = cwd.join(".env");
        if env_path.exists() {
            return Ok(env_path);
        }

        if let Some(parent) = cwd.parent() {
            let parent_env = parent.join(".env");
            if parent_env.exists() {
                return Ok(parent_env);
            }
        }

        Ok(env_path)
    }

    /// 读取 .env 文件, 不存在时返回空集合
    fn read_env_file() -> Result<HashMap<String, String>, ConfigError> {
        let env_path = Self::env_file_path()?;
        if !env_path.exists() {
            tracing::debug!(path = %env_path.display(), "配置文件不存在,仅使用进程环境变量");
            return Ok(HashMap::new());
        }

        let iter = dotenvy::from_path_iter(&env_path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::IoError(e.to_string()))?;
            vars.insert(key, value);
        }
        Ok(vars)
    }

    /// 加载配置
    ///
    /// .env 文件先读, 进程环境变量覆盖同名项。
    pub fn load() -> Result<ObservabilityConfig, ConfigError> {
        let mut vars = Self::read_env_file()?;
        vars.extend(env::vars());

        let config = Self::from_vars(&vars);
        tracing::info!(config = %config.summary_for_logging(), "已加载可观测性配置");
        Ok(config)
    }

    /// 从变量集合推导配置
    ///
    /// 无法识别的取值回退到默认值并告警,不会失败。
    pub fn from_vars(vars: &HashMap<String, String>) -> ObservabilityConfig {
        let get = |key: &str| {
            vars.get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let environment = match get(APP_ENV) {
            Some(value) if value.eq_ignore_ascii_case("development") || value.eq_ignore_ascii_case("dev") => {
                Environment::Development
            }
            Some(value) if value.eq_ignore_ascii_case("production") || value.eq_ignore_ascii_case("prod") => {
                Environment::Production
            }
            Some(value) => {
                tracing::warn!(key = APP_ENV, value, "无法识别的构建模式,使用production");
                Environment::Production
            }
            None => Environment::Production,
        };

        let mut config = ObservabilityConfig::for_environment(environment);

        if let Some(value) = get(LOG_LEVEL) {
            match LogLevel::parse(value) {
                Some(level) => config = config.with_min_log_level(level),
                None => tracing::warn!(
                    key = LOG_LEVEL,
                    value,
                    default = %config.min_log_level,
                    "无法识别的日志级别,使用默认值"
                ),
            }
        }

        if get(ENABLE_ERROR_REPORTING).map_or(false, parse_flag) {
            config = config.with_remote_reporting(
                get(LOGGING_ENDPOINT).map(String::from),
                get(CRASH_REPORTING_DSN).map(String::from),
            );
        }

        if let Some(base_url) = get(BACKEND_URL) {
            config = config.with_backend(base_url.to_string(), get(BACKEND_API_KEY).map(String::from));
        }

        if let Some(redis_url) = get(REDIS_URL) {
            config = config.with_redis_url(redis_url.to_string());
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
