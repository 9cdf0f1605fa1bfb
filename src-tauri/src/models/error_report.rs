//! 错误报告模型
//!
//! 定义诊断事件的数据结构: 级别、上下文、报告本体与统计快照。
//! 字段使用camelCase序列化,与前端及远端上报接口的JSON格式对齐。

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 本地错误日志统计时返回的最近条目数
pub const RECENT_ERRORS_LIMIT: usize = 10;

/// 日志级别
///
/// 排序即严重程度: `Debug < Info < Warning < Error`,
/// 用于与配置的最低级别比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    /// 解析级别字符串
    ///
    /// 大小写不敏感,`warn` 视为 `warning`。无法识别时返回 `None`。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 错误上下文
///
/// 附着在每条报告上。除 session/userAgent/url/timestamp 由日志器在缺失时注入外,
/// 其余字段均由调用方按需填写。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// 产生事件的组件名 (参与指纹计算)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// 产生事件的动作名 (参与指纹计算)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置组件名 (构建器模式)
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// 设置动作名 (构建器模式)
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 追加一项元数据 (构建器模式)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 被记录的失败
///
/// 统一承载字符串消息与 `std::error::Error`:
/// 后者的 source 链会展开为 `stack` 文本。
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub message: String,
    pub stack: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// 从错误值构造,逐层展开 `source()` 作为堆栈文本
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::new(message)
    }
}

impl From<&String> for Failure {
    fn from(message: &String) -> Self {
        Failure::new(message.clone())
    }
}

/// 错误报告
///
/// 每次日志调用创建一条,创建后不再修改。
/// 在内存队列中等待刷新,刷新时写入远端与本地持久日志。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// 唯一ID: `{毫秒时间戳}-{随机后缀}`
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub level: LogLevel,
    #[serde(default)]
    pub context: ErrorContext,
    /// `(message, component, action)` 的确定性短哈希
    pub fingerprint: String,
}

impl ErrorReport {
    pub fn new(failure: Failure, level: LogLevel, context: ErrorContext) -> Self {
        let fingerprint = fingerprint(
            &failure.message,
            context.component.as_deref(),
            context.action.as_deref(),
        );

        Self {
            id: generate_report_id(),
            message: failure.message,
            stack: failure.stack,
            level,
            context,
            fingerprint,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.context.timestamp
    }
}

/// 计算报告指纹
///
/// 只取决于 `(message, component, action)`,与时间戳无关,
/// 相同三元组总是得到相同指纹,供下游去重/分组。
pub fn fingerprint(message: &str, component: Option<&str>, action: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update([0x1f]);
    hasher.update(component.unwrap_or_default().as_bytes());
    hasher.update([0x1f]);
    hasher.update(action.unwrap_or_default().as_bytes());

    hasher.finalize()[..8]
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn generate_report_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// 本地错误日志统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total_errors: usize,
    pub errors_by_level: BTreeMap<String, usize>,
    /// 最近的条目,按写入顺序(旧到新)
    pub recent_errors: Vec<ErrorReport>,
}

impl ErrorStats {
    /// 从本地日志的原始JSON计算统计
    ///
    /// 缺失或损坏的数据视为空日志,永不失败。
    /// 单条记录格式不完整时仍计入总数与级别分布,只是不会出现在 `recent_errors` 中。
    pub fn from_raw_log(raw: Option<&str>) -> Self {
        let entries = match raw.map(serde_json::from_str::<Vec<Value>>) {
            Some(Ok(entries)) => entries,
            _ => return Self::default(),
        };

        let mut errors_by_level = BTreeMap::new();
        for entry in &entries {
            if let Some(level) = entry.get("level").and_then(Value::as_str) {
                *errors_by_level.entry(level.to_string()).or_insert(0) += 1;
            }
        }

        let recent_start = entries.len().saturating_sub(RECENT_ERRORS_LIMIT);
        let recent_errors = entries[recent_start..]
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect();

        Self {
            total_errors: entries.len(),
            errors_by_level,
            recent_errors,
        }
    }
}
