use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 持久化存储相关错误
///
/// 处理与本地键值存储(内存/Redis)交互时的失败场景。
/// 监控核心永远不会把这些错误抛给调用方,只会降级为警告日志。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum StorageError {
    /// 存储连接失败
    ///
    /// 无法建立或维持与存储后端的连接
    #[error("存储连接失败: {0}")]
    ConnectionFailed(String),

    /// 序列化/反序列化失败
    ///
    /// 将数据转换为JSON或从JSON解析失败
    #[error("数据序列化失败: {0}")]
    SerializationError(String),

    /// 存储操作超时
    #[error("存储操作超时: {0}")]
    OperationTimeout(String),

    /// 存储命令执行失败
    ///
    /// 具体的GET/SET/DEL命令执行出错
    #[error("存储命令执行失败: {0}")]
    CommandFailed(String),
}

/// 网络传输相关错误
///
/// 批量上报错误报告、后端可达性探测时的失败场景。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum TransportError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 服务器不可达
    /// - DNS解析失败
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// 请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 服务端返回非2xx状态码
    #[error("服务端拒绝请求: HTTP {status}")]
    Rejected { status: u16 },

    /// 请求构造无效
    ///
    /// URL或请求头格式不正确
    #[error("请求无效: {0}")]
    InvalidRequest(String),
}

/// 实现从redis::RedisError到StorageError的转换
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() {
            StorageError::ConnectionFailed("连接被拒绝".to_string())
        } else if err.is_timeout() {
            StorageError::OperationTimeout(err.to_string())
        } else {
            StorageError::CommandFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// 实现从reqwest::Error到TransportError的转换
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::NetworkFailed("无法连接到服务器".to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::NetworkFailed(err.to_string())
        }
    }
}
