//! 本地持久存储抽象
//!
//! 日志器与监控器只依赖"按键读写字符串"的能力,
//! 具体后端(内存/Redis)可插拔。

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::models::StorageError;

/// 本地错误日志的存储键
pub const ERROR_LOG_KEY: &str = "error_logs";
/// 当前用户记录的存储键 (`{"id": ...}`)
pub const USER_KEY: &str = "user";

/// 键值存储
///
/// 任何方法都可能失败,调用方负责把失败降级为警告。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键,键不存在时也返回成功 (幂等操作)
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// 后端名称 (用于日志)
    fn backend_name(&self) -> &'static str {
        "unknown"
    }
}

/// 内存存储
///
/// 进程内默认后端,进程退出即丢失。
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
