use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use super::storage::KeyValueStore;
use crate::models::StorageError;

/// Redis键前缀,与其他应用数据隔离
const KEY_PREFIX: &str = "backoffice:";

/// Redis持久存储
///
/// 管理连接池,为日志器/监控器提供键值读写。
/// 职责单一:仅处理数据持久化,不涉及日志策略。
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// 初始化Redis连接池
    ///
    /// # 参数
    /// - `redis_url`: Redis连接URL,格式: `redis://host:port` 或 `redis://host:port/db`
    ///
    /// # 错误
    /// 返回 `StorageError::ConnectionFailed` 如果连接池创建失败
    ///
    /// # 示例
    /// ```no_run
    /// use backoffice_observability::services::RedisStore;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = RedisStore::new("redis://localhost:6379")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(redis_url: &str) -> Result<Self, StorageError> {
        let config = Config::from_url(redis_url);
        let pool = config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            tracing::error!(
                redis_url = %redis_url,
                error = %e,
                "创建Redis连接池失败"
            );
            StorageError::ConnectionFailed(e.to_string())
        })?;

        tracing::info!(redis_url = %redis_url, "Redis连接池创建成功");
        Ok(Self { pool })
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, StorageError> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection().await?;
        let redis_key = Self::namespaced(key);

        let value: Option<String> = conn.get(&redis_key).await?;

        tracing::debug!(
            redis_key = %redis_key,
            found = value.is_some(),
            "从Redis读取"
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let redis_key = Self::namespaced(key);

        conn.set::<_, _, ()>(&redis_key, value).await?;

        tracing::debug!(redis_key = %redis_key, bytes = value.len(), "已写入Redis");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let redis_key = Self::namespaced(key);

        conn.del::<_, ()>(&redis_key).await?;

        tracing::debug!(redis_key = %redis_key, "已从Redis删除");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
