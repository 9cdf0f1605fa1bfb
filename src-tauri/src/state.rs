use crate::models::ObservabilityConfig;
use crate::services::{
    ApplicationMonitor, ErrorLogger, HeapStatsSource, KeyValueStore, MemoryStore, PlatformEvents,
    RedisStore, ReqwestTransport, SysinfoHeapStats, Transport,
};
use std::sync::Arc;

/// 应用全局状态
///
/// - error_logger: 诊断事件出口
/// - monitor: 指标与健康检查, 通过 error_logger 上报
/// - events: 宿主推送平台事件的唯一入口
pub struct AppState {
    pub error_logger: ErrorLogger,
    pub monitor: ApplicationMonitor,
    pub events: PlatformEvents,
}

impl AppState {
    /// 按配置组装默认后端
    ///
    /// 配置了 redis_url 时使用Redis持久化,否则使用进程内存储。
    ///
    /// # 错误处理
    /// Redis连接池或HTTP客户端无法创建时初始化失败。
    pub fn new(config: &ObservabilityConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage: Arc<dyn KeyValueStore> = match config.redis_url.as_deref() {
            Some(redis_url) => Arc::new(RedisStore::new(redis_url)?),
            None => Arc::new(MemoryStore::new()),
        };
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let heap_stats: Arc<dyn HeapStatsSource> = Arc::new(SysinfoHeapStats::new());

        Ok(Self::with_backends(config, storage, transport, heap_stats))
    }

    /// 用给定后端组装状态
    pub fn with_backends(
        config: &ObservabilityConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        heap_stats: Arc<dyn HeapStatsSource>,
    ) -> Self {
        let error_logger = ErrorLogger::new(config, Arc::clone(&storage), Arc::clone(&transport));
        let monitor = ApplicationMonitor::new(config, error_logger.clone(), storage, transport, heap_stats);

        tracing::info!(config = %config.summary_for_logging(), "AppState initialized");

        Self {
            error_logger,
            monitor,
            events: PlatformEvents::new(),
        }
    }

    /// 启动日志器与监控器的后台任务
    pub async fn start(&self) {
        self.error_logger.start(&self.events).await;
        self.monitor.start(&self.events);
    }

    /// 停止监控器, 再让日志器做最后一次刷新
    pub async fn shutdown(&self) {
        self.monitor.destroy();
        self.error_logger.shutdown().await;
    }
}
