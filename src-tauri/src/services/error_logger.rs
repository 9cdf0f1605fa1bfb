//! 错误日志器
//!
//! 所有诊断事件的统一入口:
//! - 按最低级别过滤,回显到tracing控制台
//! - 内存队列缓冲(上限100,超出淘汰最旧)
//! - 批量刷新到远端上报端点与本地持久日志(上限1000)
//! - 远端失败时整批放回队首,下次优先重试
//! - 捕获平台上报的全局错误与进程panic
//!
//! 日志行为本身永远不会向调用方返回错误。

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::platform_events::{next_event, PlatformEvents};
use super::storage::{KeyValueStore, ERROR_LOG_KEY, USER_KEY};
use super::transport::{HttpRequest, Transport};
use crate::models::{
    ErrorContext, ErrorReport, ErrorStats, Failure, FrontendLog, LogLevel, ObservabilityConfig,
    PlatformEvent, TransportError,
};

/// 内存队列上限
pub const MAX_QUEUE_SIZE: usize = 100;
/// 本地持久日志上限
pub const MAX_LOCAL_LOGS: usize = 1000;
/// 超过此耗时(毫秒)的操作记为慢操作
pub const SLOW_OPERATION_THRESHOLD_MS: f64 = 1000.0;

const DEFAULT_LOCATION: &str = "app://backoffice";
const GLOBAL_COMPONENT: &str = "Global";

/// 远端上报的请求体: `{"errors": [...]}`
#[derive(Serialize)]
struct ErrorBatch<'a> {
    errors: &'a [ErrorReport],
}

/// 日志器在构造时固化的设置
struct LoggerSettings {
    min_log_level: LogLevel,
    enable_console_logging: bool,
    enable_remote_reporting: bool,
    remote_endpoint: Option<String>,
    crash_reporting_key: Option<String>,
    user_agent: String,
    flush_interval: Duration,
}

/// 错误日志器
///
/// 克隆代价很低,所有克隆共享同一队列、存储与取消令牌,
/// 后台任务持有克隆。
#[derive(Clone)]
pub struct ErrorLogger {
    settings: Arc<LoggerSettings>,
    /// 进程生命周期内只生成一次
    session_id: Arc<str>,
    user_id: Arc<RwLock<Option<String>>>,
    location: Arc<RwLock<String>>,
    queue: Arc<Mutex<VecDeque<ErrorReport>>>,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    /// 串行化本地日志的 读-合并-写
    local_write: Arc<tokio::sync::Mutex<()>>,
    cancel: CancellationToken,
}

impl ErrorLogger {
    /// 创建日志器
    ///
    /// 不启动任何后台任务,调用 `start` 后才开始周期刷新与全局捕获。
    pub fn new(
        config: &ObservabilityConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let settings = LoggerSettings {
            min_log_level: config.min_log_level,
            enable_console_logging: config.enable_console_logging,
            enable_remote_reporting: config.enable_remote_reporting,
            remote_endpoint: config.remote_endpoint.clone(),
            crash_reporting_key: config.crash_reporting_key.clone(),
            user_agent: config.user_agent.clone(),
            flush_interval: config.flush_interval,
        };
        let session_id = format!("session_{}", uuid::Uuid::new_v4().simple());

        tracing::info!(
            session_id = %session_id,
            min_log_level = %settings.min_log_level,
            remote_reporting = settings.enable_remote_reporting,
            storage = storage.backend_name(),
            "错误日志器已创建"
        );

        Self {
            settings: Arc::new(settings),
            session_id: Arc::from(session_id),
            user_id: Arc::new(RwLock::new(None)),
            location: Arc::new(RwLock::new(DEFAULT_LOCATION.to_string())),
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_QUEUE_SIZE))),
            storage,
            transport,
            local_write: Arc::new(tokio::sync::Mutex::new(())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 设置归属用户,之后的报告自动带上 userId
    pub fn set_user_id(&self, user_id: Option<String>) {
        *self.user_id.write().unwrap_or_else(|e| e.into_inner()) = user_id;
    }

    /// 设置当前页面位置,之后的报告自动带上 url
    pub fn set_location(&self, url: impl Into<String>) {
        *self.location.write().unwrap_or_else(|e| e.into_inner()) = url.into();
    }

    // ==================== 日志入口 ====================

    /// 记录错误
    ///
    /// 开启远端上报时立即在后台触发一次刷新,不阻塞调用方。
    pub fn log_error(&self, error: impl Into<Failure>, context: Option<ErrorContext>) {
        if self.log(LogLevel::Error, error.into(), context).is_some()
            && self.settings.enable_remote_reporting
        {
            self.spawn_flush();
        }
    }

    /// 记录警告, 只随周期刷新上报
    pub fn log_warning(&self, message: impl Into<String>, context: Option<ErrorContext>) {
        self.log(LogLevel::Warning, Failure::new(message), context);
    }

    pub fn log_info(&self, message: impl Into<String>, context: Option<ErrorContext>) {
        self.log(LogLevel::Info, Failure::new(message), context);
    }

    /// 记录调试信息
    ///
    /// 只回显到控制台,不进入刷新队列,不上报远端。
    pub fn log_debug(&self, message: impl Into<String>, context: Option<ErrorContext>) {
        self.log(LogLevel::Debug, Failure::new(message), context);
    }

    /// 记录前端经IPC上报的日志
    ///
    /// 按级别分派, error 级别与 `log_error` 一样触发立即刷新; 前端堆栈原样保留。
    pub fn log_frontend(&self, log: FrontendLog) {
        let (level, failure, context) = log.into_parts();
        match level {
            LogLevel::Error => self.log_error(failure, context),
            level => {
                self.log(level, failure, context);
            }
        }
    }

    /// 构建报告并入队, 被级别过滤时返回 `None`
    fn log(
        &self,
        level: LogLevel,
        failure: Failure,
        context: Option<ErrorContext>,
    ) -> Option<ErrorReport> {
        if level < self.settings.min_log_level {
            return None;
        }

        let report = ErrorReport::new(failure, level, self.enrich(context.unwrap_or_default()));

        if self.settings.enable_console_logging {
            echo(&report);
        }

        if level != LogLevel::Debug {
            self.enqueue(report.clone());
        }

        Some(report)
    }

    /// 注入会话ID、客户端标识、当前位置、时间戳与用户ID
    fn enrich(&self, mut context: ErrorContext) -> ErrorContext {
        if context.session_id.is_none() {
            context.session_id = Some(self.session_id.to_string());
        }
        if context.user_agent.is_none() {
            context.user_agent = Some(self.settings.user_agent.clone());
        }
        if context.url.is_none() {
            context.url = Some(
                self.location
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone(),
            );
        }
        if context.timestamp.is_none() {
            context.timestamp = Some(Utc::now());
        }
        if context.user_id.is_none() {
            context.user_id = self
                .user_id
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
        }
        context
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<ErrorReport>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enqueue(&self, report: ErrorReport) {
        let mut queue = self.lock_queue();
        if queue.len() >= MAX_QUEUE_SIZE {
            queue.pop_front();
        }
        queue.push_back(report);
    }

    /// 未刷新报告的快照 (旧到新)
    pub fn pending_reports(&self) -> Vec<ErrorReport> {
        self.lock_queue().iter().cloned().collect()
    }

    // ==================== 耗时测量 ====================

    /// 测量异步操作耗时
    ///
    /// - 成功且超过1秒: 记录一条慢操作警告
    /// - 失败: 记录错误后原样返回失败,不吞掉调用方的错误
    pub async fn measure_performance<T, E, F>(
        &self,
        operation_name: &str,
        operation: F,
        context: Option<ErrorContext>,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let result = operation.await;
        let duration = started.elapsed().as_secs_f64() * 1000.0;

        let context = context
            .unwrap_or_default()
            .with_metadata("operation", operation_name)
            .with_metadata("duration", duration);

        match &result {
            Ok(_) if duration > SLOW_OPERATION_THRESHOLD_MS => {
                self.log_warning(
                    format!("Slow operation detected: {} took {:.0}ms", operation_name, duration),
                    Some(context),
                );
            }
            Ok(_) => {}
            Err(e) => {
                self.log_error(
                    format!("Operation failed: {}: {}", operation_name, e),
                    Some(context),
                );
            }
        }

        result
    }

    // ==================== 本地日志查询 ====================

    /// 本地持久日志统计
    ///
    /// 存储不可用或数据损坏时返回空统计,永不失败。
    pub async fn get_error_stats(&self) -> ErrorStats {
        match self.storage.get(ERROR_LOG_KEY).await {
            Ok(raw) => ErrorStats::from_raw_log(raw.as_deref()),
            Err(e) => {
                tracing::warn!(error = %e, "读取本地错误日志失败,返回空统计");
                ErrorStats::default()
            }
        }
    }

    /// 本地持久日志中时间戳不早于 `since` 的报告
    pub async fn recent_errors(&self, since: DateTime<Utc>) -> Vec<ErrorReport> {
        let raw = match self.storage.get(ERROR_LOG_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "读取本地错误日志失败");
                return Vec::new();
            }
        };

        serde_json::from_str::<Vec<Value>>(&raw)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<ErrorReport>(entry).ok())
            .filter(|report| report.timestamp().is_some_and(|ts| ts >= since))
            .collect()
    }

    /// 清空本地持久日志
    pub async fn clear_local_log(&self) {
        let _guard = self.local_write.lock().await;
        if let Err(e) = self.storage.remove(ERROR_LOG_KEY).await {
            tracing::warn!(error = %e, "清空本地错误日志失败");
        }
    }

    // ==================== 刷新 ====================

    /// 刷新队列
    ///
    /// 原子地换出当前队列,整批投递远端(若开启)并合并进本地日志。
    /// 远端失败时整批放回队首; 本地写入独立进行,不因远端失败回滚。
    pub async fn flush(&self) {
        let batch: Vec<ErrorReport> = self.lock_queue().drain(..).collect();
        if batch.is_empty() {
            return;
        }

        let remote_result = if self.settings.enable_remote_reporting {
            self.deliver_remote(&batch).await
        } else {
            Ok(())
        };

        self.persist_local(&batch).await;

        match remote_result {
            Ok(()) => {
                tracing::debug!(batch_size = batch.len(), "错误报告批次已刷新");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    batch_size = batch.len(),
                    "错误报告远端上报失败,批次已放回队首等待重试"
                );
                self.requeue_front(batch);
            }
        }
    }

    fn spawn_flush(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let logger = self.clone();
                handle.spawn(async move {
                    logger.flush().await;
                });
            }
            Err(_) => {
                tracing::debug!("当前没有异步运行时,错误报告将随下次刷新上报");
            }
        }
    }

    /// 投递到自定义端点与崩溃上报服务
    ///
    /// 每个目标都会尝试,任一失败即视为整批失败。
    async fn deliver_remote(&self, batch: &[ErrorReport]) -> Result<(), TransportError> {
        let body = serde_json::to_string(&ErrorBatch { errors: batch })
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let targets = [
            self.settings.remote_endpoint.as_deref(),
            self.settings.crash_reporting_key.as_deref(),
        ];

        let mut outcome = Ok(());
        for url in targets.into_iter().flatten() {
            let delivered = match self.transport.send(url, HttpRequest::post_json(body.clone())).await {
                Ok(response) if response.ok => Ok(()),
                Ok(response) => Err(TransportError::Rejected {
                    status: response.status,
                }),
                Err(e) => Err(e),
            };

            if let Err(e) = delivered {
                tracing::debug!(url = %url, error = %e, "上报目标失败");
                outcome = Err(e);
            }
        }
        outcome
    }

    fn requeue_front(&self, batch: Vec<ErrorReport>) {
        let mut queue = self.lock_queue();
        for report in batch.into_iter().rev() {
            queue.push_front(report);
        }

        let overflow = queue.len().saturating_sub(MAX_QUEUE_SIZE);
        if overflow > 0 {
            queue.drain(..overflow);
            tracing::warn!(dropped = overflow, "错误队列已满,丢弃最旧的报告");
        }
    }

    /// 合并写入本地持久日志
    ///
    /// 已存在的报告ID不重复写入; 超过上限时淘汰最旧条目。
    async fn persist_local(&self, batch: &[ErrorReport]) {
        let _guard = self.local_write.lock().await;

        let mut entries: Vec<Value> = match self.storage.get(ERROR_LOG_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "本地错误日志已损坏,将重新写入");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "读取本地错误日志失败,跳过本地写入");
                return;
            }
        };

        let known: HashSet<String> = entries
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_str).map(String::from))
            .collect();

        for report in batch.iter().filter(|report| !known.contains(&report.id)) {
            match serde_json::to_value(report) {
                Ok(value) => entries.push(value),
                Err(e) => tracing::warn!(error = %e, report_id = %report.id, "错误报告序列化失败"),
            }
        }

        let overflow = entries.len().saturating_sub(MAX_LOCAL_LOGS);
        entries.drain(..overflow);

        let raw = match serde_json::to_string(&entries) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "本地错误日志序列化失败");
                return;
            }
        };

        if let Err(e) = self.storage.set(ERROR_LOG_KEY, &raw).await {
            tracing::warn!(error = %e, "写入本地错误日志失败");
        }
    }

    // ==================== 生命周期 ====================

    /// 启动后台任务
    ///
    /// - 读取本地 `user` 记录作为默认归属用户
    /// - 周期刷新
    /// - 订阅平台事件,捕获全局错误
    pub async fn start(&self, events: &PlatformEvents) {
        self.load_user().await;
        self.spawn_periodic_flush();
        self.spawn_global_capture(events.subscribe());

        tracing::info!(
            session_id = %self.session_id,
            flush_interval_secs = self.settings.flush_interval.as_secs(),
            "错误日志器已启动"
        );
    }

    /// 停止后台任务并做最后一次刷新
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.flush().await;
        tracing::info!(session_id = %self.session_id, "错误日志器已关闭");
    }

    async fn load_user(&self) {
        let raw = match self.storage.get(USER_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "读取用户记录失败");
                return;
            }
        };

        let user_id = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|user| match user.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            });

        let mut current = self.user_id.write().unwrap_or_else(|e| e.into_inner());
        if current.is_none() {
            *current = user_id;
        }
    }

    fn spawn_periodic_flush(&self) {
        let logger = self.clone();
        let period = self.settings.flush_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = logger.cancel.cancelled() => break,
                    _ = ticker.tick() => logger.flush().await,
                }
            }
            tracing::debug!("周期刷新任务已退出");
        });
    }

    fn spawn_global_capture(&self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        let logger = self.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = logger.cancel.cancelled() => break,
                    event = next_event(&mut receiver, "error_logger") => event,
                };

                match event {
                    Some(event) => logger.handle_platform_event(event).await,
                    None => break,
                }
            }
            tracing::debug!("全局错误捕获已退订");
        });
    }

    /// 处理平台事件
    ///
    /// 全局错误转为 `component="Global"` 的错误报告, 卸载事件触发最后一次刷新。
    pub async fn handle_platform_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::UncaughtError {
                message,
                filename,
                line,
                column,
                stack,
            } => {
                let context = ErrorContext::new()
                    .component(GLOBAL_COMPONENT)
                    .action("uncaught_error")
                    .with_metadata("filename", filename)
                    .with_metadata("line", line)
                    .with_metadata("column", column);
                let failure = Failure {
                    message,
                    stack,
                };
                self.log_error(failure, Some(context));
            }
            PlatformEvent::UnhandledRejection { reason, promise } => {
                let context = ErrorContext::new()
                    .component(GLOBAL_COMPONENT)
                    .action("unhandled_rejection")
                    .with_metadata("promise", promise);
                self.log_error(format!("Unhandled promise rejection: {}", reason), Some(context));
            }
            PlatformEvent::ResourceLoadFailed { resource } => {
                let context = ErrorContext::new()
                    .component(GLOBAL_COMPONENT)
                    .action("resource_load_error")
                    .with_metadata("resource", resource.clone());
                self.log_error(format!("Failed to load resource: {}", resource), Some(context));
            }
            PlatformEvent::Unload => self.flush().await,
            PlatformEvent::Online | PlatformEvent::Offline | PlatformEvent::PerformanceEntry(_) => {}
        }
    }

    /// 安装panic钩子
    ///
    /// panic转为 `component="Global", action="panic"` 的错误报告,
    /// 之后继续调用原有钩子。进程级全局状态,只应在应用入口调用一次。
    pub fn capture_panics(&self) {
        let logger = self.clone();
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());

            let mut context = ErrorContext::new().component(GLOBAL_COMPONENT).action("panic");
            if let Some(location) = info.location() {
                context = context
                    .with_metadata("filename", location.file())
                    .with_metadata("line", location.line())
                    .with_metadata("column", location.column());
            }

            logger.log_error(message, Some(context));
            previous(info);
        }));
    }
}

/// 回显到tracing控制台
fn echo(report: &ErrorReport) {
    let component = report.context.component.as_deref().unwrap_or("-");
    let action = report.context.action.as_deref().unwrap_or("-");

    match report.level {
        LogLevel::Error => tracing::error!(
            fingerprint = %report.fingerprint,
            component,
            action,
            stack = ?report.stack,
            "{}",
            report.message
        ),
        LogLevel::Warning => tracing::warn!(
            fingerprint = %report.fingerprint,
            component,
            action,
            "{}",
            report.message
        ),
        LogLevel::Info => tracing::info!(component, action, "{}", report.message),
        LogLevel::Debug => tracing::debug!(component, action, "{}", report.message),
    }
}
