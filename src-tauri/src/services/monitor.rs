//! 应用监控器
//!
//! 记录有界的性能指标与健康检查历史,周期执行健康探测,
//! 并把需要关注的状态通过错误日志器上报。

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error_logger::ErrorLogger;
use super::health_probes::{self, ProbeOutcome, NETWORK_SERVICE};
use super::heap_stats::HeapStatsSource;
use super::platform_events::{next_event, PlatformEvents};
use super::storage::KeyValueStore;
use super::transport::Transport;
use crate::models::{
    EntryType, ErrorContext, HealthCheck, HealthStatus, ObservabilityConfig, PerformanceEntry,
    PerformanceMetric, PlatformEvent, SystemMetrics,
};

pub const MAX_METRICS: usize = 1000;
pub const MAX_HEALTH_CHECKS: usize = 100;
pub const MAX_PERFORMANCE_ENTRIES: usize = 250;
/// 系统指标快照中返回的性能条目数
pub const SYSTEM_METRICS_ENTRY_LIMIT: usize = 50;
/// 计时类指标超过该值(毫秒)时告警
pub const SLOW_METRIC_THRESHOLD_MS: f64 = 2000.0;

const MONITOR_COMPONENT: &str = "ApplicationMonitor";

struct MonitorSettings {
    backend_base_url: Option<String>,
    backend_api_key: Option<String>,
    health_check_interval: Duration,
    initial_health_check_delay: Duration,
}

/// 应用监控器
///
/// 与 `ErrorLogger` 一样可廉价克隆,克隆共享全部历史。
#[derive(Clone)]
pub struct ApplicationMonitor {
    settings: Arc<MonitorSettings>,
    logger: ErrorLogger,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    heap_stats: Arc<dyn HeapStatsSource>,
    metrics: Arc<Mutex<VecDeque<PerformanceMetric>>>,
    health_checks: Arc<Mutex<VecDeque<HealthCheck>>>,
    entries: Arc<Mutex<VecDeque<PerformanceEntry>>>,
    online: Arc<AtomicBool>,
    cancel: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn push_bounded<T>(buffer: &Mutex<VecDeque<T>>, item: T, capacity: usize) {
    let mut buffer = lock(buffer);
    buffer.push_back(item);
    while buffer.len() > capacity {
        buffer.pop_front();
    }
}

impl ApplicationMonitor {
    pub fn new(
        config: &ObservabilityConfig,
        logger: ErrorLogger,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        heap_stats: Arc<dyn HeapStatsSource>,
    ) -> Self {
        let settings = MonitorSettings {
            backend_base_url: config.backend_base_url.clone(),
            backend_api_key: config.backend_api_key.clone(),
            health_check_interval: config.health_check_interval,
            initial_health_check_delay: config.initial_health_check_delay,
        };

        Self {
            settings: Arc::new(settings),
            logger,
            storage,
            transport,
            heap_stats,
            metrics: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_METRICS))),
            health_checks: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_HEALTH_CHECKS))),
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_PERFORMANCE_ENTRIES))),
            online: Arc::new(AtomicBool::new(true)),
            cancel: CancellationToken::new(),
        }
    }

    // ==================== 记录 ====================

    /// 记录性能指标
    ///
    /// 名称含 "time" 或 "duration" 且超过2秒时额外记一条警告。
    pub fn record_metric(&self, name: impl Into<String>, value: f64, tags: Option<HashMap<String, String>>) {
        let metric = PerformanceMetric::new(name, value, tags);
        let slow = metric.is_timing() && value > SLOW_METRIC_THRESHOLD_MS;
        let name = metric.name.clone();

        push_bounded(&self.metrics, metric, MAX_METRICS);

        if slow {
            let context = ErrorContext::new()
                .component(MONITOR_COMPONENT)
                .action("slow_metric")
                .with_metadata("metric", name.clone())
                .with_metadata("value", value);
            self.logger
                .log_warning(format!("Slow performance detected: {} took {}ms", name, value), Some(context));
        }
    }

    /// 记录健康检查结果
    ///
    /// 不健康记为错误,降级记为警告。
    pub fn record_health_check(
        &self,
        service: impl Into<String>,
        status: HealthStatus,
        response_time: Option<f64>,
        error: Option<String>,
    ) {
        let check = HealthCheck::new(service, status, response_time, error);
        let context = ErrorContext::new()
            .component(MONITOR_COMPONENT)
            .action("health_check")
            .with_metadata("service", check.service.clone())
            .with_metadata("responseTime", check.response_time)
            .with_metadata("error", check.error.clone());

        match status {
            HealthStatus::Unhealthy => self
                .logger
                .log_error(format!("Service {} is unhealthy", check.service), Some(context)),
            HealthStatus::Degraded => self
                .logger
                .log_warning(format!("Service {} is degraded", check.service), Some(context)),
            HealthStatus::Healthy => {}
        }

        push_bounded(&self.health_checks, check, MAX_HEALTH_CHECKS);
    }

    fn record_probe(&self, outcome: ProbeOutcome) {
        if let Some((name, value)) = outcome.metric {
            self.record_metric(name, value, None);
        }
        self.record_health_check(outcome.service, outcome.status, outcome.response_time, outcome.error);
    }

    fn record_entry(&self, entry: PerformanceEntry) {
        push_bounded(&self.entries, entry, MAX_PERFORMANCE_ENTRIES);
    }

    // ==================== 查询 ====================

    /// 按名称与起始时间过滤的指标, 保持记录顺序
    pub fn get_metrics(&self, name: Option<&str>, since: Option<DateTime<Utc>>) -> Vec<PerformanceMetric> {
        lock(&self.metrics)
            .iter()
            .filter(|m| name.map_or(true, |name| m.name == name))
            .filter(|m| since.map_or(true, |since| m.timestamp >= since))
            .cloned()
            .collect()
    }

    /// 每个服务最新的一次健康检查
    ///
    /// 时间戳相同时后记录者胜出。
    pub fn get_health_status(&self) -> HashMap<String, HealthCheck> {
        let mut latest: HashMap<String, HealthCheck> = HashMap::new();

        for check in lock(&self.health_checks).iter() {
            let newer = latest
                .get(&check.service)
                .map_or(true, |current| check.timestamp >= current.timestamp);
            if newer {
                latest.insert(check.service.clone(), check.clone());
            }
        }

        latest
    }

    pub fn get_system_metrics(&self) -> SystemMetrics {
        let (memory_usage, error_rate) = {
            let metrics = lock(&self.metrics);
            let latest = |name: &str| {
                metrics
                    .iter()
                    .rev()
                    .find(|m| m.name == name)
                    .map_or(0.0, |m| m.value)
            };
            (
                latest(health_probes::MEMORY_USAGE_METRIC),
                latest(health_probes::ERROR_RATE_METRIC),
            )
        };

        let performance_entries = {
            let entries = lock(&self.entries);
            let skip = entries.len().saturating_sub(SYSTEM_METRICS_ENTRY_LIMIT);
            entries.iter().skip(skip).cloned().collect()
        };

        let last_health_check = lock(&self.health_checks)
            .iter()
            .map(|check| check.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        SystemMetrics {
            memory_usage,
            performance_entries,
            is_online: self.is_online(),
            last_health_check,
            error_rate,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    // ==================== 计时 ====================

    /// 计时同步操作
    ///
    /// 成功记 `<name>_duration`, 失败或panic记 `<name>_duration_error`,
    /// 结果(包括panic)原样交还调用方。
    pub fn measure_operation<T, E, F>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let started_at = Utc::now();
        let started = Instant::now();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(operation));
        let duration = started.elapsed().as_secs_f64() * 1000.0;

        self.finish_measure(name, started_at, duration, matches!(outcome, Ok(Ok(_))));

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// 计时异步操作, 语义同 `measure_operation`
    pub async fn measure_operation_async<T, E, F>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started_at = Utc::now();
        let started = Instant::now();
        let outcome = AssertUnwindSafe(operation).catch_unwind().await;
        let duration = started.elapsed().as_secs_f64() * 1000.0;

        self.finish_measure(name, started_at, duration, matches!(outcome, Ok(Ok(_))));

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    fn finish_measure(&self, name: &str, started_at: DateTime<Utc>, duration: f64, succeeded: bool) {
        self.record_entry(PerformanceEntry::measure(name, started_at, duration));

        let metric = if succeeded {
            format!("{}_duration", name)
        } else {
            format!("{}_duration_error", name)
        };
        self.record_metric(metric, duration, None);
    }

    // ==================== 平台事件 ====================

    pub fn handle_platform_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::Online => {
                self.online.store(true, Ordering::SeqCst);
                self.record_health_check(NETWORK_SERVICE, HealthStatus::Healthy, None, None);
                self.logger.log_info(
                    "Network connection restored",
                    Some(ErrorContext::new().component(MONITOR_COMPONENT).action("network_online")),
                );
            }
            PlatformEvent::Offline => {
                self.online.store(false, Ordering::SeqCst);
                self.record_health_check(
                    NETWORK_SERVICE,
                    HealthStatus::Unhealthy,
                    None,
                    Some("Network offline".to_string()),
                );
                self.logger.log_warning(
                    "Network connection lost",
                    Some(ErrorContext::new().component(MONITOR_COMPONENT).action("network_offline")),
                );
            }
            PlatformEvent::PerformanceEntry(entry) => self.observe_entry(entry),
            _ => {}
        }
    }

    fn observe_entry(&self, entry: PerformanceEntry) {
        match entry.entry_type {
            EntryType::Navigation => self.record_metric("page_load_time", entry.duration, None),
            EntryType::Resource => {
                let tags = HashMap::from([("resource".to_string(), entry.name.clone())]);
                self.record_metric("resource_load_time", entry.duration, Some(tags));
            }
            EntryType::Measure => {}
        }
        self.record_entry(entry);
    }

    // ==================== 健康检查 ====================

    /// 并发执行一轮健康探测
    ///
    /// 单个探测panic只影响它自己,其余结果照常记录。
    pub async fn run_health_checks(&self) {
        let backend = async {
            match self.settings.backend_base_url.as_deref() {
                Some(base_url) => Some(
                    health_probes::probe_backend(
                        self.transport.as_ref(),
                        base_url,
                        self.settings.backend_api_key.as_deref(),
                    )
                    .await,
                ),
                None => None,
            }
        };
        let storage = async { Some(health_probes::probe_storage(self.storage.as_ref()).await) };
        let memory = async { health_probes::probe_memory(self.heap_stats.as_ref()) };
        let errors = async { Some(health_probes::probe_error_rate(&self.logger).await) };

        let (backend, storage, memory, errors) = futures::join!(
            isolate("backend", backend),
            isolate("storage", storage),
            isolate("memory", memory),
            isolate("errors", errors),
        );

        for outcome in [backend, storage, memory, errors].into_iter().flatten() {
            self.record_probe(outcome);
        }

        tracing::debug!(checks = lock(&self.health_checks).len(), "健康检查轮次完成");
    }

    // ==================== 生命周期 ====================

    /// 启动周期健康检查与平台事件订阅
    ///
    /// 首轮检查在短暂延迟后执行,之后按固定间隔执行。
    pub fn start(&self, events: &PlatformEvents) {
        self.spawn_health_loop();
        self.spawn_event_listener(events.subscribe());

        tracing::info!(
            interval_secs = self.settings.health_check_interval.as_secs(),
            backend = self.settings.backend_base_url.is_some(),
            "应用监控器已启动"
        );
    }

    /// 停止周期检查并退订平台事件, 可重复调用
    pub fn destroy(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        tracing::info!("应用监控器已停止");
    }

    fn spawn_health_loop(&self) {
        let monitor = self.clone();
        let delay = self.settings.initial_health_check_delay;
        let period = self.settings.health_check_interval;

        tokio::spawn(async move {
            tokio::select! {
                _ = monitor.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            monitor.run_health_checks().await;

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = monitor.cancel.cancelled() => break,
                    _ = ticker.tick() => monitor.run_health_checks().await,
                }
            }
            tracing::debug!("健康检查任务已退出");
        });
    }

    fn spawn_event_listener(&self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        let monitor = self.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = monitor.cancel.cancelled() => break,
                    event = next_event(&mut receiver, "monitor") => event,
                };

                match event {
                    Some(event) => monitor.handle_platform_event(event),
                    None => break,
                }
            }
            tracing::debug!("监控器已退订平台事件");
        });
    }
}

async fn isolate<F>(probe: &'static str, future: F) -> Option<ProbeOutcome>
where
    F: Future<Output = Option<ProbeOutcome>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!(probe, "健康探测异常终止");
            None
        }
    }
}
