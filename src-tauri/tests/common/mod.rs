//! 测试公共模块
//!
//! 提供存储/传输/内存统计的替身, 避免外部依赖。

#![allow(dead_code)]

use async_trait::async_trait;
use backoffice_observability::models::{
    Environment, LogLevel, ObservabilityConfig, StorageError, TransportError,
};
use backoffice_observability::services::{
    HeapStats, HeapStatsSource, HttpMethod, HttpRequest, HttpResponse, KeyValueStore, Transport,
};
use backoffice_observability::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

pub const LOG_ENDPOINT: &str = "https://logs.example/ingest";
pub const BACKEND_URL: &str = "https://db.example";

/// 记录所有请求的传输替身
///
/// - `fail`: 请求直接失败 (网络错误)
/// - `status`: 请求成功时返回的状态码
pub struct RecordingTransport {
    requests: Mutex<Vec<(String, HttpRequest)>>,
    fail: AtomicBool,
    status: AtomicU16,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            status: AtomicU16::new(200),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(String, HttpRequest)> {
        self.requests.lock().unwrap().clone()
    }

    /// 所有POST请求体中的报告消息, 按发送顺序分批
    pub fn posted_batches(&self) -> Vec<Vec<String>> {
        self.requests()
            .into_iter()
            .filter(|(_, request)| request.method == HttpMethod::Post)
            .filter_map(|(_, request)| request.body)
            .map(|body| {
                let body: Value = serde_json::from_str(&body).unwrap();
                body["errors"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|report| report["message"].as_str().unwrap().to_string())
                    .collect()
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push((url.to_string(), request));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::NetworkFailed("connection reset".to_string()));
        }
        Ok(HttpResponse::from_status(self.status.load(Ordering::SeqCst)))
    }
}

/// 可切换为失败模式的内存存储
pub struct FailingStore {
    data: Mutex<HashMap<String, String>>,
    fail: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.data.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// 固定内存用量
pub struct FixedHeapStats(pub Option<HeapStats>);

impl FixedHeapStats {
    pub fn percent(used: u64) -> Self {
        Self(Some(HeapStats { used, total: 100 }))
    }
}

impl HeapStatsSource for FixedHeapStats {
    fn heap_stats(&self) -> Option<HeapStats> {
        self.0
    }
}

/// 开发模式 + 远端上报 + 后端探测
pub fn remote_config() -> ObservabilityConfig {
    ObservabilityConfig::for_environment(Environment::Development)
        .with_min_log_level(LogLevel::Debug)
        .with_remote_reporting(Some(LOG_ENDPOINT.to_string()), None)
        .with_backend(BACKEND_URL.to_string(), Some("anon".to_string()))
}

/// 测试用组装结果
pub struct Harness {
    pub state: AppState,
    pub storage: Arc<FailingStore>,
    pub transport: Arc<RecordingTransport>,
}

pub fn harness(config: &ObservabilityConfig, heap: FixedHeapStats) -> Harness {
    let storage = Arc::new(FailingStore::new());
    let transport = Arc::new(RecordingTransport::new());
    let state = AppState::with_backends(config, storage.clone(), transport.clone(), Arc::new(heap));

    Harness {
        state,
        storage,
        transport,
    }
}
