//! 契约测试: 远端错误批次请求体
//!
//! 远端收集端依赖的JSON形状: `{"errors": [ErrorReport...]}`, 字段camelCase。

use async_trait::async_trait;
use backoffice_observability::models::{
    Environment, ErrorContext, LogLevel, ObservabilityConfig, TransportError,
};
use backoffice_observability::services::{
    ErrorLogger, HttpRequest, HttpResponse, MemoryStore, Transport,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const ENDPOINT: &str = "https://logs.example/ingest";
const CRASH_DSN: &str = "https://public@crash.example/42";

/// 捕获请求体的传输
#[derive(Default)]
struct CapturingTransport {
    sent: Mutex<Vec<(String, HttpRequest)>>,
}

#[async_trait]
impl Transport for CapturingTransport {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push((url.to_string(), request));
        Ok(HttpResponse::from_status(200))
    }
}

fn logger(transport: Arc<CapturingTransport>, crash_dsn: Option<&str>) -> ErrorLogger {
    let config = ObservabilityConfig::for_environment(Environment::Production)
        .with_min_log_level(LogLevel::Info)
        .with_remote_reporting(Some(ENDPOINT.to_string()), crash_dsn.map(String::from));
    ErrorLogger::new(&config, Arc::new(MemoryStore::new()), transport)
}

fn body_of(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn test_batch_body_shape() {
    let transport = Arc::new(CapturingTransport::default());
    let logger = logger(transport.clone(), None);
    logger.set_user_id(Some("emp-7".to_string()));
    logger.set_location("app://backoffice/payroll");

    logger.log_warning(
        "Payroll export took too long",
        Some(
            ErrorContext::new()
                .component("Payroll")
                .action("export")
                .with_metadata("rows", 1200),
        ),
    );
    logger.flush().await;

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let body = body_of(&sent[0].1);

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);

    let report = &errors[0];
    assert!(report["id"].is_string());
    assert_eq!(report["message"], "Payroll export took too long");
    assert_eq!(report["level"], "warning");
    assert_eq!(report["fingerprint"].as_str().unwrap().len(), 16);
    assert!(report.get("stack").is_none());

    let context = &report["context"];
    assert_eq!(context["userId"], "emp-7");
    assert!(context["sessionId"].as_str().unwrap().starts_with("session_"));
    assert!(context["userAgent"].is_string());
    assert_eq!(context["url"], "app://backoffice/payroll");
    assert!(context["timestamp"].is_string());
    assert_eq!(context["component"], "Payroll");
    assert_eq!(context["action"], "export");
    assert_eq!(context["metadata"]["rows"], 1200);
}

#[tokio::test]
async fn test_batch_preserves_queue_order() {
    let transport = Arc::new(CapturingTransport::default());
    let logger = logger(transport.clone(), None);

    logger.log_info("one", None);
    logger.log_warning("two", None);
    logger.log_info("three", None);
    logger.flush().await;

    let sent = transport.sent.lock().unwrap();
    let body = body_of(&sent[0].1);
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|report| report["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_crash_reporting_receives_same_body() {
    let transport = Arc::new(CapturingTransport::default());
    let logger = logger(transport.clone(), Some(CRASH_DSN));

    logger.log_info("integration check", None);
    logger.flush().await;

    let sent = transport.sent.lock().unwrap();
    let urls: Vec<&str> = sent.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(urls, vec![ENDPOINT, CRASH_DSN]);
    assert_eq!(sent[0].1.body, sent[1].1.body);
}
