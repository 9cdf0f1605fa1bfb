use backoffice_observability::models::{HealthStatus, TransportError};
use backoffice_observability::services::health_probes::{
    classify_backend_response, classify_error_rate, classify_memory,
};
use backoffice_observability::services::HttpResponse;

// ============================================================================
// 内存压力
// ============================================================================

#[test]
fn test_memory_超过90为不健康() {
    assert_eq!(classify_memory(95.0), HealthStatus::Unhealthy);
    assert_eq!(classify_memory(90.1), HealthStatus::Unhealthy);
}

#[test]
fn test_memory_75到90之间为降级() {
    assert_eq!(classify_memory(80.0), HealthStatus::Degraded);
    assert_eq!(classify_memory(90.0), HealthStatus::Degraded);
}

#[test]
fn test_memory_75及以下为健康() {
    assert_eq!(classify_memory(50.0), HealthStatus::Healthy);
    assert_eq!(classify_memory(75.0), HealthStatus::Healthy);
}

// ============================================================================
// 近5分钟错误量
// ============================================================================

#[test]
fn test_error_rate_分级() {
    assert_eq!(classify_error_rate(11), HealthStatus::Unhealthy);
    assert_eq!(classify_error_rate(6), HealthStatus::Degraded);
    assert_eq!(classify_error_rate(2), HealthStatus::Healthy);
    assert_eq!(classify_error_rate(0), HealthStatus::Healthy);
}

// ============================================================================
// 后端可达性
// ============================================================================

#[test]
fn test_backend_响应分级() {
    assert_eq!(
        classify_backend_response(&Ok(HttpResponse::from_status(204))),
        HealthStatus::Healthy
    );
    assert_eq!(
        classify_backend_response(&Ok(HttpResponse::from_status(401))),
        HealthStatus::Degraded
    );
    assert_eq!(
        classify_backend_response(&Err(TransportError::Timeout("10s".to_string()))),
        HealthStatus::Unhealthy
    );
}
