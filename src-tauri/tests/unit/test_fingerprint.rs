use backoffice_observability::models::{fingerprint, ErrorContext, ErrorReport, Failure, LogLevel};

// ============================================================================
// fingerprint 测试
// ============================================================================

#[test]
fn test_fingerprint_相同三元组得到相同指纹() {
    let a = fingerprint("Payment failed", Some("Checkout"), Some("submit"));
    let b = fingerprint("Payment failed", Some("Checkout"), Some("submit"));

    assert_eq!(a, b);
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_fingerprint_任一字段不同则指纹不同() {
    let base = fingerprint("Payment failed", Some("Checkout"), Some("submit"));

    assert_ne!(base, fingerprint("Payment failed!", Some("Checkout"), Some("submit")));
    assert_ne!(base, fingerprint("Payment failed", Some("Cart"), Some("submit")));
    assert_ne!(base, fingerprint("Payment failed", Some("Checkout"), None));
}

#[test]
fn test_fingerprint_字段边界不会混淆() {
    // "ab" + "c" 与 "a" + "bc" 不能得到相同指纹
    assert_ne!(
        fingerprint("ab", Some("c"), None),
        fingerprint("a", Some("bc"), None)
    );
}

// ============================================================================
// ErrorReport 指纹与时间戳无关
// ============================================================================

#[test]
fn test_report_fingerprint_不受时间戳影响() {
    let context = || ErrorContext::new().component("Warehouse").action("scan");

    let first = ErrorReport::new(Failure::new("Serial not found"), LogLevel::Error, context());
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = ErrorReport::new(Failure::new("Serial not found"), LogLevel::Warning, context());

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_ne!(first.id, second.id);
}

#[test]
fn test_report_id_格式() {
    let report = ErrorReport::new(Failure::new("x"), LogLevel::Info, ErrorContext::new());
    let (millis, suffix) = report.id.split_once('-').unwrap();

    assert!(millis.parse::<i64>().is_ok());
    assert_eq!(suffix.len(), 9);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
}
