use nest_core::errors::{ErrorInfo, NestError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("round_id", 3)
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = NestError::Config(sample_info("C001", "blocklist exhausted"));
    assert_eq!(err.info().code, "C001");
    assert!(err.info().context.contains_key("round_id"));
    assert!(err.is_config());
}

#[test]
fn integrity_error_surface() {
    let err = NestError::Integrity(sample_info("I001", "duplicate vote"));
    assert_eq!(err.info().code, "I001");
    assert!(err.is_integrity());
    assert!(!err.is_config());
}

#[test]
fn storage_error_surface() {
    let err = NestError::Storage(sample_info("ST001", "locked"));
    assert_eq!(err.info().context["reason"], "example");
}

#[test]
fn display_includes_context_and_hint() {
    let err = NestError::Serde(sample_info("S001", "bad yaml").with_hint("check indentation"));
    let text = err.to_string();
    assert!(text.starts_with("serde error: bad yaml (code: S001)"));
    assert!(text.contains("round_id=3"));
    assert!(text.ends_with("hint: check indentation"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = NestError::config("C002", "unknown group");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Config");
    assert_eq!(json["detail"]["code"], "C002");
    let back: NestError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}
