use std::path::Path;

use cgmfit_core::errors::{CgmError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("ion", "C+3")
        .with_context("reason", "example")
}

#[test]
fn schema_error_surface() {
    let err = CgmError::Schema(sample_info("grid-missing-column", "column absent"));
    assert_eq!(err.info().code, "grid-missing-column");
    assert!(err.info().context.contains_key("ion"));
}

#[test]
fn observation_error_surface() {
    let err = CgmError::Observation(sample_info("observation-sigma", "sigma must be positive"));
    assert_eq!(err.info().code, "observation-sigma");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn chain_error_surface() {
    let err = CgmError::Chain(sample_info("chain-discard", "discard exceeds steps"));
    assert_eq!(err.info().code, "chain-discard");
}

#[test]
fn io_error_records_path() {
    let err = CgmError::io("grid-read", Path::new("/tmp/grid.csv"), "not found");
    assert_eq!(err.info().context.get("path").unwrap(), "/tmp/grid.csv");
    assert!(matches!(err, CgmError::Io(_)));
}

#[test]
fn display_includes_context_and_hint() {
    let err = CgmError::Config(
        ErrorInfo::new("sampler-walkers", "too few walkers")
            .with_context("walkers", "2")
            .with_hint("use at least 4 walkers"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("config error: too few walkers (code: sampler-walkers)"));
    assert!(rendered.contains("walkers=2"));
    assert!(rendered.contains("hint: use at least 4 walkers"));
}

#[test]
fn errors_round_trip_json() {
    let err = CgmError::schema("grid-rows", "need two rows");
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"family\":\"Schema\""));
    let decoded: CgmError = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, err);
}
