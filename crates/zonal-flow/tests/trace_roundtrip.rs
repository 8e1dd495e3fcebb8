use zonal_core::{SourceLocation, ZonalError};
use zonal_flow::{DiagnosisLog, DiagnosisRecord, SyncTrace};

fn sample_trace() -> SyncTrace {
    let mut trace = SyncTrace::new();
    trace.record(SourceLocation::new("filter.c", 12), 1);
    trace.record(SourceLocation::new("filter.c", 30), -4);
    trace
}

#[test]
fn trace_round_trips_json_and_bytes() {
    let trace = sample_trace();
    let json = trace.to_json().expect("json");
    let from_json = SyncTrace::from_json(&json).expect("decode json");
    assert_eq!(from_json, trace);

    let bytes = trace.to_bytes().expect("bytes");
    let from_bytes = SyncTrace::from_bytes(&bytes).expect("decode bytes");
    assert_eq!(from_bytes.canonical_hash(), trace.canonical_hash());
}

#[test]
fn hash_depends_on_outcomes() {
    let trace = sample_trace();
    let mut other = SyncTrace::new();
    other.record(SourceLocation::new("filter.c", 12), 0);
    other.record(SourceLocation::new("filter.c", 30), -4);
    assert_ne!(trace.canonical_hash(), other.canonical_hash());
    assert_eq!(trace.canonical_hash(), sample_trace().canonical_hash());
}

#[test]
fn following_checks_locations() {
    let mut trace = sample_trace();
    assert_eq!(trace.follow(&SourceLocation::new("filter.c", 12)).expect("first"), 1);
    let err = trace
        .follow(&SourceLocation::new("filter.c", 31))
        .expect_err("wrong location");
    match err {
        ZonalError::Desync(info) => assert_eq!(info.code, "trace-location"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(trace.follow(&SourceLocation::new("filter.c", 30)).expect("second"), -4);
    let err = trace
        .follow(&SourceLocation::new("filter.c", 30))
        .expect_err("exhausted");
    assert_eq!(err.info().code, "trace-exhausted");
}

#[test]
fn unsupported_schema_is_rejected() {
    let mut trace = sample_trace();
    trace.schema_version.major = 9;
    let json = trace.to_json().expect("json");
    let err = SyncTrace::from_json(&json).expect_err("schema");
    assert_eq!(err.info().code, "trace-schema");
}

#[test]
fn diagnosis_log_round_trips() {
    let mut log = DiagnosisLog::default();
    log.push(DiagnosisRecord {
        prefix: "x".into(),
        mode: zonal_core::DomainMode::RealAndImplementation,
        real: Some(zonal_core::Interval::new(0.0, 1.0)),
        implementation: Some(zonal_core::Interval::new(0.0, 1.0)),
        error: Some(zonal_core::Interval::new(-1e-16, 1e-16)),
        scalar: 0.5,
        concrete: 0.25,
        origins: Vec::new(),
        light: true,
    });
    let json = log.to_json().expect("json");
    assert_eq!(DiagnosisLog::from_json(&json).expect("decode"), log);
    let bytes = log.to_bytes().expect("bytes");
    assert_eq!(DiagnosisLog::from_bytes(&bytes).expect("decode"), log);
    assert_eq!(log.read_scalar("x"), Some(0.5));
    assert_eq!(log.read_scalar("y"), None);
}
