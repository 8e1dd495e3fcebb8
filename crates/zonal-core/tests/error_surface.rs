use zonal_core::errors::{ErrorInfo, ZonalError};
use zonal_core::{here, Settings, SourceLocation};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("site", "loop.c:12")
        .with_context("reason", "example")
}

#[test]
fn infeasible_is_branch_local() {
    let err = ZonalError::Infeasible(sample_info("I001", "domains disagree"));
    assert_eq!(err.info().code, "I001");
    assert!(err.is_branch_local());
}

#[test]
fn empty_branch_is_branch_local() {
    let err = ZonalError::EmptyBranch(sample_info("E001", "no feasible pass"));
    assert!(err.is_branch_local());
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn desync_propagates() {
    let err = ZonalError::Desync(sample_info("D001", "trace exhausted"));
    assert!(!err.is_branch_local());
    assert!(err.to_string().contains("trace exhausted"));
}

#[test]
fn invariant_helper_records_operation() {
    let err = zonal_core::invariant_error("bad-state", "no explorer", "split_branches");
    assert_eq!(
        err.info().context.get("operation").map(String::as_str),
        Some("split_branches")
    );
    assert!(!err.is_branch_local());
}

#[test]
fn location_macro_points_at_caller() {
    let location: SourceLocation = here!();
    assert!(location.file.ends_with("error_surface.rs"));
    let err = zonal_core::infeasible_error("div-zero", "divisor straddles zero", &location);
    assert_eq!(
        err.info().context.get("location"),
        Some(&location.to_string())
    );
}

#[test]
fn error_round_trips_through_json() {
    let err = ZonalError::Config(sample_info("C001", "bad limit").with_hint("use a positive limit"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Config\""));
    let decoded: ZonalError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn settings_round_trip_yaml() {
    let settings = Settings::default()
        .support_backtrace(true)
        .support_threshold(1e-6)
        .limit_noise_symbols_number(32);
    let yaml = settings.to_yaml_string().expect("serialize");
    let decoded = Settings::from_yaml_str(&yaml).expect("deserialize");
    assert_eq!(decoded, settings);
}

#[test]
fn settings_reject_zero_path_limit() {
    let err = Settings::default().path_limit(0).validate().expect_err("zero limit");
    assert_eq!(err.info().code, "path-limit-zero");
}

#[test]
fn display_leads_with_code_and_location() {
    let location = SourceLocation::new("kernel.c", 40);
    let err = zonal_core::invariant_error("operand-mode", "operand does not track the real domain", "mul")
        .with_context("location", &location)
        .with_context("mode", "OnlyImplementation");
    assert!(matches!(err, ZonalError::Invariant(_)));
    assert_eq!(
        err.info().to_string(),
        format!(
            "[operand-mode] operand does not track the real domain at {location} \
             (mode=OnlyImplementation, operation=mul)"
        )
    );
}
