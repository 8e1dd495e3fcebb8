use zonal_affine::SymbolKind;
use zonal_core::{Settings, SourceLocation};
use zonal_flow::{DiagnosisLog, Session};
use zonal_value::Zonotope;

fn tracked_session() -> Session {
    Session::new(Settings::default().track_error_origin(true)).expect("session")
}

#[test]
fn persisted_midpoint_reads_back() {
    let mut session = tracked_session();
    let input = SourceLocation::new("poly.c", 3);
    let product = SourceLocation::new("poly.c", 4);
    session.locate(&input);
    let x = Zonotope::from_range(0.1, 0.2, &mut session).unwrap();
    session.locate(&product);
    let y = x.mul(&x, &mut session).unwrap();

    y.persist("y", &mut session);
    y.persist("y", &mut session);
    let midpoint = y.implementation_range().unwrap().midpoint();
    assert_eq!(session.diagnosis().read_scalar("y"), Some(midpoint));
    assert_eq!(session.diagnosis().len(), 2);

    let record = session.diagnosis().last("y").unwrap();
    assert_eq!(record.concrete, y.implementation());
    assert!(!record.light);
    let first = &record.origins[0];
    assert_eq!(first.kind, SymbolKind::Rounding);
    assert_eq!(first.location.as_ref(), Some(&product));
    assert!(record
        .origins
        .windows(2)
        .all(|pair| pair[0].magnitude >= pair[1].magnitude));
}

#[test]
fn light_persist_skips_origins() {
    let mut session = tracked_session();
    session.locate(&SourceLocation::new("sum.c", 1));
    let a = Zonotope::constant(0.1, &session);
    let b = a.add(&a, &mut session).unwrap().add_constant(0.7, &mut session).unwrap();
    b.light_persist("b", &mut session);
    let record = session.diagnosis().last("b").unwrap();
    assert!(record.light);
    assert!(record.origins.is_empty());
    assert!(record.error.unwrap().magnitude() < 1e-15);
    assert!(record.implementation.unwrap().contains(b.implementation()));
}

#[test]
fn diagnosis_log_round_trips() {
    let mut session = tracked_session();
    let x = Zonotope::from_range_with_error(1.0, 2.0, -1e-3, 1e-3, &mut session).unwrap();
    let y = x.sqrt(&mut session).unwrap();
    x.persist("x", &mut session);
    y.persist("y", &mut session);
    let log = session.diagnosis().clone();

    let json = log.to_json().unwrap();
    assert_eq!(DiagnosisLog::from_json(&json).unwrap(), log);
    let bytes = log.to_bytes().unwrap();
    assert_eq!(DiagnosisLog::from_bytes(&bytes).unwrap(), log);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["records"].as_array().map(Vec::len), Some(2));
}

#[test]
fn untracked_origins_are_not_recorded() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::constant(0.1, &session);
    let y = x.mul(&x, &mut session).unwrap();
    y.persist("y", &mut session);
    assert!(session.diagnosis().last("y").unwrap().origins.is_empty());
}
