use zonal_core::{here, Interval, Settings, SourceLocation};
use zonal_flow::Session;
use zonal_value::{RoundingMode, Zonotope};

#[test]
fn decided_conversion_keeps_the_value() {
    let mut session = Session::new(Settings::default()).expect("session");
    let mut x = Zonotope::from_range(0.2, 0.4, &mut session).unwrap();
    let k = x
        .to_i32(RoundingMode::Nearest, &mut session, &here!())
        .unwrap();
    assert_eq!(k, 0);
    assert_eq!(x.real_range(), Some(Interval::new(0.2, 0.4)));
    assert_eq!(session.path().stats().split_calls, 0);
}

#[test]
fn negative_values_saturate_unsigned_targets() {
    let mut session = Session::new(Settings::default()).expect("session");
    let mut x = Zonotope::from_range(-5.0, -3.0, &mut session).unwrap();
    assert_eq!(x.to_u32(RoundingMode::Zero, &mut session, &here!()).unwrap(), 0);
    assert_eq!(x.to_u64(RoundingMode::Highest, &mut session, &here!()).unwrap(), 0);
    assert_eq!(x.real_range(), Some(Interval::new(-5.0, -3.0)));
}

#[test]
fn unstable_conversion_refines_each_outcome() {
    let mut session = Session::new(Settings::default()).expect("session");
    let mut vars = [Zonotope::from_range(0.9, 1.2, &mut session).unwrap()];
    let mut seen = Vec::new();
    let report = session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let location = SourceLocation::new("cast.c", 14);
            let k = vars[0].to_i64(RoundingMode::Zero, session, &location)?;
            if session.mode().tracks_real() {
                seen.push((k, vars[0].real_range().expect("real")));
            }
            Ok(())
        })
        .expect("region");

    assert_eq!(report.passes, 6);
    assert!(seen.iter().any(|(k, _)| *k == 0));
    assert!(seen.iter().any(|(k, _)| *k == 1));
    for (k, range) in &seen {
        match k {
            0 => assert!(range.hi <= 1.0, "{range:?}"),
            1 => assert!(range.lo >= 1.0, "{range:?}"),
            other => panic!("unexpected outcome {other}"),
        }
    }
    let merged = vars[0].real_range().unwrap();
    assert!(merged.lo <= 0.9 + 1e-12 && merged.hi >= 1.2 - 1e-12);
}

#[test]
fn rounding_functions_produce_integral_hulls() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(1.2, 3.7, &mut session).unwrap();
    assert_eq!(x.floor(&mut session).unwrap().real_range(), Some(Interval::new(1.0, 3.0)));
    assert_eq!(x.ceil(&mut session).unwrap().real_range(), Some(Interval::new(2.0, 4.0)));
    let rounded = x.round(&mut session).unwrap();
    assert_eq!(rounded.implementation(), 2.0);
    assert_eq!(rounded.real_range(), Some(Interval::new(1.0, 4.0)));
}
