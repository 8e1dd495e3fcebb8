use std::f64::consts::{FRAC_PI_4, PI};

use zonal_core::{Interval, Settings, ZonalError};
use zonal_flow::Session;
use zonal_value::{Elementary, Zonotope};

fn session() -> Session {
    Session::new(Settings::default()).expect("session")
}

#[test]
fn square_root_of_a_positive_range() {
    let mut session = session();
    let x = Zonotope::from_range(4.0, 9.0, &mut session).unwrap();
    let y = x.sqrt(&mut session).unwrap();
    let range = y.real_range().unwrap();
    assert!(range.encloses(&Interval::new(2.0, 3.0)));
    assert!(range.lo > 1.9 && range.hi < 3.1);
    assert_eq!(y.implementation(), 6.5f64.sqrt());
    assert!(y.implementation_range().unwrap().contains(y.implementation()));
}

#[test]
fn logarithm_undoes_the_exponential() {
    let mut session = session();
    let x = Zonotope::from_range(1.0, 2.0, &mut session).unwrap();
    let y = x.exp(&mut session).unwrap().ln(&mut session).unwrap();
    let range = y.real_range().unwrap();
    assert!(range.encloses(&Interval::new(1.0, 2.0)));
    assert!(range.width() < 1.5);
}

#[test]
fn sine_over_half_a_turn() {
    let mut session = session();
    let x = Zonotope::from_range(0.0, PI, &mut session).unwrap();
    let y = x.sin(&mut session).unwrap();
    let range = y.real_range().unwrap();
    assert!(range.contains(1.0) && range.contains(0.5));
    assert!(range.lo >= -1e-9 && range.hi <= 1.0 + 1e-9);
}

#[test]
fn partial_domain_overlap_is_clamped() {
    let mut session = session();
    let x = Zonotope::from_range(-1.0, 2.0, &mut session).unwrap();
    let y = x.ln(&mut session).unwrap();
    let range = y.real_range().unwrap();
    assert!(range.contains(2.0f64.ln()));
    assert!(range.hi < 2.0f64.ln() + 1e-9);
}

#[test]
fn argument_outside_the_domain_is_infeasible() {
    let mut session = session();
    let x = Zonotope::from_range(-2.0, -1.0, &mut session).unwrap();
    let err = x.ln(&mut session).expect_err("negative logarithm");
    assert!(matches!(err, ZonalError::Infeasible(_)));
    assert_eq!(err.info().code, "outside-domain");
}

#[test]
fn tangent_across_a_pole_is_unbounded() {
    let mut session = session();
    let x = Zonotope::from_range(1.0, 2.0, &mut session).unwrap();
    let y = x.tan(&mut session).expect("unbounded tangent");
    assert!(Elementary::Tan.has_pole(&Interval::new(1.0, 2.0)));
    assert_eq!(y.real_range(), Some(Interval::ENTIRE));
    assert_eq!(y.implementation(), 1.5f64.tan());
    assert!(y.implementation_range().unwrap().contains(y.implementation()));
}

#[test]
fn integral_powers_square_through_zero() {
    let mut session = session();
    let x = Zonotope::from_range(-1.0, 2.0, &mut session).unwrap();
    let y = x.powi(2, &mut session).unwrap();
    assert_eq!(y.implementation(), 0.25);
    let range = y.real_range().unwrap();
    assert!(range.contains(0.0) && range.contains(4.0));
}

#[test]
fn power_with_an_integral_exponent_matches_powi() {
    let mut session = session();
    let x = Zonotope::from_range(1.0, 2.0, &mut session).unwrap();
    let three = Zonotope::constant(3.0, &session);
    let y = x.pow(&three, &mut session).unwrap();
    let range = y.real_range().unwrap();
    assert!(range.contains(1.0) && range.contains(8.0));
    assert_eq!(y.implementation(), 1.5f64.powf(3.0));
}

#[test]
fn arc_tangent_of_the_diagonal() {
    let mut session = session();
    let y = Zonotope::constant(1.0, &session);
    let x = Zonotope::constant(1.0, &session);
    let angle = y.atan2(&x, &mut session).unwrap();
    assert_eq!(angle.implementation(), 1.0f64.atan2(1.0));
    assert!(angle.real_range().unwrap().contains(FRAC_PI_4));
    assert!(angle.real_range().unwrap().width() < 1e-9);
}

#[test]
fn elementary_enclosures_hold_sampled_values() {
    let range = Interval::new(-0.75, 0.5);
    for f in [Elementary::Exp, Elementary::Sin, Elementary::Cos, Elementary::Atan, Elementary::Tanh] {
        let enclosure = f.enclose(&range);
        for k in 0..=20 {
            let x = range.lo + range.width() * f64::from(k) / 20.0;
            assert!(enclosure.contains(f.eval(x)), "{} at {x}", f.name());
        }
    }
}
