use zonal_core::{here, DomainMode, Interval, Settings, SourceLocation};
use zonal_flow::{Session, Tristate};
use zonal_value::Zonotope;

fn near(range: Interval, lo: f64, hi: f64) -> bool {
    (range.lo - lo).abs() <= 1e-9 && (range.hi - hi).abs() <= 1e-9
}

#[test]
fn unstable_branch_merges_both_continuations() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(-1.0, 1.0, &mut session).expect("input");
    let mut vars = [Zonotope::constant(0.0, &session)];
    let mut verdicts = Vec::new();
    let report = session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let zero = Zonotope::constant(0.0, session);
            let negative = x.lt(&zero, session)?;
            verdicts.push(negative.verdict());
            let step = if session.branch(&negative, &SourceLocation::new("sign.c", 3))? {
                -1.0
            } else {
                1.0
            };
            vars[0] = vars[0].add_constant(step, session)?;
            Ok(())
        })
        .expect("region");

    assert_eq!(report.passes, 6);
    assert!(report.complete);
    assert_eq!(verdicts[0], Tristate::Top);
    assert_eq!(session.path().stats().split_calls, 6);

    let merged = &vars[0];
    assert_eq!(merged.mode(), DomainMode::RealAndImplementation);
    let real = merged.real_range().expect("real");
    let implementation = merged.implementation_range().expect("implementation");
    assert!(real.contains(-1.0) && real.contains(1.0));
    assert!(implementation.contains(-1.0) && implementation.contains(1.0));
    assert!(implementation.contains(merged.implementation()));
}

#[test]
fn unstable_loop_iterations_stay_tight() {
    let mut session = Session::new(Settings::default()).expect("session");
    let mut vars = [Zonotope::constant(1.0, &session)];
    let origin = here!();
    for _ in 0..3 {
        let report = session
            .continuous_flow(&origin, &mut vars, |session, vars| {
                let coin = Zonotope::from_range(-1.0, 1.0, session)?;
                let zero = Zonotope::constant(0.0, session);
                let tails = coin.lt(&zero, session)?;
                if session.branch(&tails, &SourceLocation::new("coin.c", 7))? {
                    vars[0] = vars[0].add_constant(0.5, session)?;
                }
                Ok(())
            })
            .expect("iteration");
        assert_eq!(report.passes, 6);
    }
    let real = vars[0].real_range().expect("real");
    assert!(near(real, 1.0, 2.5), "real range {real:?}");
    let implementation = vars[0].implementation_range().expect("implementation");
    assert!(implementation.encloses(&Interval::new(1.0, 2.5)));
}

#[test]
fn merging_never_narrows_a_contribution() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(0.0, 4.0, &mut session).expect("input");
    let mut vars = [x.clone()];
    let mut contributions = Vec::new();
    session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let two = Zonotope::constant(2.0, session);
            let high = vars[0].gt(&two, session)?;
            vars[0] = if session.branch(&high, &SourceLocation::new("clip.c", 11))? {
                vars[0].scale(0.5, session)?
            } else {
                vars[0].mul(&vars[0], session)?
            };
            if session.mode() == DomainMode::RealAndImplementation {
                let mut tightened = vars[0].clone();
                assert!(tightened.optimize_value());
                contributions.push(tightened.real_range().expect("real"));
            }
            Ok(())
        })
        .expect("region");
    let merged = vars[0].real_range().expect("real");
    assert!(!contributions.is_empty());
    for range in contributions {
        assert!(merged.encloses(&range), "{merged:?} misses {range:?}");
    }
}

#[test]
fn decided_branch_needs_no_exploration() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(1.0, 2.0, &mut session).expect("input");
    let mut vars = [x.clone()];
    let report = session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let zero = Zonotope::constant(0.0, session);
            if session.branch(&vars[0].gt(&zero, session)?, &SourceLocation::new("pos.c", 2))? {
                vars[0] = vars[0].neg(session)?;
            }
            Ok(())
        })
        .expect("region");
    assert_eq!(report.passes, 1);
    assert_eq!(session.path().stats().split_calls, 0);
    assert_eq!(vars[0].real_range(), Some(Interval::new(-2.0, -1.0)));
}

#[test]
fn overlapping_comparison_splits_once() {
    let mut session = Session::new(Settings::default()).expect("session");
    let a = Zonotope::from_range(0.0, 2.0, &mut session).expect("input");
    let b = Zonotope::from_range(1.0, 3.0, &mut session).expect("input");
    let cmp = a.le(&b, &session).expect("compare");
    assert_eq!(cmp.verdict(), Tristate::Top);
    session.branch(&cmp, &SourceLocation::new("cmp.c", 5)).expect("branch");
    assert_eq!(session.path().stats().split_calls, 1);
}

#[test]
fn quotient_by_a_range_holding_zero_keeps_every_execution() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(-1.0, 1.0, &mut session).expect("input");
    let y = Zonotope::from_range(-1.0, 2.0, &mut session).expect("divisor");
    let mut vars = [Zonotope::constant(0.0, &session)];
    let report = session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let zero = Zonotope::constant(0.0, session);
            let negative = x.lt(&zero, session)?;
            vars[0] = if session.branch(&negative, &SourceLocation::new("ratio.c", 4))? {
                Zonotope::constant(1.0, session).div(&y, session)?
            } else {
                Zonotope::constant(5.0, session)
            };
            Ok(())
        })
        .expect("region");

    assert_eq!(report.infeasible_passes, 0);
    assert!(report.complete);
    assert_eq!(report.contributions, report.passes);
    let real = vars[0].real_range().expect("real");
    assert!(real.contains(1.0) && real.contains(5.0) && real.contains(-1.0));
    assert!(vars[0].implementation_range().expect("implementation").contains(1.0));
}

#[test]
fn region_exit_retires_symbols_of_finished_passes() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(0.5, 1.5, &mut session).expect("input");
    let before = session.symbols().live_count();
    let mut vars = [x.clone()];
    session
        .branch_flow(&here!(), &mut vars, |session, vars| {
            let one = Zonotope::constant(1.0, session);
            let high = vars[0].gt(&one, session)?;
            let square = vars[0].mul(&vars[0], session)?;
            vars[0] = if session.branch(&high, &SourceLocation::new("sq.c", 2))? {
                square.sub(&vars[0], session)?
            } else {
                square.add(&vars[0], session)?
            };
            Ok(())
        })
        .expect("region");

    let symbols = session.symbols();
    assert!(symbols.live_count() < symbols.len());
    assert!(symbols.live_count() >= before);
    for id in vars[0].real_form().expect("real").symbols() {
        assert!(!symbols.get(id).expect("symbol").retired);
    }
    for id in x.real_form().expect("real").symbols() {
        assert!(!symbols.get(id).expect("input symbol").retired);
    }
}

#[test]
fn explicit_retirement_keeps_live_values() {
    let mut session = Session::new(Settings::default()).expect("session");
    let x = Zonotope::from_range(0.0, 1.0, &mut session).expect("input");
    let y = x.mul(&x, &mut session).expect("square");
    let unused = Zonotope::from_range(3.0, 4.0, &mut session).expect("unused");
    let retired = session.retire_unreferenced(&[y.clone()]);
    assert!(retired >= 1);
    for id in unused.real_form().expect("real").symbols() {
        assert!(session.symbols().get(id).expect("symbol").retired);
    }
    for id in y.real_form().expect("real").symbols() {
        assert!(!session.symbols().get(id).expect("symbol").retired);
    }
}
