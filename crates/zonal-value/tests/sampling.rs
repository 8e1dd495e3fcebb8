use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zonal_core::Settings;
use zonal_flow::Session;
use zonal_value::Zonotope;

fn inside(range: zonal_core::Interval, value: f64) -> bool {
    let slack = 1e-12 * (1.0 + value.abs());
    range.lo - slack <= value && value <= range.hi + slack
}

#[test]
fn sampled_inputs_land_inside_the_real_range() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..32 {
        let lo: f64 = rng.gen_range(-2.0..2.0);
        let width: f64 = rng.gen_range(0.01..1.5);
        let mut session = Session::new(Settings::default()).unwrap();
        let x = Zonotope::from_range(lo, lo + width, &mut session).unwrap();

        let s = x.sin(&mut session).unwrap();
        let e = x.scale(0.5, &mut session).unwrap().exp(&mut session).unwrap();
        let y = s.mul(&e, &mut session).unwrap().sub(&x, &mut session).unwrap();
        let t = x.atan(&mut session).unwrap().add(&y, &mut session).unwrap();

        let range = t.real_range().unwrap();
        for _ in 0..64 {
            let v: f64 = rng.gen_range(lo..=lo + width);
            let exact = v.sin() * (0.5 * v).exp() - v + v.atan();
            assert!(inside(range, exact), "{exact} outside {range:?} for x in [{lo}, {}]", lo + width);
        }
        assert!(t.implementation_range().unwrap().contains(t.implementation()));
    }
}

#[test]
fn simplification_keeps_ranges_sound() {
    let mut rng = StdRng::seed_from_u64(7);
    let settings = Settings::default().limit_noise_symbols_number(4);
    let mut session = Session::new(settings).unwrap();
    let inputs: Vec<(f64, Zonotope)> = (0..8)
        .map(|_| {
            let lo: f64 = rng.gen_range(-1.0..1.0);
            (lo, Zonotope::from_range(lo, lo + 0.25, &mut session).unwrap())
        })
        .collect();
    let mut sum = Zonotope::constant(0.0, &session);
    for (_, x) in &inputs {
        sum = sum.add(x, &mut session).unwrap();
    }
    assert!(sum.real_form().unwrap().len() <= 4);
    let range = sum.real_range().unwrap();
    let lowest: f64 = inputs.iter().map(|(lo, _)| lo).sum();
    assert!(inside(range, lowest) && inside(range, lowest + 2.0));
}
