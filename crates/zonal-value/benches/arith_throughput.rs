use criterion::{black_box, criterion_group, criterion_main, Criterion};
use zonal_core::Settings;
use zonal_flow::Session;
use zonal_value::Zonotope;

fn polynomial_bench(c: &mut Criterion) {
    c.bench_function("horner_degree_16", |b| {
        b.iter(|| {
            let mut session = Session::new(Settings::default()).unwrap();
            let x = Zonotope::from_range(-0.5, 0.5, &mut session).unwrap();
            let mut acc = Zonotope::constant(1.0, &session);
            for k in 1..=16 {
                acc = acc.mul(&x, &mut session).unwrap();
                acc = acc.add_constant(1.0 / f64::from(k), &mut session).unwrap();
            }
            black_box(acc);
        });
    });
}

fn elementary_bench(c: &mut Criterion) {
    c.bench_function("exp_sin_chain", |b| {
        b.iter(|| {
            let settings = Settings::default().limit_noise_symbols_number(8);
            let mut session = Session::new(settings).unwrap();
            let mut x = Zonotope::from_range(0.1, 0.2, &mut session).unwrap();
            for _ in 0..32 {
                x = x.sin(&mut session).unwrap().exp(&mut session).unwrap();
                x = x.scale(0.25, &mut session).unwrap();
            }
            black_box(x);
        });
    });
}

criterion_group!(benches, polynomial_bench, elementary_bench);
criterion_main!(benches);
