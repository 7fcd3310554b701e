use criterion::{black_box, criterion_group, criterion_main, Criterion};
use errprop_calc::{NumArray, Operand, Region, UncertaintyContext};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn propagate_bench(c: &mut Criterion) {
    let ctx = UncertaintyContext::default();
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<f64> = (0..1_000).map(|_| rng.gen_range(0.5..2.0)).collect();
    let a = ctx.uncertain(values.clone(), 0.01).unwrap();
    let b = ctx.uncertain(values, 0.02).unwrap();
    let offsets = NumArray::from(vec![0.5; 1_000]);

    c.bench_function("elementwise_chain", |bench| {
        bench.iter(|| {
            let out = &(&a * &b) + &a.sin().unwrap();
            black_box(out.stddev().unwrap());
        });
    });

    c.bench_function("certain_operand_mix", |bench| {
        bench.iter(|| black_box(&a / &offsets));
    });

    c.bench_function("self_cancellation", |bench| {
        bench.iter(|| black_box((&a - &a).variance().unwrap()));
    });

    c.bench_function("region_overwrite", |bench| {
        let incoming = Operand::from(b.get(&Region::range(0, 100)).unwrap());
        bench.iter(|| {
            let mut target = a.copy();
            target.set(&Region::range(100, 200), &incoming).unwrap();
            black_box(target);
        });
    });

    c.bench_function("sum_reduction", |bench| {
        bench.iter(|| black_box(a.sum().unwrap()));
    });
}

criterion_group!(benches, propagate_bench);
criterion_main!(benches);
