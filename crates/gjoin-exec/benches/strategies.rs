//! Benchmark: hash join then aggregate vs. pre-aggregation across key densities.
//!
//! Fewer distinct keys means more duplicates on both sides, which grows the
//! materialized join output quadratically while pre-aggregation stays linear.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gjoin_exec::Strategy;
use gjoin_types::{RowA, RowB};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 20_000;
const SEED: u64 = 0x6a6f_696e;

fn relations(distinct_keys: i32) -> (Vec<RowA>, Vec<RowB>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let a = (0..ROWS)
        .map(|_| RowA::new(rng.gen_range(0..distinct_keys), rng.gen_range(1..=100)))
        .collect();
    let b = (0..ROWS)
        .map(|_| RowB::new(rng.gen_range(0..distinct_keys)))
        .collect();
    (a, b)
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_aggregate");
    group.throughput(Throughput::Elements((ROWS * 2) as u64));

    // 20_000 distinct keys is close to unique; 200 means ~100 rows per key per side.
    for distinct_keys in [20_000, 2_000, 200] {
        let (a, b) = relations(distinct_keys);
        for strategy in Strategy::ALL {
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), distinct_keys),
                &(&a, &b),
                |bench, (a, b)| {
                    bench.iter(|| strategy.evaluate(a, b).expect("evaluation"));
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
