use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ht_trader::comparables::{FilterParams, SaleRecord, filter_comparables};
use ht_trader::estimator::estimate_from_comparables;
use ht_trader::model::RegressionTree;
use ht_trader::record::{AttrMap, PlayerRecord};
use ht_trader::scoring;

/// Deterministic pseudo-random stream so bench inputs never vary between
/// runs.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn synthetic_sales(count: usize) -> Vec<SaleRecord> {
    let mut rng = Lcg(0x5eed);
    (0..count)
        .map(|_| {
            let playmaking = 3.0 + (rng.next_f64() * 8.0).floor();
            let mut attrs = AttrMap::new();
            attrs.set("playmaking", playmaking);
            attrs.set("passing", 3.0 + (rng.next_f64() * 6.0).floor());
            attrs.set("defending", 2.0 + (rng.next_f64() * 6.0).floor());
            attrs.set("scoring", 2.0 + (rng.next_f64() * 6.0).floor());
            attrs.set("winger", 2.0 + (rng.next_f64() * 6.0).floor());
            attrs.set("form", 4.0 + (rng.next_f64() * 4.0).floor());
            attrs.set("tsi", 50_000.0 + rng.next_f64() * 150_000.0);
            attrs.set("age_days", 7_500.0 + rng.next_f64() * 2_500.0);
            attrs.set("specialty_index", (rng.next_f64() * 6.0).floor());
            attrs.set("goalkeeping", 1.0);
            let price = 200_000.0 * playmaking * (0.8 + rng.next_f64() * 0.4);
            SaleRecord::new(attrs, price)
        })
        .collect()
}

fn target_player() -> PlayerRecord {
    let attrs = AttrMap::from([
        ("playmaking", 7.0),
        ("passing", 5.0),
        ("defending", 4.0),
        ("scoring", 3.0),
        ("winger", 4.0),
        ("form", 6.0),
        ("tsi", 110_000.0),
        ("age_days", 8_300.0),
        ("specialty_index", 1.0),
        ("goalkeeping", 1.0),
    ]);
    PlayerRecord::new("bench target", attrs)
}

fn bench_filter_comparables(c: &mut Criterion) {
    let sales = synthetic_sales(200);
    let player = target_player();
    let params = FilterParams::default();

    c.bench_function("filter_comparables_200", |b| {
        b.iter(|| {
            let kept = filter_comparables(black_box(&player), black_box(&sales), params);
            black_box(kept.len());
        })
    });
}

fn bench_comparable_estimate(c: &mut Criterion) {
    let sales = synthetic_sales(200);
    let player = target_player();
    let params = FilterParams::default();
    let (weights, scales) = scoring::resolve_profiles(false, None, None);
    let comps = filter_comparables(&player, &sales, params);

    c.bench_function("comparable_estimate", |b| {
        b.iter(|| {
            let est = estimate_from_comparables(
                black_box(&player),
                black_box(&comps),
                &weights,
                &scales,
                1,
            );
            black_box(est);
        })
    });
}

fn bench_tree_fit(c: &mut Criterion) {
    let mut rng = Lcg(0xf17);
    let rows: Vec<Vec<f64>> = (0..200)
        .map(|_| (0..9).map(|_| (rng.next_f64() * 20.0).floor()).collect())
        .collect();
    let targets: Vec<f64> = rows
        .iter()
        .map(|row| 100_000.0 * row[0] + 20_000.0 * row[1] + 5_000.0 * row[5])
        .collect();

    c.bench_function("tree_fit_200x9", |b| {
        b.iter(|| {
            let tree = RegressionTree::fit(black_box(&rows), black_box(&targets));
            black_box(tree.node_count());
        })
    });
}

fn bench_tree_predict(c: &mut Criterion) {
    let mut rng = Lcg(0xf17);
    let rows: Vec<Vec<f64>> = (0..200)
        .map(|_| (0..9).map(|_| (rng.next_f64() * 20.0).floor()).collect())
        .collect();
    let targets: Vec<f64> = rows
        .iter()
        .map(|row| 100_000.0 * row[0] + 20_000.0 * row[1] + 5_000.0 * row[5])
        .collect();
    let tree = RegressionTree::fit(&rows, &targets);

    c.bench_function("tree_predict", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for row in &rows {
                total += tree.predict(black_box(row));
            }
            black_box(total);
        })
    });
}

criterion_group!(
    perf,
    bench_filter_comparables,
    bench_comparable_estimate,
    bench_tree_fit,
    bench_tree_predict
);
criterion_main!(perf);
