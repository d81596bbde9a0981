use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use phishguard::imputation::{KnnImputer, Transform};
use phishguard::training::{ModelCandidate, ModelFamily, ModelSearchEngine, ParamGrid};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Ternary features like the phishing dataset, with a share of cells missing.
fn create_data(n_rows: usize, n_features: usize, missing: f64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| {
        if rng.gen::<f64>() < missing {
            f64::NAN
        } else {
            rng.gen_range(-1..=1) as f64
        }
    });
    let y = Array1::from_shape_fn(n_rows, |i| if x[[i, 0]].max(x[[i, 1]]) > 0.0 { 1.0 } else { 0.0 });
    (x, y)
}

fn bench_imputer(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_imputer");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let (x, _) = create_data(*n_rows, 30, 0.05);
        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &x, |b, x| {
            b.iter(|| {
                let mut imputer = KnnImputer::new(3);
                imputer.fit_transform(black_box(x)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let (x, y) = create_data(1000, 30, 0.0);
    let (x_test, y_test) = create_data(250, 30, 0.0);
    let engine = ModelSearchEngine::new(vec![
        ModelCandidate::new(
            ModelFamily::DecisionTree,
            ParamGrid::new().with("criterion", vec!["gini", "entropy"]),
        ),
        ModelCandidate::new(
            ModelFamily::RandomForest,
            ParamGrid::new().with("n_estimators", vec![8i64, 16]),
        ),
    ]);

    group.bench_function("trees_1000x30", |b| {
        b.iter(|| engine.search(black_box(&x), &y, &x_test, &y_test).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_imputer, bench_search);
criterion_main!(benches);
