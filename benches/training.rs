use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use visibility_ml::config::{ParamGrid, ParamValue};
use visibility_ml::training::{GridSearch, KFold, ModelKind, ParamSet};
use visibility_ml::transformation::StandardScaler;

fn create_regression_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);

    // Target as sum of features + noise
    let y = x.sum_axis(ndarray::Axis(1)).mapv(|v| v + rng.gen::<f64>() * 0.1);
    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [1000, 5000].iter() {
        let data = create_regression_data(*n_rows, 5);

        for kind in ModelKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(kind.name(), n_rows),
                &data,
                |b, (x, y)| {
                    b.iter(|| {
                        let mut estimator = kind.build(&ParamSet::new()).unwrap();
                        estimator.fit(black_box(x), black_box(y)).unwrap();
                        estimator
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let (x, y) = create_regression_data(2000, 5);
    let mut grid = ParamGrid::new();
    grid.insert(
        "max_depth".to_string(),
        vec![ParamValue::Int(4), ParamValue::Int(8), ParamValue::Null],
    );
    grid.insert(
        "min_samples_leaf".to_string(),
        vec![ParamValue::Int(1), ParamValue::Int(5)],
    );

    group.bench_function("decision_tree_3fold", |b| {
        b.iter(|| {
            GridSearch::new(ModelKind::DecisionTreeRegressor, grid.clone())
                .with_cv(KFold::new(3))
                .fit(black_box(&x), black_box(&y))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let names: Vec<String> = (0..5).map(|i| format!("f{}", i)).collect();

    for n_rows in [1000, 10000].iter() {
        let (x, _) = create_regression_data(*n_rows, 5);
        let scaler = StandardScaler::fit(x.view(), &names).unwrap();

        group.bench_with_input(BenchmarkId::new("transform", n_rows), &x, |b, x| {
            b.iter(|| scaler.transform(black_box(x.view())).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_grid_search, bench_scaling);
criterion_main!(benches);
