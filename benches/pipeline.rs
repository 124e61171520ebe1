use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rainfall::columns::*;
use rainfall::{FeatureEngineer, RandomForestRegressor};

fn combined(days: usize) -> PolarsResult<DataFrame> {
    let cities = ["Bauchi", "Gombe", "Maiduguri", "Yola"];
    let n = days * cities.len();
    let start = chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    df!(
        COL_CITY => (0..n).map(|i| cities[i / days]).collect::<Vec<_>>(),
        COL_TIME => (0..n).map(|i| start + chrono::Duration::days((i % days) as i64)).collect::<Vec<_>>(),
        COL_TMAX => (0..n).map(|i| if i % 31 == 0 { None } else { Some(30.0 + (i % 7) as f64) }).collect::<Vec<_>>(),
        COL_TMIN => (0..n).map(|i| 20.0 + (i % 5) as f64).collect::<Vec<_>>(),
        COL_PRCP => (0..n).map(|i| (i % 11) as f64).collect::<Vec<_>>(),
        COL_RHUM => (0..n).map(|i| if i % 23 == 0 { None } else { Some(40.0 + (i % 40) as f64) }).collect::<Vec<_>>(),
        COL_CLOUD => (0..n).map(|i| (i % 10) as f64 / 10.0).collect::<Vec<_>>(),
        COL_SOIL => (0..n).map(|i| 0.1 + (i % 13) as f64 / 100.0).collect::<Vec<_>>(),
    )
}

fn bench_pipeline(c: &mut Criterion) {
    let df = combined(3 * 365).unwrap();
    let engineer = FeatureEngineer::default();
    c.bench_function("engineer_3y_4_cities", |b| {
        b.iter(|| engineer.engineer(black_box(df.clone())))
    });

    let rows = 2000;
    let x = Array2::from_shape_fn((rows, 12), |(i, j)| ((i * 31 + j * 7) % 97) as f64);
    let y = Array1::from_shape_fn(rows, |i| ((i * 13) % 17) as f64);
    c.bench_function("forest_fit_50_trees", |b| {
        b.iter(|| {
            let mut forest = RandomForestRegressor::new(50).with_max_depth(Some(10));
            forest.fit(black_box(&x), black_box(&y)).map(|_| ())
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
