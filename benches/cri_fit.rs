use criterion::{criterion_group, criterion_main, Criterion};

use halftime::linear::glm;
use halftime::linear::glm::GlmOptions;
use halftime::linear::Matrix;

/// A design resembling one season of a 20-team league: 380 matches, one-hot teams, a matchday
/// and a recency weight.
fn league(rows: usize) -> (Matrix, Vec<f64>) {
    const TEAMS: usize = 20;
    let cols = 1 + 2 * (TEAMS - 1) + 1;
    let mut features = Matrix::allocate(rows, cols);
    let mut labels = Vec::with_capacity(rows);
    for row in 0..rows {
        let matchday = row / (TEAMS / 2) + 1;
        let home = row % TEAMS;
        let away = (row * 7 + 3) % TEAMS;
        features[(row, 0)] = matchday as f64;
        if home < TEAMS - 1 {
            features[(row, 1 + home)] = 1.0;
        }
        if away < TEAMS - 1 {
            features[(row, TEAMS + away)] = 1.0;
        }
        features[(row, cols - 1)] = 1.0 / (rows / (TEAMS / 2) + 1 - matchday) as f64;
        labels.push(if (row * 31 + home * 5 + away) % 7 < 5 { 1.0 } else { 0.0 });
    }
    (features, labels)
}

fn criterion_benchmark(c: &mut Criterion) {
    let (features, labels) = league(380);
    let options = GlmOptions::default();

    // sanity check
    let fit = glm::fit(&options, &features, &labels, None).unwrap();
    assert_eq!(features.cols(), fit.coefficients.len());

    c.bench_function("cri_fit_binomial_380", |b| {
        b.iter(|| glm::fit(&options, &features, &labels, None).unwrap());
    });

    let weights: Vec<_> = (0..labels.len()).map(|row| 1.0 / (row % 38 + 1) as f64).collect();
    c.bench_function("cri_fit_binomial_380_weighted", |b| {
        b.iter(|| glm::fit(&options, &features, &labels, Some(&weights)).unwrap());
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
