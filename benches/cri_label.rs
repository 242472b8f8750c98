use criterion::{criterion_group, criterion_main, Criterion};

use halftime::label::{first_half_goal, split_minutes, HalfTimeLabel};
use halftime::recency::{rank_within_season, SeasonKey};

fn criterion_benchmark(c: &mut Criterion) {
    // sanity check
    assert!(!first_half_goal(&split_minutes("50.70.88.-")).unwrap());
    assert_eq!(1, HalfTimeLabel::derive("60.-", "12.-").unwrap().value());

    c.bench_function("cri_label_late_goals", |b| {
        b.iter(|| HalfTimeLabel::derive("50.70.88.-", "46.90.-").unwrap());
    });

    c.bench_function("cri_label_early_exit", |b| {
        b.iter(|| HalfTimeLabel::derive("3.50.70.88.-", "-").unwrap());
    });

    let seasons: Vec<_> = (2000..2024).map(|season| season.to_string()).collect();
    let keys: Vec<_> = seasons
        .iter()
        .flat_map(|season| {
            (1..=38).flat_map(move |matchday| {
                (0..10).map(move |_| SeasonKey {
                    season,
                    matchday,
                })
            })
        })
        .collect();
    c.bench_function("cri_rank_9120", |b| {
        b.iter(|| rank_within_season(&keys));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
