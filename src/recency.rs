//! Recency ranking of matches within a season.
//!
//! Rows are grouped by season and numbered in order of descending matchday, so that rank 1 is
//! the most recent match of its season. The weight of a row is the reciprocal of its rank.

use rustc_hash::FxHashMap;

/// The season and matchday of a single row, as seen by the ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonKey<'a> {
    pub season: &'a str,
    pub matchday: u32,
}

/// Assigns a 1-based row number to each key within its season, ordered by season descending
/// then matchday descending. Rows that tie on matchday receive distinct consecutive numbers
/// in input order. The returned ranks are aligned with `keys`.
pub fn rank_within_season(keys: &[SeasonKey]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&keys[a], &keys[b]);
        b.season
            .cmp(a.season)
            .then_with(|| b.matchday.cmp(&a.matchday))
    });

    let mut next_rank: FxHashMap<&str, u32> = FxHashMap::default();
    let mut ranks = vec![0; keys.len()];
    for index in order {
        let rank = next_rank.entry(keys[index].season).or_insert(0);
        *rank += 1;
        ranks[index] = *rank;
    }
    ranks
}

/// The weight of a row with the given rank.
#[inline]
pub fn weight(rank: u32) -> f64 {
    debug_assert!(rank > 0, "ranks start at 1");
    1.0 / rank as f64
}
