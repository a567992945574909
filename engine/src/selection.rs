//! Winner selection: override precedence, then uniform sampling.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use gala_types::{OverrideSnapshot, ParticipantId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("draw count must be at least 1")]
    InvalidCount,
    #[error("pool has {available} eligible participants, cannot draw {requested}")]
    InsufficientPool { available: usize, requested: usize },
}

/// Choose `count` distinct winners from `pool`.
///
/// When overrides are active, registered participants that are still in the
/// pool win first, in registration order. Remaining seats are sampled
/// uniformly without replacement from the rest of the pool. The result has
/// exactly `count` entries.
pub fn select<R: Rng + ?Sized>(
    pool: &[ParticipantId],
    overrides: &OverrideSnapshot,
    count: usize,
    rng: &mut R,
) -> Result<Vec<ParticipantId>, SelectionError> {
    if count == 0 {
        return Err(SelectionError::InvalidCount);
    }
    if pool.len() < count {
        return Err(SelectionError::InsufficientPool {
            available: pool.len(),
            requested: count,
        });
    }

    let mut winners = Vec::with_capacity(count);
    if overrides.activated && !overrides.participants.is_empty() {
        let in_pool: HashSet<&ParticipantId> = pool.iter().collect();
        for id in &overrides.participants {
            if winners.len() == count {
                break;
            }
            if in_pool.contains(id) && !winners.contains(id) {
                winners.push(id.clone());
            }
        }
    }

    let needed = count - winners.len();
    if needed > 0 {
        let guaranteed: HashSet<&ParticipantId> = winners.iter().collect();
        let rest: Vec<ParticipantId> = pool
            .iter()
            .filter(|id| !guaranteed.contains(id))
            .cloned()
            .collect();
        let drawn = sample_distinct(&rest, needed, rng);
        winners.extend(drawn);
    }

    Ok(winners)
}

/// Up to `amount` distinct items in random order (partial Fisher-Yates).
pub fn sample_distinct<T: Clone, R: Rng + ?Sized>(items: &[T], amount: usize, rng: &mut R) -> Vec<T> {
    let mut scratch = items.to_vec();
    let amount = amount.min(scratch.len());
    let (picked, _) = scratch.partial_shuffle(rng, amount);
    picked.to_vec()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn ids(raw: &[&str]) -> Vec<ParticipantId> {
        raw.iter().map(|id| ParticipantId::new(*id)).collect()
    }

    #[test]
    fn zero_count_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select(&ids(&["a"]), &OverrideSnapshot::inactive(), 0, &mut rng).unwrap_err();
        assert_eq!(err, SelectionError::InvalidCount);
    }

    #[test]
    fn small_pool_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select(&ids(&["a", "b"]), &OverrideSnapshot::inactive(), 3, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientPool {
                available: 2,
                requested: 3
            }
        );
    }

    #[test]
    fn whole_pool_drawn_when_count_matches() {
        let pool = ids(&["a", "b", "c", "d", "e"]);
        let mut rng = StdRng::seed_from_u64(9);
        let mut winners = select(&pool, &OverrideSnapshot::inactive(), 5, &mut rng).unwrap();
        winners.sort();
        assert_eq!(winners, pool);
    }

    #[test]
    fn same_seed_same_winners() {
        let pool = ids(&["a", "b", "c", "d", "e", "f", "g"]);
        let first = select(
            &pool,
            &OverrideSnapshot::inactive(),
            3,
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();
        let second = select(
            &pool,
            &OverrideSnapshot::inactive(),
            3,
            &mut StdRng::seed_from_u64(42),
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn overrides_win_first_for_any_seed() {
        let pool = ids(&["a", "b", "c", "d", "e"]);
        let overrides = OverrideSnapshot::active(ids(&["c"]));
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winners = select(&pool, &overrides, 2, &mut rng).unwrap();
            assert_eq!(winners.len(), 2);
            assert_eq!(winners[0], ParticipantId::new("c"), "seed {seed}");
            assert_ne!(winners[1], ParticipantId::new("c"), "seed {seed}");
            assert!(pool.contains(&winners[1]));
        }
    }

    #[test]
    fn overrides_outside_pool_are_skipped() {
        let pool = ids(&["a", "b", "c"]);
        let overrides = OverrideSnapshot::active(ids(&["z", "b"]));
        let mut rng = StdRng::seed_from_u64(5);
        let winners = select(&pool, &overrides, 1, &mut rng).unwrap();
        assert_eq!(winners, ids(&["b"]));
    }

    #[test]
    fn more_overrides_than_count_keeps_registration_order() {
        let pool = ids(&["a", "b", "c", "d"]);
        let overrides = OverrideSnapshot::active(ids(&["d", "b", "a"]));
        let mut rng = StdRng::seed_from_u64(3);
        let winners = select(&pool, &overrides, 2, &mut rng).unwrap();
        assert_eq!(winners, ids(&["d", "b"]));
    }

    #[test]
    fn deactivated_overrides_are_ignored() {
        let pool = ids(&["a", "b", "c", "d", "e"]);
        let overrides = OverrideSnapshot {
            activated: false,
            participants: ids(&["c"]),
        };
        let mut c_first = 0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winners = select(&pool, &overrides, 1, &mut rng).unwrap();
            if winners[0] == ParticipantId::new("c") {
                c_first += 1;
            }
        }
        assert!(c_first < 200);
    }

    #[test]
    fn uniform_single_draw_passes_chi_square() {
        const TRIALS: usize = 20_000;
        // Chi-square critical value, 4 degrees of freedom, p = 0.001.
        const CRITICAL: f64 = 18.467;

        let pool = ids(&["a", "b", "c", "d", "e"]);
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts = [0usize; 5];
        for _ in 0..TRIALS {
            let winners = select(&pool, &OverrideSnapshot::inactive(), 1, &mut rng).unwrap();
            let slot = pool.iter().position(|id| id == &winners[0]).unwrap();
            counts[slot] += 1;
        }

        let expected = TRIALS as f64 / pool.len() as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi_square < CRITICAL, "chi-square {chi_square} for {counts:?}");
    }

    #[test]
    fn sample_distinct_caps_at_len() {
        let mut rng = StdRng::seed_from_u64(0);
        let picked = sample_distinct(&[1, 2, 3], 10, &mut rng);
        assert_eq!(picked.len(), 3);
    }
}
