//! Code scoring by mean Jaccard similarity of token sets.
use std::hash::Hash;

use hashbrown::HashSet;
use rayon::prelude::*;

use crate::errors::{Result, SimcheckError};
use crate::pool::WorkerPool;

/// Computes the Jaccard similarity `|A ∩ B| / |A ∪ B|`, defined as 0 when both sets are empty.
///
/// # Examples
///
/// ```
/// use hashbrown::HashSet;
/// use simcheck::jaccard::jaccard_similarity;
///
/// let x: HashSet<_> = [1, 2, 4].into_iter().collect();
/// let y: HashSet<_> = [1, 2, 5, 7].into_iter().collect();
/// assert_eq!(jaccard_similarity(&x, &y), 0.4);
/// ```
pub fn jaccard_similarity<T>(lhs: &HashSet<T>, rhs: &HashSet<T>) -> f64
where
    T: Hash + Eq,
{
    let (small, large) = if lhs.len() <= rhs.len() {
        (lhs, rhs)
    } else {
        (rhs, lhs)
    };
    let inter = small.iter().filter(|t| large.contains(*t)).count();
    let union = lhs.len() + rhs.len() - inter;
    if union == 0 {
        0.
    } else {
        inter as f64 / union as f64
    }
}

/// Scores every set by its mean Jaccard similarity to all the other sets, scaled to `[0, 100]`.
///
/// # Errors
///
/// [`SimcheckError::Input`] if fewer than two sets are given, since the mean over
/// the other sets is then undefined.
pub fn jaccard_scores<T>(pool: &WorkerPool, sets: &[HashSet<T>]) -> Result<Vec<f64>>
where
    T: Hash + Eq + Sync,
{
    let n = sets.len();
    if n < 2 {
        return Err(SimcheckError::input(format!(
            "At least 2 code documents are needed to compare, but {n} given."
        )));
    }
    let denom = (n - 1) as f64;
    Ok(pool.install(|| {
        sets.par_iter()
            .enumerate()
            .map(|(i, x)| {
                let sum: f64 = sets
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, y)| jaccard_similarity(x, y))
                    .sum();
                100. * sum / denom
            })
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};

    fn set(xs: &[&'static str]) -> HashSet<&'static str> {
        xs.iter().copied().collect()
    }

    #[test]
    fn test_similarity() {
        let a = set(&["a", "b", "c"]);
        assert_eq!(jaccard_similarity(&a, &a), 1.);
        assert_eq!(jaccard_similarity(&set(&[]), &set(&[])), 0.);
        assert_eq!(jaccard_similarity(&a, &set(&[])), 0.);
        assert_eq!(jaccard_similarity(&a, &set(&["x", "y"])), 0.);
        assert_eq!(jaccard_similarity(&a, &set(&["b", "c", "d"])), 0.5);
        assert_eq!(
            jaccard_similarity(&set(&["b", "c", "d"]), &a),
            jaccard_similarity(&a, &set(&["b", "c", "d"]))
        );
    }

    #[test]
    fn test_identical_sets_score_100() {
        let pool = WorkerPool::new(2, None).unwrap();
        let sets = vec![set(&["def", "f", "(", ")"]); 5];
        assert_eq!(jaccard_scores(&pool, &sets).unwrap(), vec![100.; 5]);
    }

    #[test]
    fn test_disjoint_sets_score_0() {
        let pool = WorkerPool::new(2, None).unwrap();
        let sets = vec![set(&["a", "b"]), set(&["c", "d"]), set(&["e"])];
        assert_eq!(jaccard_scores(&pool, &sets).unwrap(), vec![0.; 3]);
    }

    #[test]
    fn test_mean_excludes_self() {
        let pool = WorkerPool::new(2, None).unwrap();
        let sets = vec![set(&["a", "b"]), set(&["a", "b"]), set(&["c"])];
        let scores = jaccard_scores(&pool, &sets).unwrap();
        assert_eq!(scores, vec![50., 50., 0.]);
    }

    #[test]
    fn test_single_set() {
        let pool = WorkerPool::new(1, None).unwrap();
        let err = jaccard_scores(&pool, &[set(&["a"])]).unwrap_err();
        assert!(err.is_input());
        let empty: [HashSet<&str>; 0] = [];
        assert!(jaccard_scores(&pool, &empty).unwrap_err().is_input());
    }

    #[test]
    fn test_random_sets() {
        let mut rng = rand_xoshiro::SplitMix64::seed_from_u64(42);
        let sets: Vec<HashSet<u32>> = (0..20)
            .map(|_| {
                let len = rng.gen_range(0..10);
                (0..len).map(|_| rng.gen_range(0..16)).collect()
            })
            .collect();
        for x in &sets {
            if !x.is_empty() {
                assert_eq!(jaccard_similarity(x, x), 1.);
            }
            for y in &sets {
                let s = jaccard_similarity(x, y);
                assert_eq!(s, jaccard_similarity(y, x));
                assert!((0. ..=1.).contains(&s));
            }
        }
        let pool = WorkerPool::new(4, None).unwrap();
        let scores = jaccard_scores(&pool, &sets).unwrap();
        for (i, score) in scores.iter().enumerate() {
            let expected: f64 = (0..sets.len())
                .filter(|&j| j != i)
                .map(|j| jaccard_similarity(&sets[i], &sets[j]))
                .sum::<f64>()
                * 100.
                / 19.;
            assert!((score - expected).abs() < 1e-9);
            assert!((0. ..=100.).contains(score));
        }
    }
}
