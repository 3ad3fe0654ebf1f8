//! Shapley-value attribution over a black-box prediction function.
//!
//! Both paths share the same value function: `v(S)` is the prediction with
//! coalition features taken from the explained point `x` and the rest from
//! the `baseline` vector. Exact enumeration walks every coalition bitmask;
//! the sampled path averages marginal deltas over random feature
//! permutations (each permutation's deltas telescope from `v(∅)` to
//! `v(full)`, so additivity survives the approximation).

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::math::mix_seed;

/// Exact Shapley values by coalition enumeration. Cost is `2^d` calls to
/// `predict`; callers gate on a feature-count limit.
pub fn exact_shapley<F>(predict: &F, x: &[f64], baseline: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let d = x.len();

    // Evaluate every coalition once, indexed by bitmask.
    let values: Vec<f64> = (0u32..(1 << d))
        .map(|mask| predict(&blend(x, baseline, mask)))
        .collect();

    let factorial: Vec<f64> = {
        let mut f = vec![1.0; d + 1];
        for i in 1..=d {
            f[i] = f[i - 1] * i as f64;
        }
        f
    };
    let d_fact = factorial[d];

    let mut contributions = vec![0.0; d];
    for (i, contribution) in contributions.iter_mut().enumerate() {
        let bit = 1u32 << i;
        for mask in 0u32..(1 << d) {
            if mask & bit != 0 {
                continue;
            }
            let s = mask.count_ones() as usize;
            let weight = factorial[s] * factorial[d - s - 1] / d_fact;
            *contribution += weight * (values[(mask | bit) as usize] - values[mask as usize]);
        }
    }
    contributions
}

/// Permutation-sampling approximation of the Shapley values.
pub fn sampled_shapley<F>(
    predict: &F,
    x: &[f64],
    baseline: &[f64],
    permutations: usize,
    seed: u64,
) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let d = x.len();
    let mut contributions = vec![0.0; d];
    let mut rng = StdRng::seed_from_u64(mix_seed(seed, 0x73686170));

    let mut order: Vec<usize> = (0..d).collect();
    for _ in 0..permutations.max(1) {
        order.shuffle(&mut rng);

        let mut current = baseline.to_vec();
        let mut previous_value = predict(&current);
        for &feature in &order {
            current[feature] = x[feature];
            let value = predict(&current);
            contributions[feature] += value - previous_value;
            previous_value = value;
        }
    }

    for c in contributions.iter_mut() {
        *c /= permutations.max(1) as f64;
    }
    contributions
}

/// Coalition blend: feature `i` comes from `x` when bit `i` of `mask` is
/// set, otherwise from `baseline`.
fn blend(x: &[f64], baseline: &[f64], mask: u32) -> Vec<f64> {
    x.iter()
        .zip(baseline)
        .enumerate()
        .map(|(i, (xv, bv))| if mask & (1 << i) != 0 { *xv } else { *bv })
        .collect()
}
