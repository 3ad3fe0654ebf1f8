//! Shared numeric helpers.
//!
//! Every engine in this crate works on plain `Vec<f64>` feature vectors, so
//! the common pieces (moments, normalization, distances, deterministic seed
//! streams) live here rather than being re-implemented per engine.

pub mod stats;

pub use stats::{euclidean, mean, mean_variance, standardize_columns};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Derive an independent RNG seed for one work stream (a synth, a tree, a
/// permutation sample) from the top-level run seed.
///
/// Each parallel work item seeds its own `StdRng` from `mix_seed(seed, i)`,
/// which makes results identical regardless of how rayon schedules the items
/// across worker threads.
pub fn mix_seed(seed: u64, stream: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    stream.hash(&mut hasher);
    hasher.finish()
}

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    if steps < 2 {
        return vec![min];
    }
    let step = (max - min) / (steps as f64 - 1.0);
    (0..steps).map(|i| min + step * i as f64).collect()
}

/// Clamp a value into `[0, 1]`.
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Standard logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
