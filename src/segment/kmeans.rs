//! K-means clustering with k-means++ seeding.
//!
//! Seeding and iteration are fully deterministic given the seed: the
//! k-means++ draws come from one seeded RNG, Lloyd updates are plain
//! arithmetic, and ties in assignment break toward the lower cluster index.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PopulationGroup, SimulationResult};
use crate::error::CoreError;
use crate::math::stats::euclidean_sq;
use crate::math::{mean, mix_seed};

use super::{Feature, FeatureMatrix, feature_matrix, silhouette};

const MAX_ITERATIONS: usize = 100;

/// Per-cluster summary attached to an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    pub mean_attempt_rate: f64,
    pub mean_success_rate: f64,
    pub mean_fail_rate: f64,
}

/// Output of one K-means run: synth-to-cluster mapping plus centroids,
/// profiles, and fit diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub k: usize,
    pub features: Vec<Feature>,
    pub synth_ids: Vec<u32>,
    /// Cluster index per synth, aligned with `synth_ids`.
    pub assignments: Vec<usize>,
    /// Centroids in standardized feature space.
    pub centroids: Vec<Vec<f64>>,
    pub profiles: Vec<ClusterProfile>,
    pub inertia: f64,
    pub silhouette: f64,
}

/// Raw K-means fit over a prepared matrix (no profiles attached).
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

/// Cluster a simulated population into `k` segments.
pub fn kmeans(
    group: &PopulationGroup,
    result: &SimulationResult,
    features: &[Feature],
    k: usize,
    seed: u64,
) -> Result<ClusterAssignment, CoreError> {
    let matrix = feature_matrix(group, result, features)?;
    let fit = kmeans_on_matrix(&matrix, k, seed)?;
    let sil = silhouette(&matrix.rows, &fit.assignments, k);

    let profiles = build_profiles(result, &fit.assignments, k);
    debug!(k, inertia = fit.inertia, silhouette = sil, "kmeans fit");

    Ok(ClusterAssignment {
        k,
        features: matrix.features,
        synth_ids: matrix.synth_ids,
        assignments: fit.assignments,
        centroids: fit.centroids,
        profiles,
        inertia: fit.inertia,
        silhouette: sil,
    })
}

/// Lloyd iterations over a standardized matrix.
pub fn kmeans_on_matrix(
    matrix: &FeatureMatrix,
    k: usize,
    seed: u64,
) -> Result<KMeansFit, CoreError> {
    if k == 0 {
        return Err(CoreError::config("k must be > 0"));
    }
    let n = matrix.len();
    if n < k {
        return Err(CoreError::InsufficientData {
            required: k,
            actual: n,
        });
    }

    let dim = matrix.rows[0].len();
    let mut rng = StdRng::seed_from_u64(mix_seed(seed, 0x6b6d65616e73));
    let mut centroids = plus_plus_seeding(&matrix.rows, k, &mut rng);

    let mut assignments = vec![0usize; n];
    for _ in 0..MAX_ITERATIONS {
        // Assignment step; ties break toward the lower cluster index.
        let mut changed = false;
        for (i, row) in matrix.rows.iter().enumerate() {
            let mut best = 0usize;
            let mut best_d = f64::INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let d = euclidean_sq(row, centroid);
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            if assignments[i] != best {
                assignments[i] = best;
                changed = true;
            }
        }

        // Update step. An emptied cluster keeps its previous centroid
        // rather than being respawned, which preserves determinism.
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = matrix
                .rows
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| **a == c)
                .map(|(row, _)| row)
                .collect();
            if members.is_empty() {
                continue;
            }
            for j in 0..dim {
                let column: Vec<f64> = members.iter().map(|m| m[j]).collect();
                centroid[j] = mean(&column);
            }
        }

        if !changed {
            break;
        }
    }

    let inertia = matrix
        .rows
        .iter()
        .zip(&assignments)
        .map(|(row, &a)| euclidean_sq(row, &centroids[a]))
        .sum();

    Ok(KMeansFit {
        assignments,
        centroids,
        inertia,
    })
}

/// k-means++ seeding: first centroid uniform, each further centroid drawn
/// with probability proportional to squared distance from the nearest
/// already-chosen centroid.
fn plus_plus_seeding(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(rows[rng.gen_range(0..n)].clone());

    let mut nearest_sq: Vec<f64> = rows
        .iter()
        .map(|row| euclidean_sq(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest_sq.iter().sum();
        let next = if total <= f64::MIN_POSITIVE {
            // All remaining points coincide with a centroid; fall back to a
            // uniform draw.
            rng.gen_range(0..n)
        } else {
            let roll: f64 = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = n - 1;
            for (i, d) in nearest_sq.iter().enumerate() {
                cumulative += d;
                if roll < cumulative {
                    chosen = i;
                    break;
                }
            }
            chosen
        };

        centroids.push(rows[next].clone());
        for (i, row) in rows.iter().enumerate() {
            let d = euclidean_sq(row, centroids.last().unwrap_or(&centroids[0]));
            if d < nearest_sq[i] {
                nearest_sq[i] = d;
            }
        }
    }

    centroids
}

fn build_profiles(
    result: &SimulationResult,
    assignments: &[usize],
    k: usize,
) -> Vec<ClusterProfile> {
    let mut profiles = Vec::with_capacity(k);
    for c in 0..k {
        let members: Vec<usize> = assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == c)
            .map(|(i, _)| i)
            .collect();
        let rate_mean = |pick: fn(&crate::domain::OutcomeVector) -> f64| {
            let values: Vec<f64> = members.iter().map(|&i| pick(&result.outcomes[i])).collect();
            mean(&values)
        };
        profiles.push(ClusterProfile {
            cluster: c,
            size: members.len(),
            mean_attempt_rate: rate_mean(|o| o.attempt_rate),
            mean_success_rate: rate_mean(|o| o.success_rate),
            mean_fail_rate: rate_mean(|o| o.fail_rate),
        });
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three tight, well-separated blobs in 2-d standardized space.
    fn blob_matrix() -> FeatureMatrix {
        let mut rows = Vec::new();
        let centers = [(-10.0, -10.0), (0.0, 10.0), (10.0, -10.0)];
        for (cx, cy) in centers {
            for j in 0..30 {
                let jitter = 0.01 * j as f64;
                rows.push(vec![cx + jitter, cy - jitter]);
            }
        }
        FeatureMatrix {
            features: vec![Feature::AttemptRate, Feature::SuccessRate],
            synth_ids: (0..90).collect(),
            rows,
        }
    }

    #[test]
    fn recovers_three_separated_blobs() {
        let matrix = blob_matrix();
        let fit = kmeans_on_matrix(&matrix, 3, 42).unwrap();

        // Every blob must map to exactly one cluster.
        for blob in 0..3 {
            let labels: Vec<usize> = (0..30).map(|j| fit.assignments[blob * 30 + j]).collect();
            assert!(
                labels.iter().all(|l| *l == labels[0]),
                "blob {blob} split across clusters"
            );
        }
        let mut labels: Vec<usize> = (0..3).map(|b| fit.assignments[b * 30]).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn correct_k_scores_higher_silhouette_than_wrong_k() {
        let matrix = blob_matrix();
        let s3 = {
            let fit = kmeans_on_matrix(&matrix, 3, 1).unwrap();
            silhouette(&matrix.rows, &fit.assignments, 3)
        };
        let s10 = {
            let fit = kmeans_on_matrix(&matrix, 10, 1).unwrap();
            silhouette(&matrix.rows, &fit.assignments, 10)
        };
        assert!(s3 > 0.9, "true-k silhouette should be near 1: {s3}");
        assert!(s3 > s10);
    }

    #[test]
    fn too_few_synths_for_k_is_an_error() {
        let matrix = FeatureMatrix {
            features: vec![Feature::AttemptRate],
            synth_ids: vec![0, 1],
            rows: vec![vec![0.0], vec![1.0]],
        };
        let err = kmeans_on_matrix(&matrix, 5, 1).unwrap_err();
        match err {
            CoreError::InsufficientData { required, actual } => {
                assert_eq!(required, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn same_seed_reproduces_the_fit() {
        let matrix = blob_matrix();
        let a = kmeans_on_matrix(&matrix, 3, 9).unwrap();
        let b = kmeans_on_matrix(&matrix, 3, 9).unwrap();
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
    }
}
