//! Isolation-forest outlier scoring.
//!
//! A forest of random partition trees is grown over the attribute+outcome
//! feature space; anomalous synths sit in sparse regions and get isolated
//! in few splits, so their average path length is short. The standard
//! normalization `2^(-E[h]/c(m))` maps path lengths to a score in (0, 1)
//! where values near 1 are highly anomalous.
//!
//! Trees are independent, so they build in parallel; each tree's RNG is
//! seeded from `mix_seed(seed, tree_index)` and the forest is therefore
//! reproducible for a given seed.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PopulationGroup, SimulationResult};
use crate::error::CoreError;
use crate::math::mix_seed;
use crate::segment::{Feature, FeatureMatrix, feature_matrix};

const N_TREES: usize = 100;
const SUBSAMPLE: usize = 256;

/// Euler-Mascheroni constant, for the harmonic-number approximation in
/// the expected path length `c(n)`.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Per-synth anomaly score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierScore {
    pub synth_id: u32,
    pub score: f64,
    pub is_outlier: bool,
}

/// Forest output: scores aligned with the input rows plus the flagging
/// threshold actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierReport {
    pub contamination: f64,
    pub threshold: f64,
    pub scores: Vec<OutlierScore>,
}

impl OutlierReport {
    /// Scores ordered most-anomalous first.
    pub fn ranked(&self) -> Vec<&OutlierScore> {
        let mut ranked: Vec<&OutlierScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn flagged(&self) -> impl Iterator<Item = &OutlierScore> {
        self.scores.iter().filter(|s| s.is_outlier)
    }
}

/// Score a simulated population and flag the top `contamination` fraction.
pub fn detect(
    group: &PopulationGroup,
    result: &SimulationResult,
    features: &[Feature],
    contamination: f64,
    seed: u64,
) -> Result<OutlierReport, CoreError> {
    let matrix = feature_matrix(group, result, features)?;
    detect_on_matrix(&matrix, contamination, seed)
}

/// Forest construction and scoring over a prepared matrix.
pub fn detect_on_matrix(
    matrix: &FeatureMatrix,
    contamination: f64,
    seed: u64,
) -> Result<OutlierReport, CoreError> {
    if !contamination.is_finite() || !(0.0..=0.5).contains(&contamination) || contamination == 0.0
    {
        return Err(CoreError::config(format!(
            "contamination must be in (0, 0.5], got {contamination}"
        )));
    }
    let n = matrix.len();
    if n < 2 {
        return Err(CoreError::InsufficientData {
            required: 2,
            actual: n,
        });
    }

    let sample_size = SUBSAMPLE.min(n);
    let max_depth = (sample_size as f64).log2().ceil() as usize;

    let trees: Vec<IsolationTree> = (0..N_TREES)
        .into_par_iter()
        .map(|t| {
            let mut rng = StdRng::seed_from_u64(mix_seed(seed, t as u64));
            let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
            IsolationTree::build(&matrix.rows, &sample, max_depth, &mut rng)
        })
        .collect();

    let c_norm = expected_path_length(sample_size);
    let raw_scores: Vec<f64> = matrix
        .rows
        .par_iter()
        .map(|row| {
            let mean_path: f64 = trees.iter().map(|t| t.path_length(row)).sum::<f64>()
                / trees.len() as f64;
            2f64.powf(-mean_path / c_norm)
        })
        .collect();

    // Flag the top fraction; ties at the threshold break by row order.
    let flag_count = ((contamination * n as f64).ceil() as usize).clamp(1, n);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        raw_scores[b]
            .partial_cmp(&raw_scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    let threshold = raw_scores[order[flag_count - 1]];

    let mut flagged = vec![false; n];
    for &i in order.iter().take(flag_count) {
        flagged[i] = true;
    }

    debug!(
        n,
        flag_count,
        threshold,
        "isolation forest scored population"
    );

    let scores = matrix
        .synth_ids
        .iter()
        .zip(raw_scores)
        .zip(flagged)
        .map(|((id, score), is_outlier)| OutlierScore {
            synth_id: *id,
            score,
            is_outlier,
        })
        .collect();

    Ok(OutlierReport {
        contamination,
        threshold,
        scores,
    })
}

/// Average path length of an unsuccessful BST search in a tree of `n`
/// points; the isolation-forest normalization constant.
fn expected_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let nf = n as f64;
    let harmonic = (nf - 1.0).ln() + EULER_GAMMA;
    2.0 * harmonic - 2.0 * (nf - 1.0) / nf
}

enum IsolationTree {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
}

impl IsolationTree {
    fn build(rows: &[Vec<f64>], indices: &[usize], depth_left: usize, rng: &mut StdRng) -> Self {
        if indices.len() <= 1 || depth_left == 0 {
            return IsolationTree::Leaf {
                size: indices.len(),
            };
        }

        let dim = rows[indices[0]].len();

        // Pick a random feature with spread; give up after a few tries if
        // the remaining points are identical in every sampled dimension.
        for _ in 0..dim.max(4) {
            let feature = rng.gen_range(0..dim);
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in indices {
                lo = lo.min(rows[i][feature]);
                hi = hi.max(rows[i][feature]);
            }
            if hi - lo <= 1e-12 {
                continue;
            }

            let threshold = rng.gen_range(lo..hi);
            let (left, right): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| rows[i][feature] < threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }

            return IsolationTree::Split {
                feature,
                threshold,
                left: Box::new(Self::build(rows, &left, depth_left - 1, rng)),
                right: Box::new(Self::build(rows, &right, depth_left - 1, rng)),
            };
        }

        IsolationTree::Leaf {
            size: indices.len(),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                IsolationTree::Leaf { size } => {
                    return depth + expected_path_length(*size);
                }
                IsolationTree::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    depth += 1.0;
                    node = if row[*feature] < *threshold { left } else { right };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A dense blob plus a handful of points several standard deviations
    /// out along both axes.
    fn matrix_with_planted_outliers(n_normal: usize, outliers: &[(f64, f64)]) -> FeatureMatrix {
        let mut rows = Vec::new();
        for i in 0..n_normal {
            // Deterministic low-discrepancy jitter inside the unit square.
            let a = (i as f64 * 0.618_033_988_749) % 1.0;
            let b = (i as f64 * 0.754_877_666_246) % 1.0;
            rows.push(vec![a, b]);
        }
        for (x, y) in outliers {
            rows.push(vec![*x, *y]);
        }
        let total = rows.len();
        FeatureMatrix {
            features: vec![Feature::AttemptRate, Feature::SuccessRate],
            synth_ids: (0..total as u32).collect(),
            rows,
        }
    }

    #[test]
    fn planted_extremes_land_in_the_flagged_fraction() {
        let matrix = matrix_with_planted_outliers(300, &[(8.0, 8.0), (-7.0, 9.0), (9.0, -8.0)]);
        let report = detect_on_matrix(&matrix, 0.02, 42).unwrap();

        for planted in [300u32, 301, 302] {
            let entry = report
                .scores
                .iter()
                .find(|s| s.synth_id == planted)
                .unwrap();
            assert!(
                entry.is_outlier,
                "planted outlier {planted} not flagged (score {:.3}, threshold {:.3})",
                entry.score, report.threshold
            );
        }
    }

    #[test]
    fn flags_the_requested_fraction() {
        let matrix = matrix_with_planted_outliers(200, &[(9.0, 9.0)]);
        let report = detect_on_matrix(&matrix, 0.05, 7).unwrap();
        let flagged = report.flagged().count();
        assert_eq!(flagged, (0.05f64 * 201.0).ceil() as usize);
    }

    #[test]
    fn same_seed_reproduces_scores() {
        let matrix = matrix_with_planted_outliers(150, &[(6.0, -6.0)]);
        let a = detect_on_matrix(&matrix, 0.1, 3).unwrap();
        let b = detect_on_matrix(&matrix, 0.1, 3).unwrap();
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn scores_are_in_unit_interval_and_outliers_rank_first() {
        let matrix = matrix_with_planted_outliers(250, &[(10.0, 10.0)]);
        let report = detect_on_matrix(&matrix, 0.02, 5).unwrap();
        for s in &report.scores {
            assert!(s.score > 0.0 && s.score < 1.0);
        }
        assert_eq!(report.ranked()[0].synth_id, 250);
    }

    #[test]
    fn invalid_contamination_is_rejected() {
        let matrix = matrix_with_planted_outliers(50, &[]);
        assert!(detect_on_matrix(&matrix, 0.0, 1).is_err());
        assert!(detect_on_matrix(&matrix, 0.9, 1).is_err());
    }
}
