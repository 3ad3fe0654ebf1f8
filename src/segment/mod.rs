//! Segmentation engine: feature extraction, K-means, hierarchical
//! clustering, and model-selection diagnostics.
//!
//! All clustering runs over `FeatureMatrix`, a standardized row-per-synth
//! view of behavioral traits and outcome rates. Standardization (z-score
//! per column) keeps rate features from being drowned out by trait features
//! and vice versa.

pub mod hierarchy;
pub mod kmeans;
pub mod selection;

use serde::{Deserialize, Serialize};

use crate::domain::{PopulationGroup, SimulationResult, TraitKind};
use crate::error::CoreError;
use crate::math::{euclidean, standardize_columns};

/// One clustering feature: a latent trait or an outcome rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Trait(TraitKind),
    AttemptRate,
    SuccessRate,
    FailRate,
}

impl Feature {
    /// The default feature set: all six latent traits plus the three
    /// outcome rates.
    pub fn default_set() -> Vec<Feature> {
        let mut features: Vec<Feature> = TraitKind::ALL.iter().map(|t| Feature::Trait(*t)).collect();
        features.extend([Feature::AttemptRate, Feature::SuccessRate, Feature::FailRate]);
        features
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Feature::Trait(kind) => kind.display_name(),
            Feature::AttemptRate => "attempt rate",
            Feature::SuccessRate => "success rate",
            Feature::FailRate => "fail rate",
        }
    }
}

/// Standardized per-synth feature vectors plus the ids they belong to.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub features: Vec<Feature>,
    pub synth_ids: Vec<u32>,
    /// Row-major, z-score standardized per column.
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the standardized feature matrix for one simulated group.
pub fn feature_matrix(
    group: &PopulationGroup,
    result: &SimulationResult,
    features: &[Feature],
) -> Result<FeatureMatrix, CoreError> {
    if features.is_empty() {
        return Err(CoreError::config("feature set must not be empty"));
    }
    if group.synths.len() != result.outcomes.len() {
        return Err(CoreError::validation(format!(
            "simulation result covers {} synths but the group has {}",
            result.outcomes.len(),
            group.synths.len()
        )));
    }

    let mut rows = Vec::with_capacity(group.synths.len());
    let mut synth_ids = Vec::with_capacity(group.synths.len());
    for (synth, outcome) in group.synths.iter().zip(&result.outcomes) {
        let row: Vec<f64> = features
            .iter()
            .map(|f| match f {
                Feature::Trait(kind) => synth.traits.get(*kind),
                Feature::AttemptRate => outcome.attempt_rate,
                Feature::SuccessRate => outcome.success_rate,
                Feature::FailRate => outcome.fail_rate,
            })
            .collect();
        rows.push(row);
        synth_ids.push(synth.id);
    }

    standardize_columns(&mut rows);

    Ok(FeatureMatrix {
        features: features.to_vec(),
        synth_ids,
        rows,
    })
}

/// Mean silhouette coefficient of a partition.
///
/// Computed over the full pairwise distance matrix, O(n²); fine at the
/// population sizes this crate targets and free of sampling noise, which
/// matters because model selection compares silhouettes across k.
pub fn silhouette(rows: &[Vec<f64>], assignments: &[usize], k: usize) -> f64 {
    let n = rows.len();
    if n == 0 || k < 2 {
        return 0.0;
    }

    let cluster_sizes = {
        let mut sizes = vec![0usize; k];
        for &a in assignments {
            sizes[a] += 1;
        }
        sizes
    };

    let mut total = 0.0;
    for i in 0..n {
        let own = assignments[i];
        if cluster_sizes[own] <= 1 {
            // Silhouette is defined as 0 for singleton clusters.
            continue;
        }

        let mut dist_sum = vec![0.0f64; k];
        for j in 0..n {
            if i == j {
                continue;
            }
            dist_sum[assignments[j]] += euclidean(&rows[i], &rows[j]);
        }

        let a = dist_sum[own] / (cluster_sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && cluster_sizes[c] > 0)
            .map(|c| dist_sum[c] / cluster_sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        if b.is_finite() {
            total += (b - a) / a.max(b).max(1e-12);
        }
    }

    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::sim::simulate;

    #[test]
    fn matrix_rows_align_with_synth_ids() {
        let group = generate(&DistributionConfig::default(), "g", 40, 1).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            50,
            2,
        )
        .unwrap();

        let matrix = feature_matrix(&group, &result, &Feature::default_set()).unwrap();
        assert_eq!(matrix.len(), 40);
        assert_eq!(matrix.rows[0].len(), 9);
        assert_eq!(matrix.synth_ids, (0..40).collect::<Vec<u32>>());
    }

    #[test]
    fn empty_feature_set_is_rejected() {
        let group = generate(&DistributionConfig::default(), "g", 10, 1).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            10,
            2,
        )
        .unwrap();
        assert!(feature_matrix(&group, &result, &[]).is_err());
    }

    #[test]
    fn silhouette_rewards_separated_clusters() {
        // Two tight blobs far apart vs a random split of the same points.
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(vec![0.0 + 0.01 * i as f64, 0.0]);
            rows.push(vec![10.0 + 0.01 * i as f64, 10.0]);
        }
        let good: Vec<usize> = (0..20).map(|i| i % 2).collect();
        let bad: Vec<usize> = (0..20).map(|i| (i / 10) % 2).collect();

        let s_good = silhouette(&rows, &good, 2);
        let s_bad = silhouette(&rows, &bad, 2);
        assert!(s_good > 0.9, "separated clusters should score high: {s_good}");
        assert!(s_good > s_bad);
    }
}
