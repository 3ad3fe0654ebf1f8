//! Cluster-count selection (elbow / silhouette sweep).
//!
//! For each candidate k we run a full K-means fit and record inertia and
//! mean silhouette. The recommended k is the silhouette argmax; when two
//! candidates are within a small margin we prefer the smaller k (simpler
//! segmentations are easier to narrate downstream).

use serde::{Deserialize, Serialize};

use crate::domain::{PopulationGroup, SimulationResult};
use crate::error::CoreError;

use super::kmeans::kmeans_on_matrix;
use super::{Feature, feature_matrix, silhouette};

/// Silhouette margin within which a smaller k wins the recommendation.
const SIMPLICITY_MARGIN: f64 = 0.01;

/// Diagnostics for one candidate k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KDiagnostic {
    pub k: usize,
    pub inertia: f64,
    pub silhouette: f64,
}

/// Full sweep output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElbowReport {
    pub per_k: Vec<KDiagnostic>,
    pub recommended_k: usize,
}

/// Sweep `k_range` (inclusive) and recommend a cluster count.
pub fn elbow(
    group: &PopulationGroup,
    result: &SimulationResult,
    features: &[Feature],
    k_range: (usize, usize),
    seed: u64,
) -> Result<ElbowReport, CoreError> {
    let (k_min, k_max) = k_range;
    if k_min < 2 || k_max < k_min {
        return Err(CoreError::config(format!(
            "invalid k range [{k_min}, {k_max}]: need 2 <= k_min <= k_max"
        )));
    }

    let matrix = feature_matrix(group, result, features)?;
    if matrix.len() < k_max {
        return Err(CoreError::InsufficientData {
            required: k_max,
            actual: matrix.len(),
        });
    }

    let mut per_k = Vec::with_capacity(k_max - k_min + 1);
    for k in k_min..=k_max {
        let fit = kmeans_on_matrix(&matrix, k, seed)?;
        let sil = silhouette(&matrix.rows, &fit.assignments, k);
        per_k.push(KDiagnostic {
            k,
            inertia: fit.inertia,
            silhouette: sil,
        });
    }

    Ok(ElbowReport {
        recommended_k: recommend(&per_k),
        per_k,
    })
}

fn recommend(per_k: &[KDiagnostic]) -> usize {
    let best = per_k
        .iter()
        .map(|d| d.silhouette)
        .fold(f64::NEG_INFINITY, f64::max);

    // Candidates are already ordered by ascending k, so the first one
    // within the margin is the simplest acceptable choice.
    per_k
        .iter()
        .find(|d| d.silhouette >= best - SIMPLICITY_MARGIN)
        .map(|d| d.k)
        .unwrap_or(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::sim::simulate;

    #[test]
    fn recommendation_prefers_smaller_k_within_margin() {
        let per_k = vec![
            KDiagnostic {
                k: 2,
                inertia: 50.0,
                silhouette: 0.595,
            },
            KDiagnostic {
                k: 3,
                inertia: 30.0,
                silhouette: 0.60,
            },
            KDiagnostic {
                k: 4,
                inertia: 20.0,
                silhouette: 0.40,
            },
        ];
        assert_eq!(recommend(&per_k), 2);
    }

    #[test]
    fn sweep_covers_the_requested_range() {
        let group = generate(&DistributionConfig::default(), "g", 120, 21).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            100,
            22,
        )
        .unwrap();

        let report = elbow(&group, &result, &Feature::default_set(), (2, 6), 5).unwrap();
        assert_eq!(report.per_k.len(), 5);
        assert!(report.recommended_k >= 2 && report.recommended_k <= 6);
        // Inertia is non-increasing in k for a fixed seed, up to local
        // optima; at minimum the extremes must be ordered.
        assert!(report.per_k[0].inertia >= report.per_k[4].inertia);
    }

    #[test]
    fn bad_k_range_is_a_configuration_error() {
        let group = generate(&DistributionConfig::default(), "g", 30, 1).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            20,
            1,
        )
        .unwrap();
        let err = elbow(&group, &result, &Feature::default_set(), (1, 5), 1).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
