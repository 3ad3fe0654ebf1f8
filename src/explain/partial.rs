//! Partial-dependence curves.
//!
//! The marginal effect of one trait on the predicted outcome: sweep the
//! trait across a grid while every *other* trait stays at each synth's
//! observed value, and average the prediction over the population at each
//! grid point. Unlike a simple "predict at the mean" sweep this keeps the
//! observed joint distribution of the remaining features intact.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{PopulationGroup, SimulationResult, TraitKind};
use crate::error::CoreError;
use crate::math::linspace;
use crate::sim::predict_overall_success;

/// One grid point of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdPoint {
    pub value: f64,
    pub mean_prediction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialDependence {
    pub feature: TraitKind,
    pub points: Vec<PdPoint>,
}

/// Compute the partial-dependence curve of `feature` over an evenly spaced
/// grid spanning that trait's observed range.
pub fn partial_dependence(
    group: &PopulationGroup,
    result: &SimulationResult,
    feature: TraitKind,
    grid_resolution: usize,
) -> Result<PartialDependence, CoreError> {
    if grid_resolution < 2 {
        return Err(CoreError::config(format!(
            "grid resolution must be >= 2, got {grid_resolution}"
        )));
    }
    if group.is_empty() {
        return Err(CoreError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let idx = feature.index();
    let rows: Vec<Vec<f64>> = group
        .synths
        .iter()
        .map(|s| s.traits.as_array().to_vec())
        .collect();

    let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, row| {
        (acc.0.min(row[idx]), acc.1.max(row[idx]))
    });

    let n = rows.len() as f64;
    let points: Vec<PdPoint> = linspace(lo, hi, grid_resolution)
        .into_par_iter()
        .map(|value| {
            let mean_prediction = rows
                .iter()
                .map(|row| {
                    let mut swept = row.clone();
                    swept[idx] = value;
                    predict_overall_success(&swept, &result.experiment)
                })
                .sum::<f64>()
                / n;
            PdPoint {
                value,
                mean_prediction,
            }
        })
        .collect();

    Ok(PartialDependence { feature, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::sim::simulate;

    fn simulated() -> (PopulationGroup, SimulationResult) {
        let group = generate(&DistributionConfig::default(), "g", 60, 71).unwrap();
        let result = simulate(
            &group,
            &ExperimentDef {
                name: "t".into(),
                difficulty: 0.5,
                friction: 0.4,
            },
            50,
            72,
        )
        .unwrap();
        (group, result)
    }

    #[test]
    fn curve_spans_the_observed_range_at_requested_resolution() {
        let (group, result) = simulated();
        let pd = partial_dependence(&group, &result, TraitKind::Trust, 11).unwrap();
        assert_eq!(pd.points.len(), 11);
        assert!(pd.points.windows(2).all(|w| w[0].value < w[1].value));
    }

    #[test]
    fn trust_curve_is_monotone_increasing() {
        // Trust only feeds the attempt gate, positively, so averaging over
        // the population preserves monotonicity.
        let (group, result) = simulated();
        let pd = partial_dependence(&group, &result, TraitKind::Trust, 9).unwrap();
        for w in pd.points.windows(2) {
            assert!(w[1].mean_prediction >= w[0].mean_prediction - 1e-12);
        }
    }

    #[test]
    fn motor_ability_curve_is_flat() {
        let (group, result) = simulated();
        let pd = partial_dependence(&group, &result, TraitKind::MotorAbility, 5).unwrap();
        let first = pd.points[0].mean_prediction;
        for p in &pd.points {
            assert!((p.mean_prediction - first).abs() < 1e-12);
        }
    }

    #[test]
    fn tiny_grid_resolution_is_rejected() {
        let (group, result) = simulated();
        let err = partial_dependence(&group, &result, TraitKind::Trust, 1).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
