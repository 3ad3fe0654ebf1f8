//! Explainability engine.
//!
//! Decomposes the simulator's closed-form prediction (overall success
//! probability as a function of the six latent traits) into additive
//! per-feature contributions, aggregates them into global importance, and
//! sweeps partial-dependence curves.
//!
//! The decomposition is Shapley-style with a population-mean background:
//! the value of a feature coalition is the prediction with coalition
//! features at the synth's values and the rest at the population mean. With
//! six built-in features the exact enumeration (2^6 coalition evaluations)
//! is cheap, so sampling only kicks in past `EXACT_FEATURE_LIMIT`; either
//! way the result records which method produced it, because sampled
//! attributions are approximations and downstream consumers should size
//! their confidence accordingly.

pub mod partial;
pub mod shap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PopulationGroup, SimulationResult, TraitKind};
use crate::error::CoreError;
use crate::sim::predict_overall_success;

pub use partial::{PartialDependence, PdPoint, partial_dependence};

/// Above this many features exact coalition enumeration becomes
/// infeasible and the engine switches to permutation sampling.
pub const EXACT_FEATURE_LIMIT: usize = 12;

/// Permutations drawn by the sampling path. Deltas telescope to
/// `prediction - baseline` per permutation, so additivity is exact for any
/// count; this many keeps the per-feature rankings stable across seeds.
pub const PERMUTATION_SAMPLES: usize = 64;

/// How an explanation was computed. Sampling is an approximation of the
/// exact Shapley values, not the real thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationMethod {
    ExactEnumeration,
    PermutationSampling { permutations: usize },
}

impl ExplanationMethod {
    pub fn is_approximate(self) -> bool {
        matches!(self, ExplanationMethod::PermutationSampling { .. })
    }
}

/// One feature's share of the prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: TraitKind,
    /// The synth's actual value for this feature.
    pub value: f64,
    pub contribution: f64,
}

/// Local explanation of one synth's prediction.
///
/// Invariant: `baseline + Σ contributions == prediction` within
/// floating-point tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    pub synth_id: u32,
    /// Prediction at the population-mean feature vector.
    pub baseline: f64,
    pub prediction: f64,
    pub contributions: Vec<FeatureContribution>,
    pub method: ExplanationMethod,
}

/// Features ranked by mean absolute contribution across the population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalImportance {
    pub ranked: Vec<FeatureImportance>,
    pub method: ExplanationMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: TraitKind,
    pub mean_abs_contribution: f64,
}

/// Population-mean trait vector, the background every coalition is
/// evaluated against.
pub fn baseline_vector(group: &PopulationGroup) -> Vec<f64> {
    let n = group.synths.len().max(1) as f64;
    let mut mean = vec![0.0; TraitKind::ALL.len()];
    for synth in &group.synths {
        for (j, v) in synth.traits.as_array().iter().enumerate() {
            mean[j] += v / n;
        }
    }
    mean
}

/// Explain one synth's predicted outcome.
pub fn local_explanation(
    group: &PopulationGroup,
    result: &SimulationResult,
    synth_id: u32,
    seed: u64,
) -> Result<LocalExplanation, CoreError> {
    if group.is_empty() {
        return Err(CoreError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let synth = group
        .synths
        .iter()
        .find(|s| s.id == synth_id)
        .ok_or_else(|| {
            CoreError::validation(format!("synth {synth_id} is not in group {}", group.name))
        })?;

    let baseline = baseline_vector(group);
    let x = synth.traits.as_array().to_vec();
    let predict = |features: &[f64]| predict_overall_success(features, &result.experiment);

    let (contributions, method) = if x.len() <= EXACT_FEATURE_LIMIT {
        (
            shap::exact_shapley(&predict, &x, &baseline),
            ExplanationMethod::ExactEnumeration,
        )
    } else {
        (
            shap::sampled_shapley(&predict, &x, &baseline, PERMUTATION_SAMPLES, seed),
            ExplanationMethod::PermutationSampling {
                permutations: PERMUTATION_SAMPLES,
            },
        )
    };

    let contributions = TraitKind::ALL
        .iter()
        .zip(&x)
        .zip(&contributions)
        .map(|((feature, value), contribution)| FeatureContribution {
            feature: *feature,
            value: *value,
            contribution: *contribution,
        })
        .collect();

    Ok(LocalExplanation {
        synth_id,
        baseline: predict(&baseline),
        prediction: predict(&x),
        contributions,
        method,
    })
}

/// Rank features by mean absolute local contribution across the whole
/// population.
pub fn global_importance(
    group: &PopulationGroup,
    result: &SimulationResult,
    seed: u64,
) -> Result<GlobalImportance, CoreError> {
    if group.is_empty() {
        return Err(CoreError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let baseline = baseline_vector(group);
    let predict = |features: &[f64]| predict_overall_success(features, &result.experiment);
    let d = TraitKind::ALL.len();
    let exact = d <= EXACT_FEATURE_LIMIT;

    let totals: Vec<f64> = group
        .synths
        .par_iter()
        .map(|synth| {
            let x = synth.traits.as_array().to_vec();
            if exact {
                shap::exact_shapley(&predict, &x, &baseline)
            } else {
                shap::sampled_shapley(&predict, &x, &baseline, PERMUTATION_SAMPLES, seed)
            }
        })
        .reduce(
            || vec![0.0; d],
            |mut acc, contributions| {
                for (a, c) in acc.iter_mut().zip(&contributions) {
                    *a += c.abs();
                }
                acc
            },
        );

    let n = group.synths.len() as f64;
    let mut ranked: Vec<FeatureImportance> = TraitKind::ALL
        .iter()
        .zip(&totals)
        .map(|(feature, total)| FeatureImportance {
            feature: *feature,
            mean_abs_contribution: total / n,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.mean_abs_contribution
            .partial_cmp(&a.mean_abs_contribution)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        top = ranked.first().map(|f| f.feature.display_name()),
        "global importance computed"
    );

    Ok(GlobalImportance {
        ranked,
        method: if exact {
            ExplanationMethod::ExactEnumeration
        } else {
            ExplanationMethod::PermutationSampling {
                permutations: PERMUTATION_SAMPLES,
            }
        },
    })
}
