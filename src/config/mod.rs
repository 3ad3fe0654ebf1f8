//! Population distribution configuration.
//!
//! `DistributionConfig` is a declarative description of population shape:
//! per-category weights plus shape parameters for continuous attributes.
//! It is an explicit, passed-in, immutable value (never module-level state);
//! every `PopulationGroup` carries the config it was generated from.
//!
//! Defaults are calibrated to national census-style statistics. A new group
//! with a different shape is built by cloning the defaults with overrides,
//! never by mutating an existing config.

use serde::{Deserialize, Serialize};

use crate::domain::{AgeBand, Education, ExpertiseShape, FamilyComposition, Severity};
use crate::error::CoreError;

/// Tolerance for validating that a weight table sums to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Calibrated population-wide disability prevalence.
///
/// Severity mixes behave differently on either side of this rate: at or
/// below it the configured mix (which includes a `none` outcome) applies
/// as-is; above it the mix shifts toward the severe end (see
/// [`DistributionConfig::effective_severity_mix`]).
pub const DISABILITY_BASELINE_RATE: f64 = 0.15;

/// Reweighting multipliers applied to the severity mix when the configured
/// disability rate exceeds the calibrated baseline.
const ABOVE_BASELINE_MULTIPLIERS: [(Severity, f64); 4] = [
    (Severity::Mild, 1.0),
    (Severity::Moderate, 2.0),
    (Severity::Severe, 3.0),
    (Severity::Total, 3.0),
];

/// Immutable description of a population's statistical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub age_weights: Vec<(AgeBand, f64)>,
    pub education_weights: Vec<(Education, f64)>,
    pub family_weights: Vec<(FamilyComposition, f64)>,
    /// Probability that a synth has any disability at all.
    pub disability_rate: f64,
    /// Severity mix applied per category when a disability is present.
    /// Includes a `none` outcome so a synth can be affected in some
    /// categories and not others.
    pub severity_mix: Vec<(Severity, f64)>,
    /// Beta-shape preset for the declared-expertise attribute.
    pub expertise_shape: ExpertiseShape,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            age_weights: vec![
                (AgeBand::From18To24, 0.12),
                (AgeBand::From25To34, 0.18),
                (AgeBand::From35To44, 0.17),
                (AgeBand::From45To54, 0.16),
                (AgeBand::From55To64, 0.16),
                (AgeBand::From65Plus, 0.21),
            ],
            education_weights: vec![
                (Education::BelowSecondary, 0.10),
                (Education::Secondary, 0.27),
                (Education::Vocational, 0.26),
                (Education::Bachelor, 0.24),
                (Education::Postgraduate, 0.13),
            ],
            family_weights: vec![
                (FamilyComposition::Single, 0.28),
                (FamilyComposition::Couple, 0.25),
                (FamilyComposition::CoupleWithChildren, 0.24),
                (FamilyComposition::SingleParent, 0.09),
                (FamilyComposition::Multigenerational, 0.14),
            ],
            disability_rate: DISABILITY_BASELINE_RATE,
            severity_mix: vec![
                (Severity::None, 0.20),
                (Severity::Mild, 0.35),
                (Severity::Moderate, 0.25),
                (Severity::Severe, 0.15),
                (Severity::Total, 0.05),
            ],
            expertise_shape: ExpertiseShape::Medium,
        }
    }
}

impl DistributionConfig {
    /// Check every weight table before any sampling begins.
    ///
    /// A config that fails here is rejected whole; no partial population is
    /// ever produced from it.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_weights("age", &self.age_weights)?;
        check_weights("education", &self.education_weights)?;
        check_weights("family composition", &self.family_weights)?;
        check_weights("severity mix", &self.severity_mix)?;

        if !self.disability_rate.is_finite() || !(0.0..=1.0).contains(&self.disability_rate) {
            return Err(CoreError::config(format!(
                "disability rate must be in [0,1], got {}",
                self.disability_rate
            )));
        }

        // Education sampling filters the table by the age band's cap; every
        // reachable age band must leave positive mass behind that filter, or
        // the draw would have nothing to pick from.
        for (age, age_weight) in &self.age_weights {
            if *age_weight <= 0.0 {
                continue;
            }
            let reachable: f64 = self
                .education_weights
                .iter()
                .filter(|(band, _)| *band <= age.max_education())
                .map(|(_, w)| *w)
                .sum();
            if reachable <= 0.0 {
                return Err(CoreError::config(format!(
                    "education weights leave no band with positive mass for age {}",
                    age.display_name()
                )));
            }
        }
        Ok(())
    }

    /// Clone this config with a different disability rate.
    pub fn with_disability_rate(&self, rate: f64) -> Self {
        let mut next = self.clone();
        next.disability_rate = rate;
        next
    }

    /// Clone this config with a different expertise skew preset.
    pub fn with_expertise_shape(&self, shape: ExpertiseShape) -> Self {
        let mut next = self.clone();
        next.expertise_shape = shape;
        next
    }

    /// Clone this config with a replacement age weight table.
    pub fn with_age_weights(&self, weights: Vec<(AgeBand, f64)>) -> Self {
        let mut next = self.clone();
        next.age_weights = weights;
        next
    }

    /// The severity mix actually used for sampling, given the configured
    /// disability rate.
    ///
    /// At or below the calibrated baseline the configured mix applies
    /// unchanged. Above it, the `none` outcome is dropped and the remaining
    /// tiers are reweighted toward moderate/severe/total, then renormalized:
    /// a population with elevated prevalence also skews more severe.
    pub fn effective_severity_mix(&self) -> Vec<(Severity, f64)> {
        if self.disability_rate <= DISABILITY_BASELINE_RATE {
            return self.severity_mix.clone();
        }

        let mut shifted: Vec<(Severity, f64)> = Vec::with_capacity(4);
        for &(severity, multiplier) in &ABOVE_BASELINE_MULTIPLIERS {
            let base = self
                .severity_mix
                .iter()
                .find(|(s, _)| *s == severity)
                .map(|(_, w)| *w)
                .unwrap_or(0.0);
            shifted.push((severity, base * multiplier));
        }

        let total: f64 = shifted.iter().map(|(_, w)| *w).sum();
        if total > 0.0 {
            for (_, w) in shifted.iter_mut() {
                *w /= total;
            }
        }
        shifted
    }
}

fn check_weights<T: Copy + std::fmt::Debug>(
    label: &str,
    weights: &[(T, f64)],
) -> Result<(), CoreError> {
    if weights.is_empty() {
        return Err(CoreError::config(format!("{label} weights are empty")));
    }
    for (category, w) in weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(CoreError::config(format!(
                "{label} weight for {category:?} must be a finite non-negative number, got {w}"
            )));
        }
    }
    let sum: f64 = weights.iter().map(|(_, w)| *w).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(CoreError::config(format!(
            "{label} weights must sum to 1.0 (±{WEIGHT_SUM_TOLERANCE}), got {sum}"
        )));
    }
    Ok(())
}
