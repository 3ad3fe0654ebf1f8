//! Observable-attribute sampling for one synth.
//!
//! Sampling order matters for the cross-field consistency rules: age is
//! drawn first so the education draw can be restricted to the bands the age
//! band permits. Disability presence is an independent Bernoulli at the
//! configured rate; severities are only drawn for affected synths.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution};

use crate::config::DistributionConfig;
use crate::domain::{DisabilityCategory, Observables, Severity};
use crate::error::CoreError;

/// Draw one category from a weight table.
///
/// The table does not need to sum to exactly 1.0 here (education weights
/// arrive renormalized-by-construction after the age filter); the roll is
/// taken against the running total.
pub fn sample_weighted<T: Copy>(rng: &mut StdRng, weights: &[(T, f64)]) -> T {
    let total: f64 = weights.iter().map(|(_, w)| *w).sum();
    let roll: f64 = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
    let mut cumulative = 0.0;
    for (category, w) in weights {
        cumulative += w;
        if roll < cumulative {
            return *category;
        }
    }
    // Floating-point edge: the roll landed exactly on the total.
    weights[weights.len() - 1].0
}

/// Sample a full set of observables from the config.
pub fn sample_observables(
    config: &DistributionConfig,
    severity_mix: &[(Severity, f64)],
    rng: &mut StdRng,
) -> Result<Observables, CoreError> {
    let age = sample_weighted(rng, &config.age_weights);

    // Minimum-age-implies-maximum-education: restrict the table to the
    // bands this age band can have reached, then draw from what remains.
    let max_education = age.max_education();
    let allowed: Vec<_> = config
        .education_weights
        .iter()
        .filter(|(band, _)| *band <= max_education)
        .copied()
        .collect();
    if allowed.iter().map(|(_, w)| *w).sum::<f64>() <= 0.0 {
        return Err(CoreError::config(format!(
            "no education band with positive weight is reachable for age {}",
            age.display_name()
        )));
    }
    let education = sample_weighted(rng, &allowed);

    let family = sample_weighted(rng, &config.family_weights);

    let mut severities = [Severity::None; 4];
    if rng.gen_bool(config.disability_rate.clamp(0.0, 1.0)) {
        for category in DisabilityCategory::ALL {
            severities[category.index()] = sample_weighted(rng, severity_mix);
        }
    }

    let (alpha, beta) = config.expertise_shape.alpha_beta();
    let expertise_dist = Beta::new(alpha, beta)
        .map_err(|e| CoreError::config(format!("invalid expertise shape parameters: {e}")))?;
    let declared_expertise = expertise_dist.sample(rng);

    Ok(Observables {
        age,
        education,
        family,
        severities,
        declared_expertise,
    })
}
