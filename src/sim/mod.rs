//! Outcome simulator (Monte Carlo engine).
//!
//! For each synth we run `trials_per_synth` independent trials. A trial is
//! two gated Bernoulli draws: first whether the synth attempts the task at
//! all (trust and time availability against the experiment's friction),
//! then, only if attempted, whether it succeeds (capability, digital
//! literacy and domain expertise against the difficulty).
//!
//! The trait-blend-to-probability mapping is a logistic in
//! `blend - pressure`. The source material only pins the mapping down by
//! effect (higher trust must raise attempt probability); the logistic is
//! our concrete choice, validated by the large-trial convergence tests.
//!
//! Trials for one synth run on one seeded RNG stream
//! (`mix_seed(seed, synth_index)`), so results are bit-identical for a
//! given seed regardless of rayon worker count, and each synth's trials
//! complete atomically.

use chrono::Utc;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::info;

use crate::domain::{
    Aggregates, ExperimentDef, LatentTraits, OutcomeVector, PopulationGroup, QuadrantCounts,
    RateStats, SimulationResult, TraitKind,
};
use crate::error::CoreError;
use crate::math::{mean_variance, mix_seed, sigmoid};

/// Logistic steepness. Chosen so that a 0.2 gap between trait blend and
/// pressure moves the probability by roughly 25 points.
const GAIN: f64 = 6.0;

/// Attempt-gate blend weights: trust, time availability.
const ATTEMPT_W: [f64; 2] = [0.6, 0.4];
/// Success-gate blend weights: capability, digital literacy, domain expertise.
const SUCCESS_W: [f64; 3] = [0.4, 0.3, 0.3];

/// Probability that a synth attempts the task at all.
pub fn attempt_probability(traits: &LatentTraits, friction: f64) -> f64 {
    let blend = ATTEMPT_W[0] * traits.trust + ATTEMPT_W[1] * traits.time_availability;
    sigmoid(GAIN * (blend - friction))
}

/// Probability that an attempted trial succeeds.
pub fn success_probability(traits: &LatentTraits, difficulty: f64) -> f64 {
    let blend = SUCCESS_W[0] * traits.capability
        + SUCCESS_W[1] * traits.digital_literacy
        + SUCCESS_W[2] * traits.domain_expertise;
    sigmoid(GAIN * (blend - difficulty))
}

/// Closed-form overall success probability for a raw trait vector in
/// `TraitKind::ALL` order.
///
/// This is the deterministic prediction function the explainability engine
/// decomposes; it is exactly what the Monte Carlo rates converge to as the
/// trial count grows.
pub fn predict_overall_success(features: &[f64], experiment: &ExperimentDef) -> f64 {
    let at = |kind: TraitKind| features.get(kind.index()).copied().unwrap_or(0.0);
    let traits = LatentTraits {
        trust: at(TraitKind::Trust),
        capability: at(TraitKind::Capability),
        motor_ability: at(TraitKind::MotorAbility),
        digital_literacy: at(TraitKind::DigitalLiteracy),
        domain_expertise: at(TraitKind::DomainExpertise),
        time_availability: at(TraitKind::TimeAvailability),
    };
    attempt_probability(&traits, experiment.friction)
        * success_probability(&traits, experiment.difficulty)
}

/// Run the Monte Carlo simulation for one group under one experiment.
pub fn simulate(
    group: &PopulationGroup,
    experiment: &ExperimentDef,
    trials_per_synth: usize,
    seed: u64,
) -> Result<SimulationResult, CoreError> {
    experiment.validate()?;
    if trials_per_synth == 0 {
        return Err(CoreError::config("trials per synth must be > 0"));
    }
    if group.is_empty() {
        return Err(CoreError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let outcomes: Vec<OutcomeVector> = group
        .synths
        .par_iter()
        .enumerate()
        .map(|(i, synth)| {
            let mut rng = StdRng::seed_from_u64(mix_seed(seed, i as u64));
            simulate_synth(&synth.traits, experiment, trials_per_synth, &mut rng)
        })
        .collect();

    let aggregates = aggregate(&outcomes);

    info!(
        group = group.name.as_str(),
        experiment = experiment.name.as_str(),
        trials = trials_per_synth,
        seed,
        "simulation complete"
    );

    Ok(SimulationResult {
        group_name: group.name.clone(),
        experiment: experiment.clone(),
        trials_per_synth,
        seed,
        created_at: Utc::now(),
        outcomes,
        aggregates,
    })
}

fn simulate_synth(
    traits: &LatentTraits,
    experiment: &ExperimentDef,
    trials: usize,
    rng: &mut StdRng,
) -> OutcomeVector {
    let p_attempt = attempt_probability(traits, experiment.friction);
    let p_success = success_probability(traits, experiment.difficulty);

    let mut attempts = 0usize;
    let mut successes = 0usize;
    for _ in 0..trials {
        if rng.gen_bool(p_attempt) {
            attempts += 1;
            if rng.gen_bool(p_success) {
                successes += 1;
            }
        }
    }

    let t = trials as f64;
    OutcomeVector {
        attempt_rate: attempts as f64 / t,
        success_rate: successes as f64 / t,
        fail_rate: (attempts - successes) as f64 / t,
    }
}

fn aggregate(outcomes: &[OutcomeVector]) -> Aggregates {
    let attempt: Vec<f64> = outcomes.iter().map(|o| o.attempt_rate).collect();
    let success: Vec<f64> = outcomes.iter().map(|o| o.success_rate).collect();
    let fail: Vec<f64> = outcomes.iter().map(|o| o.fail_rate).collect();

    let mut quadrants = QuadrantCounts {
        engaged_succeeding: 0,
        engaged_struggling: 0,
        reluctant_capable: 0,
        disengaged: 0,
    };
    for o in outcomes {
        let engaged = o.attempt_rate >= 0.5;
        let succeeding = if o.attempt_rate > 0.0 {
            o.success_rate / o.attempt_rate >= 0.5
        } else {
            false
        };
        match (engaged, succeeding) {
            (true, true) => quadrants.engaged_succeeding += 1,
            (true, false) => quadrants.engaged_struggling += 1,
            (false, true) => quadrants.reluctant_capable += 1,
            (false, false) => quadrants.disengaged += 1,
        }
    }

    let stats = |values: &[f64]| {
        let (mean, variance) = mean_variance(values);
        RateStats { mean, variance }
    };

    Aggregates {
        attempt: stats(&attempt),
        success: stats(&success),
        fail: stats(&fail),
        quadrants,
    }
}
