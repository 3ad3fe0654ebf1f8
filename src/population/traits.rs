//! Latent trait derivation.
//!
//! Each latent trait is a weighted sum of min-max-normalized observables
//! plus a small bounded perturbation, clamped to [0,1]. The weights are
//! crate constants rather than configuration so trait values stay
//! comparable across population groups generated under different configs.
//!
//! Derivation is pure: the same observables and the same RNG seed always
//! produce the same traits, and re-deriving is idempotent.

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::{DisabilityCategory, LatentTraits, Observables};
use crate::error::CoreError;
use crate::math::{clamp_unit, stats::minmax};

/// Half-width of the uniform perturbation added to every trait.
const PERTURBATION: f64 = 0.05;

/// Age range used for min-max normalization of the band midpoint.
const AGE_MIN_YEARS: f64 = 21.0;
const AGE_MAX_YEARS: f64 = 70.0;

// Per-trait blend weights. Each row sums to 1.0 so the un-perturbed value
// stays in [0,1] by construction.
const TRUST_W: [f64; 4] = [0.30, 0.30, 0.25, 0.15]; // youth, education, expertise, cognition
const CAPABILITY_W: [f64; 4] = [0.35, 0.25, 0.25, 0.15]; // education, youth, cognition, expertise
const MOTOR_W: [f64; 2] = [0.65, 0.35]; // motor integrity, youth
const DIGITAL_W: [f64; 4] = [0.40, 0.30, 0.20, 0.10]; // youth, education, expertise, vision
const EXPERTISE_W: [f64; 2] = [0.80, 0.20]; // declared expertise, education
const TIME_W: [f64; 2] = [0.70, 0.30]; // free of care load, age

/// Derive the full latent trait set from one synth's observables.
pub fn derive(observables: &Observables, rng: &mut StdRng) -> Result<LatentTraits, CoreError> {
    let expertise = observables.declared_expertise;
    if !expertise.is_finite() || !(0.0..=1.0).contains(&expertise) {
        return Err(CoreError::validation(format!(
            "declared expertise must be in [0,1], got {expertise}"
        )));
    }

    let age_n = minmax(observables.age.midpoint_years(), AGE_MIN_YEARS, AGE_MAX_YEARS);
    let youth = 1.0 - age_n;
    let edu_n = observables.education.rank() as f64 / 4.0;
    let care = observables.family.care_load();

    let vision = 1.0 - observables.severity(DisabilityCategory::Visual).penalty();
    let motor = 1.0 - observables.severity(DisabilityCategory::Motor).penalty();
    let cognition = 1.0 - observables.severity(DisabilityCategory::Cognitive).penalty();

    let mut perturb = || rng.gen_range(-PERTURBATION..=PERTURBATION);

    let trust = TRUST_W[0] * youth
        + TRUST_W[1] * edu_n
        + TRUST_W[2] * expertise
        + TRUST_W[3] * cognition
        + perturb();
    let capability = CAPABILITY_W[0] * edu_n
        + CAPABILITY_W[1] * youth
        + CAPABILITY_W[2] * cognition
        + CAPABILITY_W[3] * expertise
        + perturb();
    let motor_ability = MOTOR_W[0] * motor + MOTOR_W[1] * youth + perturb();
    let digital_literacy = DIGITAL_W[0] * youth
        + DIGITAL_W[1] * edu_n
        + DIGITAL_W[2] * expertise
        + DIGITAL_W[3] * vision
        + perturb();
    let domain_expertise = EXPERTISE_W[0] * expertise + EXPERTISE_W[1] * edu_n + perturb();
    let time_availability = TIME_W[0] * (1.0 - care) + TIME_W[1] * age_n + perturb();

    Ok(LatentTraits {
        trust: clamp_unit(trust),
        capability: clamp_unit(capability),
        motor_ability: clamp_unit(motor_ability),
        digital_literacy: clamp_unit(digital_literacy),
        domain_expertise: clamp_unit(domain_expertise),
        time_availability: clamp_unit(time_availability),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use crate::domain::{AgeBand, Education, FamilyComposition, Severity};

    fn base_observables() -> Observables {
        Observables {
            age: AgeBand::From35To44,
            education: Education::Bachelor,
            family: FamilyComposition::Couple,
            severities: [Severity::None; 4],
            declared_expertise: 0.6,
        }
    }

    #[test]
    fn derivation_is_deterministic_given_the_seed() {
        let obs = base_observables();
        let a = derive(&obs, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = derive(&obs, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_traits_stay_in_unit_interval() {
        let mut obs = base_observables();
        obs.severities = [Severity::Total; 4];
        obs.declared_expertise = 1.0;
        for seed in 0..50 {
            let t = derive(&obs, &mut StdRng::seed_from_u64(seed)).unwrap();
            for v in t.as_array() {
                assert!((0.0..=1.0).contains(&v), "trait out of range: {v}");
            }
        }
    }

    #[test]
    fn total_motor_severity_suppresses_motor_ability() {
        let healthy = derive(&base_observables(), &mut StdRng::seed_from_u64(1)).unwrap();

        let mut impaired_obs = base_observables();
        impaired_obs.severities[DisabilityCategory::Motor.index()] = Severity::Total;
        let impaired = derive(&impaired_obs, &mut StdRng::seed_from_u64(1)).unwrap();

        assert!(impaired.motor_ability < healthy.motor_ability - 0.5);
    }

    #[test]
    fn malformed_expertise_is_a_validation_error() {
        let mut obs = base_observables();
        obs.declared_expertise = f64::NAN;
        let err = derive(&obs, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn heavy_care_load_reduces_time_availability() {
        let mut single_parent = base_observables();
        single_parent.family = FamilyComposition::SingleParent;
        let loaded = derive(&single_parent, &mut StdRng::seed_from_u64(4)).unwrap();
        let free = derive(&base_observables(), &mut StdRng::seed_from_u64(4)).unwrap();
        assert!(loaded.time_availability < free.time_availability);
    }
}
