//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they
//! can be:
//!
//! - used in-memory during simulation and analysis
//! - exported to JSON for the charting / insight collaborators
//! - reloaded later for comparisons across runs
//!
//! Population groups and simulation results are treated as immutable once
//! constructed: re-running a simulation produces a *new* `SimulationResult`
//! rather than mutating an existing one, so earlier runs stay auditable.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::DistributionConfig;

/// Age band of a synth (sampled from configured weights).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    From18To24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    From65Plus,
}

impl AgeBand {
    pub const ALL: [AgeBand; 6] = [
        AgeBand::From18To24,
        AgeBand::From25To34,
        AgeBand::From35To44,
        AgeBand::From45To54,
        AgeBand::From55To64,
        AgeBand::From65Plus,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            AgeBand::From18To24 => "18-24",
            AgeBand::From25To34 => "25-34",
            AgeBand::From35To44 => "35-44",
            AgeBand::From45To54 => "45-54",
            AgeBand::From55To64 => "55-64",
            AgeBand::From65Plus => "65+",
        }
    }

    /// Band midpoint in years (70 stands in for the open-ended 65+ band).
    pub fn midpoint_years(self) -> f64 {
        match self {
            AgeBand::From18To24 => 21.0,
            AgeBand::From25To34 => 29.5,
            AgeBand::From35To44 => 39.5,
            AgeBand::From45To54 => 49.5,
            AgeBand::From55To64 => 59.5,
            AgeBand::From65Plus => 70.0,
        }
    }

    /// Highest education band attainable by this age band.
    ///
    /// Postgraduate degrees are not reachable in the youngest band; this is
    /// the cross-field consistency rule applied during education sampling.
    pub fn max_education(self) -> Education {
        match self {
            AgeBand::From18To24 => Education::Bachelor,
            _ => Education::Postgraduate,
        }
    }
}

/// Education band of a synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Education {
    BelowSecondary,
    Secondary,
    Vocational,
    Bachelor,
    Postgraduate,
}

impl Education {
    pub const ALL: [Education; 5] = [
        Education::BelowSecondary,
        Education::Secondary,
        Education::Vocational,
        Education::Bachelor,
        Education::Postgraduate,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Education::BelowSecondary => "below secondary",
            Education::Secondary => "secondary",
            Education::Vocational => "vocational",
            Education::Bachelor => "bachelor",
            Education::Postgraduate => "postgraduate",
        }
    }

    /// Ordinal rank used for min-max normalization (0 = lowest band).
    pub fn rank(self) -> usize {
        Education::ALL.iter().position(|e| *e == self).unwrap_or(0)
    }
}

/// Family composition of a synth's household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyComposition {
    Single,
    Couple,
    CoupleWithChildren,
    SingleParent,
    Multigenerational,
}

impl FamilyComposition {
    pub const ALL: [FamilyComposition; 5] = [
        FamilyComposition::Single,
        FamilyComposition::Couple,
        FamilyComposition::CoupleWithChildren,
        FamilyComposition::SingleParent,
        FamilyComposition::Multigenerational,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            FamilyComposition::Single => "single",
            FamilyComposition::Couple => "couple",
            FamilyComposition::CoupleWithChildren => "couple with children",
            FamilyComposition::SingleParent => "single parent",
            FamilyComposition::Multigenerational => "multigenerational",
        }
    }

    /// Caretaking load proxy in [0,1]; higher means less discretionary time.
    pub fn care_load(self) -> f64 {
        match self {
            FamilyComposition::Single => 0.1,
            FamilyComposition::Couple => 0.2,
            FamilyComposition::CoupleWithChildren => 0.6,
            FamilyComposition::SingleParent => 0.9,
            FamilyComposition::Multigenerational => 0.5,
        }
    }
}

/// Disability category tracked per synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabilityCategory {
    Visual,
    Hearing,
    Motor,
    Cognitive,
}

impl DisabilityCategory {
    pub const ALL: [DisabilityCategory; 4] = [
        DisabilityCategory::Visual,
        DisabilityCategory::Hearing,
        DisabilityCategory::Motor,
        DisabilityCategory::Cognitive,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            DisabilityCategory::Visual => "visual",
            DisabilityCategory::Hearing => "hearing",
            DisabilityCategory::Motor => "motor",
            DisabilityCategory::Cognitive => "cognitive",
        }
    }

    pub fn index(self) -> usize {
        DisabilityCategory::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or(0)
    }

    /// Domain-specific label for a severity in this category.
    ///
    /// The generic severity ladder is shared across categories, but the
    /// terminal tiers carry category-specific names (total visual loss is
    /// "blindness"; total motor loss is a severe impairment, not a distinct
    /// condition). Kept as one lookup table so call sites never branch on
    /// category themselves.
    pub fn domain_label(self, severity: Severity) -> &'static str {
        match (self, severity) {
            (_, Severity::None) => "none",
            (_, Severity::Mild) => "mild",
            (_, Severity::Moderate) => "moderate",
            (DisabilityCategory::Visual, Severity::Severe) => "low vision",
            (DisabilityCategory::Visual, Severity::Total) => "blindness",
            (DisabilityCategory::Hearing, Severity::Severe) => "hard of hearing",
            (DisabilityCategory::Hearing, Severity::Total) => "deafness",
            (DisabilityCategory::Motor, Severity::Severe | Severity::Total) => {
                "severe motor impairment"
            }
            (DisabilityCategory::Cognitive, Severity::Severe) => "severe",
            (DisabilityCategory::Cognitive, Severity::Total) => "profound",
        }
    }
}

/// Severity ladder shared across disability categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
    Total,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::None,
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::Total,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Total => "total",
        }
    }

    /// Severity as a [0,1] penalty (None = 0, Total = 1).
    pub fn penalty(self) -> f64 {
        match self {
            Severity::None => 0.0,
            Severity::Mild => 0.25,
            Severity::Moderate => 0.5,
            Severity::Severe => 0.75,
            Severity::Total => 1.0,
        }
    }
}

/// Skew preset for the Beta-distributed declared-expertise attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExpertiseShape {
    /// Mass concentrated near 0 (mostly novices).
    Low,
    /// Symmetric around 0.5.
    Medium,
    /// Mass concentrated near 1 (mostly experts).
    High,
}

impl ExpertiseShape {
    /// Beta(α, β) parameters for this preset.
    pub fn alpha_beta(self) -> (f64, f64) {
        match self {
            ExpertiseShape::Low => (2.0, 5.0),
            ExpertiseShape::Medium => (5.0, 5.0),
            ExpertiseShape::High => (5.0, 2.0),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExpertiseShape::Low => "low",
            ExpertiseShape::Medium => "medium",
            ExpertiseShape::High => "high",
        }
    }
}

/// The fixed set of derived latent behavioral traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    Trust,
    Capability,
    MotorAbility,
    DigitalLiteracy,
    DomainExpertise,
    TimeAvailability,
}

impl TraitKind {
    pub const ALL: [TraitKind; 6] = [
        TraitKind::Trust,
        TraitKind::Capability,
        TraitKind::MotorAbility,
        TraitKind::DigitalLiteracy,
        TraitKind::DomainExpertise,
        TraitKind::TimeAvailability,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            TraitKind::Trust => "trust",
            TraitKind::Capability => "capability",
            TraitKind::MotorAbility => "motor ability",
            TraitKind::DigitalLiteracy => "digital literacy",
            TraitKind::DomainExpertise => "domain expertise",
            TraitKind::TimeAvailability => "time availability",
        }
    }

    pub fn index(self) -> usize {
        TraitKind::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

/// Observable attributes of one synth, sampled directly from the
/// distribution configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observables {
    pub age: AgeBand,
    pub education: Education,
    pub family: FamilyComposition,
    /// Per-category severity, indexed by `DisabilityCategory::index()`.
    /// All `None` when the disability Bernoulli came up negative.
    pub severities: [Severity; 4],
    /// Declared domain expertise in [0,1] (Beta-sampled).
    pub declared_expertise: f64,
}

impl Observables {
    pub fn severity(&self, category: DisabilityCategory) -> Severity {
        self.severities[category.index()]
    }

    pub fn has_disability(&self) -> bool {
        self.severities.iter().any(|s| *s != Severity::None)
    }
}

/// Derived latent traits, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatentTraits {
    pub trust: f64,
    pub capability: f64,
    pub motor_ability: f64,
    pub digital_literacy: f64,
    pub domain_expertise: f64,
    pub time_availability: f64,
}

impl LatentTraits {
    pub fn get(&self, kind: TraitKind) -> f64 {
        match kind {
            TraitKind::Trust => self.trust,
            TraitKind::Capability => self.capability,
            TraitKind::MotorAbility => self.motor_ability,
            TraitKind::DigitalLiteracy => self.digital_literacy,
            TraitKind::DomainExpertise => self.domain_expertise,
            TraitKind::TimeAvailability => self.time_availability,
        }
    }

    /// Trait values in `TraitKind::ALL` order.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.trust,
            self.capability,
            self.motor_ability,
            self.digital_literacy,
            self.domain_expertise,
            self.time_availability,
        ]
    }
}

/// One simulated individual.
///
/// Latent traits are a pure deterministic function of the observables plus
/// the generation seed; re-deriving them is idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synth {
    pub id: u32,
    pub observables: Observables,
    pub traits: LatentTraits,
}

/// A named, immutable collection of synths generated under one
/// `DistributionConfig`.
///
/// The group carries the config and seed it was generated from so any
/// downstream artifact can be traced back to its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationGroup {
    pub name: String,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub config: DistributionConfig,
    pub synths: Vec<Synth>,
}

impl PopulationGroup {
    pub fn len(&self) -> usize {
        self.synths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synths.is_empty()
    }
}

/// Experiment definition driving one Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDef {
    pub name: String,
    /// How hard the task is to complete, in [0,1].
    pub difficulty: f64,
    /// How much up-front resistance the task presents, in [0,1].
    pub friction: f64,
}

impl ExperimentDef {
    /// Reject missing/out-of-range parameters before any trial runs.
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        for (label, v) in [("difficulty", self.difficulty), ("friction", self.friction)] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(crate::error::CoreError::config(format!(
                    "experiment {label} must be in [0,1], got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-synth outcome rates estimated by the Monte Carlo engine.
///
/// `fail_rate` is the attempted-and-not-succeeded fraction, so
/// `success_rate + fail_rate == attempt_rate` and the did-not-try fraction
/// is `1 - attempt_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeVector {
    pub attempt_rate: f64,
    pub success_rate: f64,
    pub fail_rate: f64,
}

/// Mean/variance summary of one rate across the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub mean: f64,
    pub variance: f64,
}

/// Counts of synths per outcome quadrant.
///
/// The quadrants split attempt rate and success-given-attempt at 0.5 each:
/// synths that engage and succeed, engage but struggle, would succeed but
/// rarely engage, and neither engage nor succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantCounts {
    pub engaged_succeeding: usize,
    pub engaged_struggling: usize,
    pub reluctant_capable: usize,
    pub disengaged: usize,
}

/// Population-level aggregates of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub attempt: RateStats,
    pub success: RateStats,
    pub fail: RateStats,
    pub quadrants: QuadrantCounts,
}

/// Output of one Monte Carlo run over one population group.
///
/// Outcome vectors are index-aligned with `PopulationGroup::synths`.
/// Distinct experiment definitions or re-runs produce distinct results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub group_name: String,
    pub experiment: ExperimentDef,
    pub trials_per_synth: usize,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub outcomes: Vec<OutcomeVector>,
    pub aggregates: Aggregates,
}
