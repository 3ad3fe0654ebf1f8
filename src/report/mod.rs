//! Chart-shaped payloads and formatted terminal output.
//!
//! The presentation and LLM-insight collaborators never see engine
//! internals; they consume the query functions here, which turn immutable
//! engine outputs into plain serializable payloads. Formatting code lives
//! in one place so output changes stay localized.

pub mod format;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AgeBand, DisabilityCategory, Education, PopulationGroup, Severity, SimulationResult,
};
use crate::explain::{GlobalImportance, LocalExplanation, PartialDependence};
use crate::outlier::OutlierReport;
use crate::segment::hierarchy::Dendrogram;
use crate::segment::kmeans::ClusterAssignment;
use crate::segment::selection::ElbowReport;

/// Histogram bucket for categorical charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub label: String,
    pub count: usize,
}

/// Demographic summary of one population group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub name: String,
    pub size: usize,
    pub seed: u64,
    pub disability_prevalence: f64,
    pub age_histogram: Vec<HistogramBucket>,
    pub education_histogram: Vec<HistogramBucket>,
    /// Severity histogram using per-category domain labels
    /// ("blindness", "deafness", ...), affected synths only.
    pub severity_histogram: Vec<HistogramBucket>,
    pub mean_declared_expertise: f64,
}

/// Summarize a group for charting.
pub fn population_summary(group: &PopulationGroup) -> PopulationSummary {
    let n = group.synths.len();

    let age_histogram = AgeBand::ALL
        .iter()
        .map(|band| HistogramBucket {
            label: band.display_name().to_string(),
            count: group
                .synths
                .iter()
                .filter(|s| s.observables.age == *band)
                .count(),
        })
        .collect();

    let education_histogram = Education::ALL
        .iter()
        .map(|band| HistogramBucket {
            label: band.display_name().to_string(),
            count: group
                .synths
                .iter()
                .filter(|s| s.observables.education == *band)
                .count(),
        })
        .collect();

    let mut severity_histogram: Vec<HistogramBucket> = Vec::new();
    for category in DisabilityCategory::ALL {
        for severity in Severity::ALL {
            if severity == Severity::None {
                continue;
            }
            let count = group
                .synths
                .iter()
                .filter(|s| s.observables.severity(category) == severity)
                .count();
            if count > 0 {
                severity_histogram.push(HistogramBucket {
                    label: format!(
                        "{}: {}",
                        category.display_name(),
                        category.domain_label(severity)
                    ),
                    count,
                });
            }
        }
    }

    let affected = group
        .synths
        .iter()
        .filter(|s| s.observables.has_disability())
        .count();
    let expertise_sum: f64 = group
        .synths
        .iter()
        .map(|s| s.observables.declared_expertise)
        .sum();

    PopulationSummary {
        name: group.name.clone(),
        size: n,
        seed: group.seed,
        disability_prevalence: affected as f64 / n.max(1) as f64,
        age_histogram,
        education_histogram,
        severity_histogram,
        mean_declared_expertise: expertise_sum / n.max(1) as f64,
    }
}

/// Everything one full run computed, as a single exportable payload.
///
/// The consuming collaborators (chart renderer, LLM insight writer,
/// persistence) each take the slices they need; none of them can reach
/// back into the engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartBundle {
    pub population: PopulationSummary,
    pub simulation: SimulationResult,
    pub elbow: Option<ElbowReport>,
    pub clusters: Option<ClusterAssignment>,
    pub dendrogram: Option<Dendrogram>,
    pub outliers: Option<OutlierReport>,
    pub importance: Option<GlobalImportance>,
    pub local_explanation: Option<LocalExplanation>,
    pub partial_dependence: Option<PartialDependence>,
}
