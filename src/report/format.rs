//! Formatted terminal output for every subcommand.

use crate::domain::{ExperimentDef, SimulationResult};
use crate::explain::{GlobalImportance, LocalExplanation, PartialDependence};
use crate::outlier::OutlierReport;
use crate::report::PopulationSummary;
use crate::segment::hierarchy::Dendrogram;
use crate::segment::kmeans::ClusterAssignment;
use crate::segment::selection::ElbowReport;

/// Format the population header plus demographic histograms.
pub fn format_population(summary: &PopulationSummary) -> String {
    let mut out = String::new();

    out.push_str("=== synthpop - Synthetic Population ===\n");
    out.push_str(&format!(
        "Group: {} | n={} | seed={}\n",
        summary.name, summary.size, summary.seed
    ));
    out.push_str(&format!(
        "Disability prevalence: {:.1}% | mean declared expertise: {:.3}\n",
        summary.disability_prevalence * 100.0,
        summary.mean_declared_expertise
    ));

    out.push_str("\nAge:\n");
    for bucket in &summary.age_histogram {
        out.push_str(&format!("  {:<16} {:>6}\n", bucket.label, bucket.count));
    }
    out.push_str("\nEducation:\n");
    for bucket in &summary.education_histogram {
        out.push_str(&format!("  {:<16} {:>6}\n", bucket.label, bucket.count));
    }
    if !summary.severity_histogram.is_empty() {
        out.push_str("\nDisabilities:\n");
        for bucket in &summary.severity_histogram {
            out.push_str(&format!("  {:<32} {:>6}\n", bucket.label, bucket.count));
        }
    }
    out.push('\n');

    out
}

/// Format simulation aggregates and the outcome quadrants.
pub fn format_simulation(result: &SimulationResult) -> String {
    let mut out = String::new();
    let agg = &result.aggregates;

    out.push_str(&format!(
        "Simulation: {} trials/synth | seed={} | {}\n",
        result.trials_per_synth,
        result.seed,
        format_experiment(&result.experiment)
    ));
    out.push_str(&format!(
        "{:<10} {:>10} {:>10}\n",
        "rate", "mean", "stddev"
    ));
    for (label, stats) in [
        ("attempt", agg.attempt),
        ("success", agg.success),
        ("fail", agg.fail),
    ] {
        out.push_str(&format!(
            "{:<10} {:>10.4} {:>10.4}\n",
            label,
            stats.mean,
            stats.variance.sqrt()
        ));
    }

    let q = agg.quadrants;
    out.push_str("\nQuadrants:\n");
    out.push_str(&format!("  engaged succeeding  {:>6}\n", q.engaged_succeeding));
    out.push_str(&format!("  engaged struggling  {:>6}\n", q.engaged_struggling));
    out.push_str(&format!("  reluctant capable   {:>6}\n", q.reluctant_capable));
    out.push_str(&format!("  disengaged          {:>6}\n", q.disengaged));
    out.push('\n');

    out
}

fn format_experiment(experiment: &ExperimentDef) -> String {
    format!(
        "{} (difficulty={:.2}, friction={:.2})",
        experiment.name, experiment.difficulty, experiment.friction
    )
}

/// Format the k sweep plus per-cluster profiles of the chosen fit.
pub fn format_segments(elbow: &ElbowReport, assignment: &ClusterAssignment) -> String {
    let mut out = String::new();

    out.push_str("k sweep:\n");
    for diag in &elbow.per_k {
        let chosen = if diag.k == elbow.recommended_k { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} k={:<3} inertia={:>10.3} silhouette={:>7.4}\n",
            diag.k, diag.inertia, diag.silhouette
        ));
    }

    out.push_str(&format!(
        "\nClusters (k={}, silhouette={:.4}):\n",
        assignment.k, assignment.silhouette
    ));
    out.push_str(&format!(
        "{:<8} {:>6} {:>10} {:>10} {:>10}\n",
        "cluster", "size", "attempt", "success", "fail"
    ));
    for profile in &assignment.profiles {
        out.push_str(&format!(
            "{:<8} {:>6} {:>10.4} {:>10.4} {:>10.4}\n",
            profile.cluster,
            profile.size,
            profile.mean_attempt_rate,
            profile.mean_success_rate,
            profile.mean_fail_rate
        ));
    }
    out.push('\n');

    out
}

/// Format the hierarchical cut candidates.
pub fn format_dendrogram(dendrogram: &Dendrogram) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Hierarchical ({:?} linkage), cut candidates:\n",
        dendrogram.linkage
    ));
    for cut in &dendrogram.cuts {
        let chosen = if cut.k == dendrogram.suggested_k { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} k={:<3} silhouette={:>7.4}\n",
            cut.k, cut.silhouette
        ));
    }
    out.push('\n');

    out
}

/// Format the top-N anomaly ranking.
pub fn format_outliers(report: &OutlierReport, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Outliers: contamination={:.3} | threshold={:.4} | flagged={}\n",
        report.contamination,
        report.threshold,
        report.flagged().count()
    ));
    out.push_str(&format!("{:<8} {:>8} {:<8}\n", "synth", "score", "flagged"));
    for score in report.ranked().into_iter().take(top_n) {
        out.push_str(&format!(
            "{:<8} {:>8.4} {:<8}\n",
            score.synth_id,
            score.score,
            if score.is_outlier { "yes" } else { "" }
        ));
    }
    out.push('\n');

    out
}

/// Format the global feature-importance ranking.
pub fn format_importance(importance: &GlobalImportance) -> String {
    let mut out = String::new();

    let method = if importance.method.is_approximate() {
        " (sampled)"
    } else {
        ""
    };
    out.push_str(&format!("Global importance{method}:\n"));
    for item in &importance.ranked {
        out.push_str(&format!(
            "  {:<18} {:>8.5}\n",
            item.feature.display_name(),
            item.mean_abs_contribution
        ));
    }
    out.push('\n');

    out
}

/// Format one synth's Shapley breakdown.
pub fn format_local(explanation: &LocalExplanation) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Synth {}: prediction={:.4} (baseline {:.4})\n",
        explanation.synth_id, explanation.prediction, explanation.baseline
    ));
    for contribution in &explanation.contributions {
        out.push_str(&format!(
            "  {:<18} value={:.3} contribution={:>+8.5}\n",
            contribution.feature.display_name(),
            contribution.value,
            contribution.contribution
        ));
    }
    out.push('\n');

    out
}

/// Format a partial-dependence curve as a two-column table.
pub fn format_partial_dependence(pd: &PartialDependence) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Partial dependence of overall success on {}:\n",
        pd.feature.display_name()
    ));
    out.push_str(&format!("{:>8} {:>12}\n", "value", "mean pred"));
    for point in &pd.points {
        out.push_str(&format!(
            "{:>8.3} {:>12.4}\n",
            point.value, point.mean_prediction
        ));
    }
    out.push('\n');

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::report::population_summary;
    use crate::sim::simulate;

    fn small_run() -> (crate::domain::PopulationGroup, SimulationResult) {
        let group = generate(&DistributionConfig::default(), "g", 60, 5).unwrap();
        let experiment = ExperimentDef {
            name: "baseline".to_string(),
            difficulty: 0.5,
            friction: 0.3,
        };
        let result = simulate(&group, &experiment, 50, 9).unwrap();
        (group, result)
    }

    #[test]
    fn population_output_names_the_group() {
        let (group, _) = small_run();
        let text = format_population(&population_summary(&group));
        assert!(text.contains("Group: g | n=60 | seed=5"));
        assert!(text.contains("Age:"));
    }

    #[test]
    fn simulation_output_has_all_three_rates() {
        let (_, result) = small_run();
        let text = format_simulation(&result);
        assert!(text.contains("attempt"));
        assert!(text.contains("success"));
        assert!(text.contains("fail"));
        assert!(text.contains("Quadrants:"));
    }
}
