//! Shared "generate + simulate" pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! distribution config -> population generation -> Monte Carlo simulation
//!
//! The subcommand handlers then focus on their own analysis and printing.

use crate::cli::SimArgs;
use crate::config::DistributionConfig;
use crate::domain::{ExperimentDef, PopulationGroup, SimulationResult};
use crate::error::CoreError;
use crate::population::generate;
use crate::report::{PopulationSummary, population_summary};
use crate::sim::simulate;

/// Outputs of the shared pipeline stage.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub group: PopulationGroup,
    pub result: SimulationResult,
    pub summary: PopulationSummary,
}

/// Build the distribution config a subcommand asked for.
pub fn config_from_args(args: &SimArgs) -> DistributionConfig {
    DistributionConfig::default()
        .with_disability_rate(args.disability_rate)
        .with_expertise_shape(args.expertise)
}

/// Execute generation and simulation for one subcommand invocation.
pub fn run_pipeline(args: &SimArgs) -> Result<RunOutput, CoreError> {
    let config = config_from_args(args);
    let group = generate(&config, &args.group, args.population, args.seed)?;

    let experiment = ExperimentDef {
        name: args.experiment.clone(),
        difficulty: args.difficulty,
        friction: args.friction,
    };
    let result = simulate(&group, &experiment, args.trials, args.sim_seed)?;

    let summary = population_summary(&group);
    Ok(RunOutput {
        group,
        result,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> SimArgs {
        let mut argv = vec!["sim"];
        argv.extend_from_slice(extra);
        SimArgs::parse_from(argv)
    }

    #[test]
    fn pipeline_is_reproducible_from_args() {
        let a = args(&["-n", "80", "--trials", "50"]);
        let first = run_pipeline(&a).unwrap();
        let second = run_pipeline(&a).unwrap();
        assert_eq!(first.group.synths, second.group.synths);
        assert_eq!(first.result.outcomes, second.result.outcomes);
    }

    #[test]
    fn full_run_reproduces_identical_cluster_assignments() {
        // Default flags: 500 synths (seed 42), 1000 trials (seed 7).
        let a = args(&[]);
        let features = crate::segment::Feature::default_set();

        let cluster = |args: &SimArgs| {
            let run = run_pipeline(args).unwrap();
            crate::segment::kmeans::kmeans(&run.group, &run.result, &features, 4, args.sim_seed)
                .unwrap()
        };

        let first = cluster(&a);
        let second = cluster(&a);
        assert_eq!(first, second);
        assert_eq!(first.k, 4);
        assert_eq!(first.assignments.len(), 500);
    }

    #[test]
    fn analysis_engines_run_on_pipeline_output() {
        let a = args(&["-n", "120", "--trials", "100"]);
        let run = run_pipeline(&a).unwrap();
        let features = crate::segment::Feature::default_set();

        let elbow =
            crate::segment::selection::elbow(&run.group, &run.result, &features, (2, 5), 7)
                .unwrap();
        assert!((2..=5).contains(&elbow.recommended_k));

        let assignment = crate::segment::kmeans::kmeans(
            &run.group,
            &run.result,
            &features,
            elbow.recommended_k,
            7,
        )
        .unwrap();
        assert_eq!(assignment.assignments.len(), 120);

        let outliers =
            crate::outlier::detect(&run.group, &run.result, &features, 0.05, 7).unwrap();
        assert_eq!(outliers.scores.len(), 120);
        assert!(outliers.flagged().count() > 0);

        let importance = crate::explain::global_importance(&run.group, &run.result, 7).unwrap();
        assert_eq!(importance.ranked.len(), 6);
    }

    #[test]
    fn pipeline_rejects_bad_difficulty() {
        let a = args(&["-n", "20", "--trials", "10", "--difficulty", "1.5"]);
        let err = run_pipeline(&a).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }
}
