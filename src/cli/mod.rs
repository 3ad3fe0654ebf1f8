//! Command-line parsing for the synthetic-population simulator.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the generation/analysis code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{ExpertiseShape, TraitKind};
use crate::segment::hierarchy::Linkage;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "synthpop",
    version,
    about = "Synthetic persona population generator and outcome simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a population, simulate an experiment, and print the summary.
    Run(SimArgs),
    /// Segment simulated synths: k sweep, K-means profiles, and a
    /// hierarchical dendrogram.
    Segment(SegmentArgs),
    /// Rank behavioral outliers with an isolation forest.
    Outliers(OutlierArgs),
    /// Explain predictions: global importance, an optional per-synth
    /// breakdown, and a partial-dependence curve.
    Explain(ExplainArgs),
}

/// Common options shared by every subcommand: population generation plus
/// one simulated experiment.
#[derive(Debug, Parser, Clone)]
pub struct SimArgs {
    /// Number of synths to generate.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub population: usize,

    /// Random seed for population generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Group name used in output and exports.
    #[arg(long, default_value = "default")]
    pub group: String,

    /// Overall disability prevalence in [0, 1].
    #[arg(long, default_value_t = 0.15)]
    pub disability_rate: f64,

    /// Skew of the declared-expertise distribution.
    #[arg(long, value_enum, default_value_t = ExpertiseShape::Medium)]
    pub expertise: ExpertiseShape,

    /// Experiment name.
    #[arg(long, default_value = "baseline")]
    pub experiment: String,

    /// Experiment difficulty in [0, 1] (pressure on success).
    #[arg(long, default_value_t = 0.5)]
    pub difficulty: f64,

    /// Experiment friction in [0, 1] (pressure on attempting).
    #[arg(long, default_value_t = 0.3)]
    pub friction: f64,

    /// Monte Carlo trials per synth.
    #[arg(long, default_value_t = 1000)]
    pub trials: usize,

    /// Random seed for the simulation (independent of the population seed).
    #[arg(long, default_value_t = 7)]
    pub sim_seed: u64,

    /// Export the full result bundle to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for the segmentation subcommand.
#[derive(Debug, Parser)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    /// Fixed cluster count. When omitted, the k sweep picks one.
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Lowest k in the sweep.
    #[arg(long, default_value_t = 2)]
    pub k_min: usize,

    /// Highest k in the sweep.
    #[arg(long, default_value_t = 8)]
    pub k_max: usize,

    /// Linkage criterion for the hierarchical dendrogram.
    #[arg(long, value_enum, default_value_t = Linkage::Average)]
    pub linkage: Linkage,
}

/// Options for the outlier subcommand.
#[derive(Debug, Parser)]
pub struct OutlierArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    /// Expected outlier fraction in (0, 0.5].
    #[arg(long, default_value_t = 0.05)]
    pub contamination: f64,

    /// Show the top-N most anomalous synths.
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Options for the explainability subcommand.
#[derive(Debug, Parser)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub sim: SimArgs,

    /// Also print a Shapley breakdown for this synth id.
    #[arg(long)]
    pub synth: Option<u32>,

    /// Trait to sweep for the partial-dependence curve.
    #[arg(long, value_enum, default_value_t = TraitKind::Trust)]
    pub feature: TraitKind,

    /// Grid resolution of the partial-dependence sweep.
    #[arg(long, default_value_t = 20)]
    pub grid: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_defaults() {
        let cli = Cli::try_parse_from(["synthpop", "run"]).unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.population, 500);
                assert_eq!(args.seed, 42);
                assert_eq!(args.trials, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_segment_flags() {
        let cli = Cli::try_parse_from([
            "synthpop", "segment", "-n", "200", "-k", "4", "--linkage", "complete",
        ])
        .unwrap();
        match cli.command {
            Command::Segment(args) => {
                assert_eq!(args.sim.population, 200);
                assert_eq!(args.clusters, Some(4));
                assert_eq!(args.linkage, Linkage::Complete);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_explain_feature() {
        let cli = Cli::try_parse_from([
            "synthpop",
            "explain",
            "--feature",
            "digital-literacy",
            "--synth",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Explain(args) => {
                assert_eq!(args.feature, TraitKind::DigitalLiteracy);
                assert_eq!(args.synth, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
