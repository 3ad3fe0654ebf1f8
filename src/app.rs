//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - generates the population and runs the simulation
//! - runs the requested analysis engine
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ExplainArgs, OutlierArgs, SegmentArgs, SimArgs};
use crate::error::CoreError;
use crate::report::{ChartBundle, format};
use crate::segment::Feature;

pub mod pipeline;

/// Entry point for the `synthpop` binary.
pub fn run() -> Result<(), CoreError> {
    init_tracing();

    // We want `synthpop` and `synthpop -n 200` to behave like
    // `synthpop run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while keeping the bare invocation useful.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Segment(args) => handle_segment(args),
        Command::Outliers(args) => handle_outliers(args),
        Command::Explain(args) => handle_explain(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for the reports.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn empty_bundle(run: &pipeline::RunOutput) -> ChartBundle {
    ChartBundle {
        population: run.summary.clone(),
        simulation: run.result.clone(),
        elbow: None,
        clusters: None,
        dendrogram: None,
        outliers: None,
        importance: None,
        local_explanation: None,
        partial_dependence: None,
    }
}

fn maybe_export(args: &SimArgs, bundle: &ChartBundle) -> Result<(), CoreError> {
    if let Some(path) = &args.export {
        crate::io::export::write_bundle_json(path, bundle)?;
    }
    Ok(())
}

fn handle_run(args: SimArgs) -> Result<(), CoreError> {
    let run = pipeline::run_pipeline(&args)?;

    print!("{}", format::format_population(&run.summary));
    print!("{}", format::format_simulation(&run.result));

    maybe_export(&args, &empty_bundle(&run))
}

fn handle_segment(args: SegmentArgs) -> Result<(), CoreError> {
    let run = pipeline::run_pipeline(&args.sim)?;
    let features = Feature::default_set();

    let elbow = crate::segment::selection::elbow(
        &run.group,
        &run.result,
        &features,
        (args.k_min, args.k_max),
        args.sim.sim_seed,
    )?;
    let k = args.clusters.unwrap_or(elbow.recommended_k);
    let assignment =
        crate::segment::kmeans::kmeans(&run.group, &run.result, &features, k, args.sim.sim_seed)?;
    let dendrogram =
        crate::segment::hierarchy::hierarchical(&run.group, &run.result, &features, args.linkage)?;

    print!("{}", format::format_segments(&elbow, &assignment));
    print!("{}", format::format_dendrogram(&dendrogram));

    let mut bundle = empty_bundle(&run);
    bundle.elbow = Some(elbow);
    bundle.clusters = Some(assignment);
    bundle.dendrogram = Some(dendrogram);
    maybe_export(&args.sim, &bundle)
}

fn handle_outliers(args: OutlierArgs) -> Result<(), CoreError> {
    let run = pipeline::run_pipeline(&args.sim)?;
    let features = Feature::default_set();

    let report = crate::outlier::detect(
        &run.group,
        &run.result,
        &features,
        args.contamination,
        args.sim.sim_seed,
    )?;

    print!("{}", format::format_outliers(&report, args.top));

    let mut bundle = empty_bundle(&run);
    bundle.outliers = Some(report);
    maybe_export(&args.sim, &bundle)
}

fn handle_explain(args: ExplainArgs) -> Result<(), CoreError> {
    let run = pipeline::run_pipeline(&args.sim)?;

    let importance =
        crate::explain::global_importance(&run.group, &run.result, args.sim.sim_seed)?;
    print!("{}", format::format_importance(&importance));

    let local = match args.synth {
        Some(synth_id) => {
            let explanation = crate::explain::local_explanation(
                &run.group,
                &run.result,
                synth_id,
                args.sim.sim_seed,
            )?;
            print!("{}", format::format_local(&explanation));
            Some(explanation)
        }
        None => None,
    };

    let pd =
        crate::explain::partial::partial_dependence(&run.group, &run.result, args.feature, args.grid)?;
    print!("{}", format::format_partial_dependence(&pd));

    let mut bundle = empty_bundle(&run);
    bundle.importance = Some(importance);
    bundle.local_explanation = local;
    bundle.partial_dependence = Some(pd);
    maybe_export(&args.sim, &bundle)
}

/// Rewrite argv so `synthpop` defaults to `synthpop run`.
///
/// Rules:
/// - `synthpop`                      -> `synthpop run`
/// - `synthpop -n 200 ...`           -> `synthpop run -n 200 ...`
/// - `synthpop --help/--version/-h`  -> unchanged (show top-level help)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "segment" | "outliers" | "explain");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
