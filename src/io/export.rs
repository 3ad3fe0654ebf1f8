//! Export the computed result bundle to JSON.
//!
//! The export is meant to be easy to consume from notebooks, chart renderers,
//! or downstream scripts; everything a run computed lands in one file.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::CoreError;
use crate::report::ChartBundle;

/// Write the full result bundle to a JSON file.
pub fn write_bundle_json(path: &Path, bundle: &ChartBundle) -> Result<(), CoreError> {
    let file = File::create(path).map_err(|e| {
        CoreError::Export(format!(
            "failed to create export file '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), bundle)
        .map_err(|e| CoreError::Export(format!("failed to serialize result bundle: {e}")))?;
    Ok(())
}

/// Read a previously exported result bundle.
pub fn read_bundle_json(path: &Path) -> Result<ChartBundle, CoreError> {
    let file = File::open(path).map_err(|e| {
        CoreError::Export(format!(
            "failed to open export file '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        CoreError::Export(format!(
            "failed to parse result bundle '{}': {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistributionConfig;
    use crate::domain::ExperimentDef;
    use crate::population::generate;
    use crate::report::population_summary;
    use crate::sim::simulate;

    #[test]
    fn bundle_round_trips_through_json() {
        let group = generate(&DistributionConfig::default(), "g", 40, 3).unwrap();
        let experiment = ExperimentDef {
            name: "baseline".to_string(),
            difficulty: 0.4,
            friction: 0.2,
        };
        let result = simulate(&group, &experiment, 30, 11).unwrap();
        let bundle = ChartBundle {
            population: population_summary(&group),
            simulation: result,
            elbow: None,
            clusters: None,
            dendrogram: None,
            outliers: None,
            importance: None,
            local_explanation: None,
            partial_dependence: None,
        };

        let dir = std::env::temp_dir();
        let path = dir.join("synthpop_bundle_test.json");
        write_bundle_json(&path, &bundle).unwrap();
        let back = read_bundle_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.population.size, 40);
        assert_eq!(back.simulation.trials_per_synth, 30);
        assert_eq!(
            back.simulation.aggregates.attempt.mean,
            bundle.simulation.aggregates.attempt.mean
        );
    }

    #[test]
    fn read_missing_file_reports_export_error() {
        let err = read_bundle_json(Path::new("/nonexistent/bundle.json")).unwrap_err();
        assert!(matches!(err, CoreError::Export(_)));
    }
}
