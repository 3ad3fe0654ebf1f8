//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observable attribute enums (`AgeBand`, `Education`, `Severity`, ...)
//! - the synth and population value objects (`Synth`, `PopulationGroup`)
//! - simulation inputs and outputs (`ExperimentDef`, `SimulationResult`)

pub mod types;

pub use types::*;
