//! `synthpop` library crate.
//!
//! Synthetic persona populations, Monte Carlo outcome simulation, and the
//! analysis engines that sit on top (segmentation, outlier detection,
//! explainability). The binary (`synthpop`) is a thin wrapper around this
//! library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., future GUI/daemon, notebooks, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod explain;
pub mod io;
pub mod math;
pub mod outlier;
pub mod population;
pub mod report;
pub mod segment;
pub mod sim;
