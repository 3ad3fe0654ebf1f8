//! Input/output helpers.
//!
//! - result-bundle JSON export and re-import (`export`)

pub mod export;

pub use export::*;
