//! Error taxonomy for the simulation core.
//!
//! Every failure class is detected *before* any partial work is produced:
//! configuration problems before sampling starts, validation problems before
//! a population is returned, data-size problems before an analysis runs.
//! Nothing in the core retries internally: all operations are deterministic
//! given a seed, so a retry with the same inputs would reproduce the failure.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Malformed or out-of-range configuration (distribution weights that do
    /// not sum to one, missing experiment parameters, bad grid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed synth input reaching trait derivation. The enclosing
    /// generation call fails atomically rather than dropping synths.
    #[error("validation error: {0}")]
    Validation(String),

    /// An analysis was asked to run on fewer synths than it needs.
    #[error("insufficient data: need at least {required} synths, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Failed to write an export file.
    #[error("export error: {0}")]
    Export(String),
}

impl CoreError {
    pub fn config(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    /// Process exit code for the CLI binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            CoreError::Configuration(_) => 2,
            CoreError::InsufficientData { .. } => 3,
            CoreError::Validation(_) => 4,
            CoreError::Export(_) => 5,
        }
    }
}
