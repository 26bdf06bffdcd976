//! Error taxonomy.
//!
//! Only configuration-level problems and cancellation are errors. An
//! incomplete timetable is a normal result and is reported through
//! statistics, never through `Err`.

use thiserror::Error;

/// Errors raised by the timetable engine.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// The school configuration cannot produce a grid (no days, no grades,
    /// no sections, or a zero period count).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The run was aborted through its cancellation flag.
    #[error("Generation cancelled")]
    Cancelled,

    /// Options file could not be read.
    #[error("IO error: {0}")]
    OptionsIo(#[from] std::io::Error),

    /// Options file is not valid TOML for [`GenerateOptions`](crate::options::GenerateOptions).
    #[error("TOML parse error: {0}")]
    OptionsParse(#[from] toml::de::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TimetableError>;
