//! Generation options.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```
//! use u_timetable::options::GenerateOptions;
//!
//! let options = GenerateOptions::from_toml_str(r#"
//!     tolerant_mode = false
//!     max_retries = 3
//!     seed = 42
//! "#).unwrap();
//!
//! assert!(!options.tolerant_mode);
//! assert_eq!(options.max_retries, 3);
//! assert_eq!(options.seed, Some(42));
//! assert_eq!(options.backtrack_limit, 1000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for a [`generate`](crate::generate) call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GenerateOptions {
    /// Leave unfillable slots empty instead of backtracking.
    pub tolerant_mode: bool,
    /// Number of independent engine attempts (at least one is always run).
    pub max_retries: u32,
    /// Assignment rate (percent) at which an attempt counts as complete.
    pub quality_threshold: f64,
    /// Assignment rate (percent) above which a partial result is still "good".
    pub good_quality_threshold: f64,
    /// Subjects with fewer remaining hours than this are placed early.
    pub low_hours_threshold: u32,
    /// Maximum number of backtracks per strict-mode attempt.
    pub backtrack_limit: usize,
    /// Seed for retry shuffling. Drawn at random when absent.
    pub seed: Option<u64>,
    /// Run attempts on the rayon thread pool.
    pub parallel: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            tolerant_mode: true,
            max_retries: 5,
            quality_threshold: 99.0,
            good_quality_threshold: 90.0,
            low_hours_threshold: 3,
            backtrack_limit: 1000,
            seed: None,
            parallel: false,
        }
    }
}

impl GenerateOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses options from a TOML string. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Sets tolerant (greedy-skip) or strict (backtracking) mode.
    pub fn with_tolerant_mode(mut self, tolerant: bool) -> Self {
        self.tolerant_mode = tolerant;
        self
    }

    /// Sets the number of attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the completion threshold (percent).
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Sets the low-hours threshold for the priority classifier.
    pub fn with_low_hours_threshold(mut self, hours: u32) -> Self {
        self.low_hours_threshold = hours;
        self
    }

    /// Sets the strict-mode backtrack ceiling.
    pub fn with_backtrack_limit(mut self, limit: usize) -> Self {
        self.backtrack_limit = limit;
        self
    }

    /// Fixes the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables parallel attempts.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Number of attempts actually run.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}
