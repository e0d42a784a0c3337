use serde::{Deserialize, Serialize};

/// Resource limits to keep rule files, fact text and runs bounded
///
/// The defaults are generous: game rule bases are a few kilobytes and a
/// move usually settles in well under a millisecond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum rule file size in bytes
    pub max_file_size_bytes: usize,

    /// Maximum size of a single fact string handed to `assert_string`
    pub max_fact_text_bytes: usize,

    /// Maximum wall-clock time of a single `run` in milliseconds
    pub max_run_time_ms: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 5 * 1024 * 1024, // 5 MB
            max_fact_text_bytes: 64 * 1024,       // 64 KB
            max_run_time_ms: 10_000,              // 10 seconds
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }
}
