//! Wall-clock bound for a single run

use crate::{ResourceLimits, RulemancerError};
use std::time::Instant;

/// Tracks elapsed time since the run started
pub struct TimeoutTracker {
    start_time: Instant,
}

impl TimeoutTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Returns an error once the run has exceeded `max_run_time_ms`.
    pub fn check_timeout(&self, limits: &ResourceLimits) -> Result<(), RulemancerError> {
        let elapsed_ms = self.start_time.elapsed().as_millis() as u64;
        if elapsed_ms > limits.max_run_time_ms {
            return Err(RulemancerError::ResourceLimitExceeded {
                limit_name: "max_run_time_ms".to_string(),
                limit_value: limits.max_run_time_ms.to_string(),
                actual_value: elapsed_ms.to_string(),
                suggestion: format!(
                    "The run took {}ms, exceeding the limit of {}ms. Check for rules that keep re-activating each other, or raise the limit.",
                    elapsed_ms, limits.max_run_time_ms
                ),
            });
        }
        Ok(())
    }
}

impl Default for TimeoutTracker {
    fn default() -> Self {
        Self::new()
    }
}
