//! Input spec for a bisection job: which Changes to measure, how many times.

use serde::{Deserialize, Serialize};

use super::change::Change;

/// A batch of Attempts to schedule.
///
/// Several Attempts per Change give the comparison engine more values to work
/// with; each Attempt is still an independent, sequential pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub changes: Vec<Change>,

    #[serde(default = "JobSpec::default_attempts_per_change")]
    pub attempts_per_change: u32,
}

impl JobSpec {
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            changes,
            attempts_per_change: Self::default_attempts_per_change(),
        }
    }

    pub fn with_attempts_per_change(mut self, n: u32) -> Self {
        self.attempts_per_change = n;
        self
    }

    /// Number of Attempts this spec expands to.
    pub fn total_attempts(&self) -> usize {
        self.changes.len() * self.attempts_per_change as usize
    }

    fn default_attempts_per_change() -> u32 {
        1
    }
}

impl Default for JobSpec {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
