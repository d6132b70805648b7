use serde::{Deserialize, Serialize};

use crate::domain::AttemptState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub not_started: usize,
    pub running: usize,
    pub blocked: usize,
    pub advancing: usize,
    pub failed: usize,
    pub done: usize,
}

impl AttemptCounts {
    pub fn record(&mut self, state: AttemptState) {
        match state {
            AttemptState::NotStarted => self.not_started += 1,
            AttemptState::Running => self.running += 1,
            AttemptState::Blocked => self.blocked += 1,
            AttemptState::Advancing => self.advancing += 1,
            AttemptState::Failed => self.failed += 1,
            AttemptState::Done => self.done += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.failed + self.done
    }

    pub fn total(&self) -> usize {
        self.not_started + self.running + self.blocked + self.advancing + self.completed()
    }
}

impl FromIterator<AttemptState> for AttemptCounts {
    fn from_iter<I: IntoIterator<Item = AttemptState>>(iter: I) -> Self {
        let mut counts = AttemptCounts::default();
        for state in iter {
            counts.record(state);
        }
        counts
    }
}
