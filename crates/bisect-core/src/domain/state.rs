//! State - Execution と Attempt の状態
//!
//! `ExecutionState` は最後の poll の結果を保持し、
//! `AttemptState` は Attempt から毎回導出される（保存しない）。

use serde::{Deserialize, Serialize};

use super::change::Arguments;

/// Last polled status of one Execution.
///
/// State transitions:
/// - Running -> Running | Blocked | Failed | Succeeded
/// - Blocked -> Running | Blocked | Failed | Succeeded
/// - Failed / Succeeded are terminal.
///
/// `result_arguments` only exist in `Succeeded`, so they cannot be read from a
/// failed or unfinished Execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionState {
    /// Work in progress, not waiting on anything external.
    Running,

    /// Waiting on an external system.
    Blocked,

    /// Completed unsuccessfully.
    Failed { reason: String },

    /// Completed successfully.
    Succeeded { result_arguments: Arguments },
}

impl ExecutionState {
    pub fn failed_with(reason: impl Into<String>) -> Self {
        ExecutionState::Failed {
            reason: reason.into(),
        }
    }

    pub fn succeeded_with(result_arguments: Arguments) -> Self {
        ExecutionState::Succeeded { result_arguments }
    }

    pub fn blocked(&self) -> bool {
        matches!(self, ExecutionState::Blocked)
    }

    /// Finished, successfully or not.
    pub fn completed(&self) -> bool {
        matches!(
            self,
            ExecutionState::Failed { .. } | ExecutionState::Succeeded { .. }
        )
    }

    pub fn failed(&self) -> bool {
        matches!(self, ExecutionState::Failed { .. })
    }

    pub fn result_arguments(&self) -> Option<&Arguments> {
        match self {
            ExecutionState::Succeeded { result_arguments } => Some(result_arguments),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ExecutionState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Attempt state, derived from its Executions.
///
/// - NotStarted: no Execution yet
/// - Running: last Execution neither completed nor blocked
/// - Blocked: last Execution waits on an external system
/// - Advancing: last Execution succeeded and more Quests remain
/// - Failed: last Execution failed (terminal)
/// - Done: every Quest ran and the last one succeeded (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    NotStarted,
    Running,
    Blocked,
    Advancing,
    Failed,
    Done,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Failed | AttemptState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::running(ExecutionState::Running, false, false, false)]
    #[case::blocked(ExecutionState::Blocked, true, false, false)]
    #[case::failed(ExecutionState::failed_with("boom"), false, true, true)]
    #[case::succeeded(ExecutionState::succeeded_with(Arguments::new()), false, true, false)]
    fn execution_state_flags(
        #[case] state: ExecutionState,
        #[case] blocked: bool,
        #[case] completed: bool,
        #[case] failed: bool,
    ) {
        assert_eq!(state.blocked(), blocked);
        assert_eq!(state.completed(), completed);
        assert_eq!(state.failed(), failed);
    }

    #[test]
    fn result_arguments_only_on_success() {
        let mut args = Arguments::new();
        args.insert("isolate".to_string(), serde_json::json!("abc123"));

        assert!(ExecutionState::Running.result_arguments().is_none());
        assert!(ExecutionState::Blocked.result_arguments().is_none());
        assert!(ExecutionState::failed_with("x").result_arguments().is_none());
        assert_eq!(
            ExecutionState::succeeded_with(args.clone()).result_arguments(),
            Some(&args)
        );
    }

    #[test]
    fn terminal_attempt_states() {
        assert!(AttemptState::Failed.is_terminal());
        assert!(AttemptState::Done.is_terminal());
        assert!(!AttemptState::Blocked.is_terminal());
        assert!(!AttemptState::Advancing.is_terminal());
    }

    #[test]
    fn attempt_state_serializes_snake_case() {
        let s = serde_json::to_string(&AttemptState::NotStarted).unwrap();
        assert_eq!(s, "\"not_started\"");
    }
}
