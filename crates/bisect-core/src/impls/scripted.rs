//! Scripted Quest - 開発・テスト用の in-memory 実装
//!
//! Each Execution walks a fixed list of poll results. The shared [`QuestLog`]
//! records what the Attempt did with the Quest (start arguments, polls), so
//! tests can check ordering and argument threading from the outside.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Arguments, ExecutionError, ExecutionState};
use crate::ports::{Execution, Quest};

/// What the next `poll` reports.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Running,
    Blocked,
    Fail(String),
    Succeed(Arguments),
    /// Succeed with the start arguments plus these extra keys.
    Echo(Arguments),
    /// `poll` returns `Err` and leaves the state unchanged.
    PollError(String),
}

#[derive(Debug, Default)]
struct LogInner {
    starts: Vec<Arguments>,
    polls: usize,
    polls_after_completion: usize,
}

/// Shared record of everything done with one ScriptedQuest.
#[derive(Debug, Clone, Default)]
pub struct QuestLog {
    inner: Arc<Mutex<LogInner>>,
}

impl QuestLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arguments of every `start` call, in call order.
    pub fn starts(&self) -> Vec<Arguments> {
        self.lock().starts.clone()
    }

    pub fn start_count(&self) -> usize {
        self.lock().starts.len()
    }

    pub fn poll_count(&self) -> usize {
        self.lock().polls
    }

    /// Polls that hit an already completed Execution (allowed, but no-ops).
    pub fn polls_after_completion(&self) -> usize {
        self.lock().polls_after_completion
    }
}

/// A Quest whose Executions follow `script`.
///
/// Once the script is exhausted without reaching a terminal step, the
/// Execution stays `Blocked`.
pub struct ScriptedQuest {
    name: String,
    script: Vec<Step>,
    log: QuestLog,
}

impl ScriptedQuest {
    pub fn new(name: impl Into<String>, script: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            script,
            log: QuestLog::default(),
        }
    }

    /// Convenience: a Quest that succeeds on the first poll.
    pub fn succeeding(name: impl Into<String>, result_arguments: Arguments) -> Self {
        Self::new(name, vec![Step::Succeed(result_arguments)])
    }

    pub fn log(&self) -> QuestLog {
        self.log.clone()
    }
}

impl Quest for ScriptedQuest {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, arguments: Arguments) -> Box<dyn Execution> {
        self.log.lock().starts.push(arguments.clone());
        Box::new(ScriptedExecution {
            input: arguments,
            script: self.script.iter().cloned().collect(),
            state: ExecutionState::Running,
            log: self.log.clone(),
        })
    }
}

pub struct ScriptedExecution {
    input: Arguments,
    script: VecDeque<Step>,
    state: ExecutionState,
    log: QuestLog,
}

#[async_trait]
impl Execution for ScriptedExecution {
    fn state(&self) -> &ExecutionState {
        &self.state
    }

    async fn poll(&mut self) -> Result<(), ExecutionError> {
        {
            let mut log = self.log.lock();
            log.polls += 1;
            if self.state.completed() {
                log.polls_after_completion += 1;
                return Ok(());
            }
        }

        self.state = match self.script.pop_front() {
            None | Some(Step::Blocked) => ExecutionState::Blocked,
            Some(Step::Running) => ExecutionState::Running,
            Some(Step::Fail(reason)) => ExecutionState::failed_with(reason),
            Some(Step::Succeed(arguments)) => ExecutionState::succeeded_with(arguments),
            Some(Step::Echo(extra)) => {
                let mut arguments = self.input.clone();
                arguments.extend(extra);
                ExecutionState::succeeded_with(arguments)
            }
            Some(Step::PollError(message)) => return Err(ExecutionError::Transient(message)),
        };
        Ok(())
    }
}

/// Build `Arguments` from `(key, value)` pairs.
pub fn arguments<I, K>(pairs: I) -> Arguments
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
