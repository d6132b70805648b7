//! Attempt: one run of all the Quests on a Change.
//!
//! Each Change gets at least one Attempt; more Attempts per Change give the
//! comparison more values. An Attempt runs its Quests in order and never skips
//! one, even if an earlier Attempt already did the same work. Caching is the
//! Quest's business and invisible here.
//!
//! An Execution is created for each Quest when it starts. If an Execution
//! fails, the Attempt ends with fewer Executions than Quests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::change::Change;
use super::errors::AttemptError;
use super::ids::{AttemptId, ExecutionId};
use super::state::{AttemptState, ExecutionState};
use crate::ports::{Execution, IdGenerator, Quest, SystemClock, UlidGenerator};

/// One started Quest inside an Attempt.
pub struct Stage {
    execution_id: ExecutionId,
    quest: String,
    execution: Box<dyn Execution>,
}

impl Stage {
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn quest(&self) -> &str {
        &self.quest
    }

    pub fn execution(&self) -> &dyn Execution {
        self.execution.as_ref()
    }
}

/// Orchestrates an ordered, non-empty list of Quests for one Change.
///
/// Design:
/// - `stages` is append-only; it grows by one each time a Quest starts.
/// - `blocked` / `completed` / `state` only read the last polled status.
/// - `schedule_work` takes `&mut self`, so one Attempt can never be scheduled
///   concurrently with itself. Many Attempts can run side by side.
pub struct Attempt {
    attempt_id: AttemptId,
    quests: Vec<Arc<dyn Quest>>,
    change: Change,
    stages: Vec<Stage>,
    ids: Arc<dyn IdGenerator>,
}

impl Attempt {
    pub fn new(quests: Vec<Arc<dyn Quest>>, change: Change) -> Result<Self, AttemptError> {
        Self::with_id_generator(quests, change, Arc::new(UlidGenerator::new(SystemClock)))
    }

    /// Fails fast with `AttemptError::NoQuests` on an empty pipeline.
    pub fn with_id_generator(
        quests: Vec<Arc<dyn Quest>>,
        change: Change,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, AttemptError> {
        if quests.is_empty() {
            return Err(AttemptError::NoQuests);
        }
        Ok(Self {
            attempt_id: ids.generate_attempt_id(),
            quests,
            change,
            stages: Vec::new(),
            ids,
        })
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    pub fn change(&self) -> &Change {
        &self.change
    }

    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    pub fn execution_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn last_execution(&self) -> Option<&dyn Execution> {
        self.stages.last().map(Stage::execution)
    }

    /// True iff the Attempt waits on its current Execution.
    ///
    /// Does not contact external systems; `schedule_work` refreshes it.
    pub fn blocked(&self) -> bool {
        self.last_execution().is_some_and(|e| e.blocked())
    }

    /// True iff the Attempt is finished, successfully or not.
    ///
    /// Does not contact external systems; `schedule_work` refreshes it.
    pub fn completed(&self) -> bool {
        let Some(last) = self.last_execution() else {
            return false;
        };
        last.failed() || (last.completed() && self.stages.len() == self.quests.len())
    }

    pub fn state(&self) -> AttemptState {
        let Some(last) = self.last_execution() else {
            return AttemptState::NotStarted;
        };
        if last.failed() {
            AttemptState::Failed
        } else if last.completed() {
            if self.stages.len() == self.quests.len() {
                AttemptState::Done
            } else {
                AttemptState::Advancing
            }
        } else if last.blocked() {
            AttemptState::Blocked
        } else {
            AttemptState::Running
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.last_execution().and_then(|e| e.state().failure_reason())
    }

    /// Run this Attempt until it is completed or blocked.
    ///
    /// Resumable: call it again (e.g. on every scheduler tick) to continue
    /// from where it stopped. On a completed Attempt this starts and polls
    /// nothing.
    ///
    /// A poll error leaves the Attempt as it was and is returned to the
    /// caller; the next call polls the same Execution again.
    pub async fn schedule_work(&mut self) -> Result<(), AttemptError> {
        while !self.completed() {
            self.start_next_execution_if_ready();
            // Poll before checking blocked: poll is what updates it.
            // completed is checked before poll since an Execution may cache it.
            self.poll().await?;

            if self.blocked() {
                debug!(attempt_id = %self.attempt_id, "attempt blocked");
                break;
            }
        }
        Ok(())
    }

    async fn poll(&mut self) -> Result<(), AttemptError> {
        let attempt_id = self.attempt_id;
        let quest_count = self.quests.len();
        let stage_count = self.stages.len();
        let Some(stage) = self.stages.last_mut() else {
            return Ok(());
        };

        if let Err(source) = stage.execution.poll().await {
            warn!(
                %attempt_id,
                execution_id = %stage.execution_id,
                quest = %stage.quest,
                error = %source,
                "poll failed"
            );
            return Err(AttemptError::Poll {
                quest: stage.quest.clone(),
                execution_id: stage.execution_id,
                source,
            });
        }

        match stage.execution.state() {
            ExecutionState::Failed { reason } => info!(
                %attempt_id,
                quest = %stage.quest,
                %reason,
                "execution failed; attempt completed"
            ),
            ExecutionState::Succeeded { .. } => info!(
                %attempt_id,
                quest = %stage.quest,
                stage = stage_count,
                of = quest_count,
                "execution succeeded"
            ),
            state => debug!(%attempt_id, quest = %stage.quest, ?state, "polled"),
        }
        Ok(())
    }

    fn start_next_execution_if_ready(&mut self) {
        let arguments = match self.last_execution() {
            None => self.change.initial_arguments(),
            Some(last) => {
                if !last.completed() || self.completed() {
                    return;
                }
                match last.result_arguments() {
                    Some(arguments) => arguments.clone(),
                    None => return,
                }
            }
        };

        let Some(quest) = self.quests.get(self.stages.len()) else {
            return;
        };
        let quest_name = quest.name().to_string();
        let execution = quest.start(arguments);
        let execution_id = self.ids.generate_execution_id();

        debug!(
            attempt_id = %self.attempt_id,
            %execution_id,
            quest = %quest_name,
            change = %self.change,
            "starting execution"
        );
        self.stages.push(Stage {
            execution_id,
            quest: quest_name,
            execution,
        });
    }

    /// Serializable snapshot for status output.
    pub fn status(&self) -> AttemptStatus {
        AttemptStatus {
            attempt_id: self.attempt_id,
            change: self.change.clone(),
            state: self.state(),
            quests: self.quests.iter().map(|q| q.name().to_string()).collect(),
            executions: self
                .stages
                .iter()
                .map(|stage| StageView {
                    execution_id: stage.execution_id,
                    quest: stage.quest.clone(),
                    state: stage.execution.state().clone(),
                })
                .collect(),
            failure_reason: self.failure_reason().map(str::to_string),
        }
    }
}

/// Attempt status for status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptStatus {
    pub attempt_id: AttemptId,
    pub change: Change,
    pub state: AttemptState,
    pub quests: Vec<String>,
    pub executions: Vec<StageView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageView {
    pub execution_id: ExecutionId,
    pub quest: String,
    pub state: ExecutionState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Arguments, CHANGE_ARGUMENT};
    use crate::impls::scripted::{QuestLog, ScriptedQuest, Step, arguments};
    use rstest::rstest;
    use serde_json::json;

    fn pipeline(quests: Vec<ScriptedQuest>) -> (Vec<Arc<dyn Quest>>, Vec<QuestLog>) {
        let logs = quests.iter().map(ScriptedQuest::log).collect();
        let quests = quests
            .into_iter()
            .map(|q| Arc::new(q) as Arc<dyn Quest>)
            .collect();
        (quests, logs)
    }

    fn ok(name: &str) -> ScriptedQuest {
        ScriptedQuest::succeeding(name, arguments([("from", json!(name))]))
    }

    fn assert_settled(attempt: &Attempt) {
        assert!(attempt.completed() || attempt.blocked());
        assert!(attempt.execution_count() <= attempt.quest_count());
    }

    #[rstest]
    #[case::single(1)]
    #[case::three(3)]
    fn new_attempt_is_neither_completed_nor_blocked(#[case] n: usize) {
        let (quests, _) = pipeline((0..n).map(|i| ok(&format!("q{i}"))).collect());
        let attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        assert!(!attempt.completed());
        assert!(!attempt.blocked());
        assert_eq!(attempt.state(), AttemptState::NotStarted);
        assert_eq!(attempt.execution_count(), 0);
    }

    #[test]
    fn empty_pipeline_fails_fast() {
        let result = Attempt::new(Vec::new(), Change::new("c1"));
        assert!(matches!(result, Err(AttemptError::NoQuests)));
    }

    #[tokio::test]
    async fn runs_every_quest_in_order() {
        let (quests, logs) = pipeline(vec![ok("find_isolate"), ok("run_test"), ok("read_value")]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        attempt.schedule_work().await.unwrap();

        assert_settled(&attempt);
        assert!(attempt.completed());
        assert_eq!(attempt.state(), AttemptState::Done);
        assert_eq!(attempt.execution_count(), 3);
        let names: Vec<_> = attempt.stages().iter().map(Stage::quest).collect();
        assert_eq!(names, ["find_isolate", "run_test", "read_value"]);
        for log in &logs {
            assert_eq!(log.start_count(), 1);
        }
    }

    #[tokio::test]
    async fn result_arguments_feed_the_next_quest() {
        let (quests, logs) = pipeline(vec![
            ScriptedQuest::succeeding("find_isolate", arguments([("isolate_hash", json!("abc"))])),
            ScriptedQuest::succeeding("run_test", arguments([("task_id", json!("t-1"))])),
            ok("read_value"),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("chromium@1234")).unwrap();

        attempt.schedule_work().await.unwrap();

        let mut expected_first = Arguments::new();
        expected_first.insert(CHANGE_ARGUMENT.to_string(), json!("chromium@1234"));
        assert_eq!(logs[0].starts(), vec![expected_first]);
        assert_eq!(logs[1].starts(), vec![arguments([("isolate_hash", json!("abc"))])]);
        assert_eq!(logs[2].starts(), vec![arguments([("task_id", json!("t-1"))])]);
    }

    #[tokio::test]
    async fn blocked_execution_stops_and_resumes() {
        let (quests, logs) = pipeline(vec![
            ScriptedQuest::new(
                "find_isolate",
                vec![
                    Step::Blocked,
                    Step::Blocked,
                    Step::Succeed(arguments([("isolate_hash", json!("abc"))])),
                ],
            ),
            ok("run_test"),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        attempt.schedule_work().await.unwrap();
        assert_settled(&attempt);
        assert!(attempt.blocked());
        assert!(!attempt.completed());
        assert_eq!(attempt.state(), AttemptState::Blocked);
        assert_eq!(attempt.execution_count(), 1);
        assert_eq!(logs[0].poll_count(), 1);

        attempt.schedule_work().await.unwrap();
        assert!(attempt.blocked());
        assert_eq!(attempt.execution_count(), 1);
        assert_eq!(logs[0].poll_count(), 2);

        attempt.schedule_work().await.unwrap();
        assert_settled(&attempt);
        assert!(attempt.completed());
        assert!(!attempt.blocked());
        assert_eq!(attempt.execution_count(), 2);
        assert_eq!(logs[1].start_count(), 1);
    }

    #[tokio::test]
    async fn running_execution_is_polled_until_it_settles() {
        let (quests, logs) = pipeline(vec![ScriptedQuest::new(
            "run_test",
            vec![Step::Running, Step::Running, Step::Succeed(Arguments::new())],
        )]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        attempt.schedule_work().await.unwrap();

        assert!(attempt.completed());
        assert_eq!(logs[0].poll_count(), 3);
    }

    #[tokio::test]
    async fn failure_short_circuits_the_pipeline() {
        let (quests, logs) = pipeline(vec![
            ok("find_isolate"),
            ScriptedQuest::new("run_test", vec![Step::Blocked, Step::Fail("device lost".into())]),
            ok("read_value"),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        attempt.schedule_work().await.unwrap();
        assert!(attempt.blocked());

        attempt.schedule_work().await.unwrap();
        assert_settled(&attempt);
        assert!(attempt.completed());
        assert!(!attempt.blocked());
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert_eq!(attempt.execution_count(), 2);
        assert_eq!(attempt.failure_reason(), Some("device lost"));
        assert_eq!(attempt.status().failure_reason.as_deref(), Some("device lost"));
        assert_eq!(logs[2].start_count(), 0);
    }

    #[tokio::test]
    async fn failure_on_first_quest_completes_immediately() {
        let (quests, logs) = pipeline(vec![
            ScriptedQuest::new("find_isolate", vec![Step::Fail("compile error".into())]),
            ok("run_test"),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        attempt.schedule_work().await.unwrap();

        assert!(attempt.completed());
        assert_eq!(attempt.execution_count(), 1);
        assert_eq!(logs[1].start_count(), 0);
    }

    #[tokio::test]
    async fn schedule_work_on_completed_attempt_is_a_no_op() {
        let (quests, logs) = pipeline(vec![ok("find_isolate"), ok("run_test")]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();
        attempt.schedule_work().await.unwrap();
        assert!(attempt.completed());

        let starts: Vec<_> = logs.iter().map(QuestLog::start_count).collect();
        let polls: Vec<_> = logs.iter().map(QuestLog::poll_count).collect();
        let before = serde_json::to_value(attempt.status()).unwrap();

        attempt.schedule_work().await.unwrap();
        attempt.schedule_work().await.unwrap();

        assert_eq!(logs.iter().map(QuestLog::start_count).collect::<Vec<_>>(), starts);
        assert_eq!(logs.iter().map(QuestLog::poll_count).collect::<Vec<_>>(), polls);
        assert_eq!(serde_json::to_value(attempt.status()).unwrap(), before);
    }

    #[tokio::test]
    async fn poll_error_propagates_and_next_call_resumes() {
        let (quests, logs) = pipeline(vec![
            ScriptedQuest::new(
                "run_test",
                vec![Step::PollError("503".into()), Step::Succeed(Arguments::new())],
            ),
            ok("read_value"),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        let err = attempt.schedule_work().await.unwrap_err();
        assert!(matches!(err, AttemptError::Poll { ref quest, .. } if quest == "run_test"));
        assert_eq!(attempt.execution_count(), 1);
        assert_eq!(attempt.state(), AttemptState::Running);

        attempt.schedule_work().await.unwrap();
        assert!(attempt.completed());
        assert_eq!(attempt.execution_count(), 2);
        assert_eq!(logs[0].start_count(), 1);
    }

    #[tokio::test]
    async fn execution_count_is_monotonic_and_bounded() {
        let (quests, _) = pipeline(vec![
            ScriptedQuest::new("a", vec![Step::Blocked, Step::Succeed(Arguments::new())]),
            ScriptedQuest::new("b", vec![Step::Blocked, Step::Succeed(Arguments::new())]),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            attempt.schedule_work().await.unwrap();
            assert_settled(&attempt);
            seen.push(attempt.execution_count());
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen, vec![1, 2, 2, 2, 2]);
        assert!(attempt.completed());
    }

    #[tokio::test]
    async fn status_view_lists_executions() {
        let (quests, _) = pipeline(vec![
            ok("find_isolate"),
            ScriptedQuest::new("run_test", vec![Step::Blocked]),
        ]);
        let mut attempt = Attempt::new(quests, Change::new("c1")).unwrap();
        attempt.schedule_work().await.unwrap();

        let status = attempt.status();
        assert_eq!(status.state, AttemptState::Blocked);
        assert_eq!(status.quests, vec!["find_isolate", "run_test"]);
        assert_eq!(status.executions.len(), 2);

        let v = serde_json::to_value(&status).unwrap();
        assert_eq!(v["state"], "blocked");
        assert_eq!(v["executions"][0]["state"]["status"], "succeeded");
        assert_eq!(v["executions"][1]["state"]["status"], "blocked");
        assert!(v.get("failure_reason").is_none());
    }
}
