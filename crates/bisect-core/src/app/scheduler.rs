//! Scheduler - 多数の Attempt を定期的に進めるドライバ
//!
//! # フロー
//! 1. tick ごとに未完了の Attempt をそれぞれ 1 つの task に move して
//!    `schedule_work` を並行実行
//! 2. 結果を回収して元の順序に戻す
//! 3. 全 Attempt 完了 / max_ticks / shutdown で停止
//!
//! Cancellation is "stop calling": no cleanup is done on shutdown.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::domain::{Attempt, AttemptError, JobSpec};
use crate::observability::AttemptCounts;
use crate::ports::{IdGenerator, Quest};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("attempt task did not finish: {0}")]
    Join(#[from] JoinError),
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Attempts that had `schedule_work` called this tick.
    pub scheduled: usize,
    /// Of those, how many returned a poll error.
    pub errored: usize,
    pub counts: AttemptCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    AllCompleted,
    MaxTicks,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub stop: StopReason,
    pub counts: AttemptCounts,
}

/// Holds many Attempts and drives them tick by tick.
pub struct Scheduler {
    attempts: Vec<Attempt>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            attempts: Vec::new(),
            config,
        }
    }

    /// `spec.attempts_per_change` Attempts for every Change, all sharing `quests`.
    pub fn from_spec(
        quests: &[Arc<dyn Quest>],
        spec: &JobSpec,
        ids: Arc<dyn IdGenerator>,
        config: SchedulerConfig,
    ) -> Result<Self, AttemptError> {
        let mut scheduler = Self::new(config);
        for change in &spec.changes {
            for _ in 0..spec.attempts_per_change {
                scheduler.push(Attempt::with_id_generator(
                    quests.to_vec(),
                    change.clone(),
                    Arc::clone(&ids),
                )?);
            }
        }
        Ok(scheduler)
    }

    pub fn push(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn into_attempts(self) -> Vec<Attempt> {
        self.attempts
    }

    pub fn all_completed(&self) -> bool {
        self.attempts.iter().all(Attempt::completed)
    }

    pub fn counts(&self) -> AttemptCounts {
        self.attempts.iter().map(Attempt::state).collect()
    }

    /// Call `schedule_work` once on every incomplete Attempt, concurrently.
    ///
    /// Each Attempt is moved into exactly one task, so it is never scheduled
    /// twice at once. Poll errors are logged and counted; the Attempt is kept
    /// and retried on the next tick.
    pub async fn tick(&mut self) -> Result<TickReport, SchedulerError> {
        let mut join_set = JoinSet::new();
        let mut settled = Vec::with_capacity(self.attempts.len());

        for (index, mut attempt) in std::mem::take(&mut self.attempts).into_iter().enumerate() {
            if attempt.completed() {
                settled.push((index, attempt));
                continue;
            }
            join_set.spawn(async move {
                let result = attempt.schedule_work().await;
                (index, attempt, result)
            });
        }

        let mut report = TickReport::default();
        let mut first_join_error = None;
        while let Some(joined) = join_set.join_next().await {
            let (index, attempt, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    warn!(error = %err, "attempt task failed; attempt dropped");
                    first_join_error.get_or_insert(err);
                    continue;
                }
            };
            report.scheduled += 1;
            if let Err(err) = result {
                report.errored += 1;
                warn!(
                    attempt_id = %attempt.attempt_id(),
                    change = %attempt.change(),
                    error = %err,
                    "schedule_work failed; retrying next tick"
                );
            }
            settled.push((index, attempt));
        }

        settled.sort_by_key(|(index, _)| *index);
        self.attempts = settled.into_iter().map(|(_, attempt)| attempt).collect();

        if let Some(err) = first_join_error {
            return Err(SchedulerError::Join(err));
        }
        report.counts = self.counts();
        Ok(report)
    }

    /// Tick every `tick_interval` until all Attempts complete, `max_ticks` is
    /// reached, or shutdown is requested.
    ///
    /// Dropping the shutdown sender also stops the run.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, SchedulerError> {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            if *shutdown.borrow() {
                return Ok(self.summary(ticks, StopReason::Shutdown));
            }

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(self.summary(ticks, StopReason::Shutdown));
                    }
                    continue;
                }
            }

            let report = self.tick().await?;
            ticks += 1;
            debug!(
                tick = ticks,
                scheduled = report.scheduled,
                errored = report.errored,
                completed = report.counts.completed(),
                total = report.counts.total(),
                "tick finished"
            );

            if self.all_completed() {
                info!(ticks, "all attempts completed");
                return Ok(self.summary(ticks, StopReason::AllCompleted));
            }
            if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                warn!(ticks, "max ticks reached with attempts still running");
                return Ok(self.summary(ticks, StopReason::MaxTicks));
            }
        }
    }

    fn summary(&self, ticks: u64, stop: StopReason) -> RunSummary {
        RunSummary {
            ticks,
            stop,
            counts: self.counts(),
        }
    }
}
