//! bisect-core
//!
//! Building blocks for performance bisection: the Attempt/Execution state
//! machine that runs a pipeline of Quests against one Change, and the engine
//! that compares two samples of a metric.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, change, state, errors, spec, Attempt）
//! - **ports**: 抽象化レイヤー（Quest, Execution, Clock, IdGenerator）
//! - **app**: 多数の Attempt を tick ごとに進める Scheduler
//! - **impls**: 実装（スクリプトで動く開発用・テスト用 Quest）
//! - **compare**: Sample の読み込みと Mann-Whitney による判定
//! - **config**: 明示的に渡す設定値
//! - **observability**: 状態ごとの Attempt 数

pub mod app;
pub mod compare;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{RunSummary, Scheduler, SchedulerError, StopReason, TickReport};
pub use compare::{
    CompareError, ComparisonReport, ComparisonResult, DataFormat, Sample, Significance,
    compare_files, compare_samples,
};
pub use config::{ComparisonConfig, ConfigError, SchedulerConfig};
pub use domain::{
    Attempt, AttemptError, AttemptState, AttemptStatus, Change, ExecutionState, JobSpec,
};
pub use observability::AttemptCounts;
pub use ports::{Execution, Quest};
