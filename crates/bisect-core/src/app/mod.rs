//! App - アプリケーション層
//!
//! - **Scheduler**: Attempt 群を tick ごとに `schedule_work` で進めるドライバ

pub mod scheduler;

pub use self::scheduler::{RunSummary, Scheduler, SchedulerError, StopReason, TickReport};
