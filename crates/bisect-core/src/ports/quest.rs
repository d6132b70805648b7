//! Quest / Execution ports - パイプラインの 1 ステージ
//!
//! Concrete stage kinds (build, test run, value read, ...) live outside the
//! core and implement these traits. The Attempt only needs this contract.

use async_trait::async_trait;

use crate::domain::{Arguments, ExecutionError, ExecutionState};

/// A named unit of work that produces an Execution when started.
///
/// Quests are shared read-only between Attempts (`Arc<dyn Quest>`), so
/// `start` must not keep per-call state in `self`. Caching of previously done
/// work (e.g. an already built binary) belongs inside the Quest and its
/// Executions, never in the Attempt.
pub trait Quest: Send + Sync {
    fn name(&self) -> &str;

    /// Create the Execution for `arguments`.
    ///
    /// Construction only: external systems are first contacted by
    /// `Execution::poll`.
    fn start(&self, arguments: Arguments) -> Box<dyn Execution>;
}

/// One run of one Quest.
///
/// The status accessors reflect the last poll and never contact anything.
#[async_trait]
pub trait Execution: Send {
    fn state(&self) -> &ExecutionState;

    /// Update `state()` from the external system.
    ///
    /// Safe to call repeatedly; a no-op once the Execution is completed.
    /// `Err` means the external system could not be asked at all. A stage
    /// that ran and failed is reported as `ExecutionState::Failed` instead.
    async fn poll(&mut self) -> Result<(), ExecutionError>;

    fn blocked(&self) -> bool {
        self.state().blocked()
    }

    fn completed(&self) -> bool {
        self.state().completed()
    }

    fn failed(&self) -> bool {
        self.state().failed()
    }

    /// Present only when completed and not failed.
    fn result_arguments(&self) -> Option<&Arguments> {
        self.state().result_arguments()
    }
}
