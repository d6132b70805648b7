//! Errors - エラー型と分類
//!
//! Hard failures only. A failed stage is not an error: it is reported through
//! `ExecutionState::Failed` and ends the Attempt normally.

use thiserror::Error;

use super::ids::ExecutionId;

/// Operational classification of an error.
///
/// - Transient: may succeed if retried later
/// - Permanent: retrying is pointless (bad configuration or input)
/// - Infrastructure: an external system is unreachable or misbehaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Raised by `Execution::poll` when the external system could not be asked.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("transient poll failure: {0}")]
    Transient(String),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Transient(_) => ErrorKind::Transient,
            ExecutionError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("an attempt needs at least one quest")]
    NoQuests,

    #[error("polling {execution_id} of quest `{quest}` failed")]
    Poll {
        quest: String,
        execution_id: ExecutionId,
        #[source]
        source: ExecutionError,
    },
}

impl AttemptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptError::NoQuests => ErrorKind::Permanent,
            AttemptError::Poll { source, .. } => source.kind(),
        }
    }
}
