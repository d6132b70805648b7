//! Domain model (IDs, changes, states, errors, the Attempt state machine).

pub mod attempt;
pub mod change;
pub mod errors;
pub mod ids;
pub mod spec;
pub mod state;

pub use attempt::{Attempt, AttemptStatus, Stage, StageView};
pub use change::{Arguments, CHANGE_ARGUMENT, Change};
pub use errors::{AttemptError, ErrorKind, ExecutionError};
pub use ids::{AttemptId, ExecutionId};
pub use spec::JobSpec;
pub use state::{AttemptState, ExecutionState};
