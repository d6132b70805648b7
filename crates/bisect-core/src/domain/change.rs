use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key under which the first Quest of an Attempt receives its Change.
pub const CHANGE_ARGUMENT: &str = "change";

/// Arguments passed to `Quest::start` and produced by a successful Execution.
///
/// Keys are defined by the Quest/Execution pair in use; the Attempt only ever
/// looks at [`CHANGE_ARGUMENT`].
pub type Arguments = BTreeMap<String, serde_json::Value>;

/// The thing an Attempt measures (a revision, a configuration, ...).
///
/// Opaque to the core: it is only ever handed to the first Quest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Change(String);

impl Change {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Arguments for the first stage of a pipeline: exactly `{"change": <change>}`.
    pub fn initial_arguments(&self) -> Arguments {
        let mut arguments = Arguments::new();
        arguments.insert(
            CHANGE_ARGUMENT.to_string(),
            serde_json::Value::String(self.0.clone()),
        );
        arguments
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
