use std::fmt;

use serde::{Deserialize, Serialize};

/// Three-way verdict of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Significance {
    /// The samples differ.
    Reject,
    /// Enough data, no evidence of a difference.
    FailToReject,
    /// Inconclusive; collect more data.
    NeedMoreData,
}

impl Significance {
    pub fn as_str(self) -> &'static str {
        match self {
            Significance::Reject => "REJECT",
            Significance::FailToReject => "FAIL_TO_REJECT",
            Significance::NeedMoreData => "NEED_MORE_DATA",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
