//! Formats - 入力ファイルから Sample を取り出すパーサ群
//!
//! - **chartjson**: `{"charts": {chart: {trace: entry}}}`
//! - **valueset**: histogram-set JSON (トップレベルが配列)
//! - **buildbot**: `RESULT chart: trace= value units` 形式のテキストログ
//!
//! A missing metric is not an error: the source returns an empty Sample.
//! `FormatError` is only for input that is present but malformed.

pub mod buildbot;
pub mod chartjson;
pub mod valueset;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::CompareError;
use super::metric::MetricName;
use super::sample::Sample;

pub use self::buildbot::BuildbotSource;
pub use self::chartjson::ChartJsonSource;
pub use self::valueset::ValueSetSource;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected document shape: {0}")]
    Shape(String),

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Extracts the values of one metric from one input file.
pub trait SampleSource: Send + Sync {
    fn extract(&self, bytes: &[u8], metric: &MetricName) -> Result<Sample, FormatError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    ChartJson,
    ValueSet,
    #[serde(alias = "buildbot-log")]
    Buildbot,
}

impl DataFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DataFormat::ChartJson => "chartjson",
            DataFormat::ValueSet => "valueset",
            DataFormat::Buildbot => "buildbot",
        }
    }

    pub fn source(self) -> &'static dyn SampleSource {
        match self {
            DataFormat::ChartJson => &ChartJsonSource,
            DataFormat::ValueSet => &ValueSetSource,
            DataFormat::Buildbot => &BuildbotSource,
        }
    }
}

impl FromStr for DataFormat {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chartjson" => Ok(DataFormat::ChartJson),
            "valueset" => Ok(DataFormat::ValueSet),
            "buildbot" | "buildbot-log" => Ok(DataFormat::Buildbot),
            other => Err(CompareError::UnknownDataFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String form of a JSON scalar, as used for grouping keys and diagnostics.
fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
