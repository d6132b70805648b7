//! Metric names.
//!
//! - `"<chart>/<trace>"`
//! - `"<chart>/<grouping>/<story>"`: chartjson stores these under the chart
//!   key `"<grouping>@@<chart>"`, with the story as the trace name.

use std::fmt;
use std::str::FromStr;

use super::engine::CompareError;

const ESCAPED_CHARS: &[char] = &[':', '|', '=', '/', '#', '&', ','];

/// Replace characters that producers strip from trace names with `_`.
pub fn escape(name: &str) -> String {
    name.chars()
        .map(|c| if ESCAPED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricName {
    chart: String,
    grouping: Option<String>,
    trace: String,
}

impl MetricName {
    pub fn parse(raw: &str) -> Result<Self, CompareError> {
        let invalid = || CompareError::InvalidMetric(raw.to_string());
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            [chart, trace] => Ok(Self {
                chart: chart.to_string(),
                grouping: None,
                trace: trace.to_string(),
            }),
            [chart, grouping, story] => Ok(Self {
                chart: chart.to_string(),
                grouping: Some(grouping.to_string()),
                trace: story.to_string(),
            }),
            _ => Err(invalid()),
        }
    }

    /// The chart (or histogram) name without grouping.
    pub fn chart(&self) -> &str {
        &self.chart
    }

    pub fn grouping(&self) -> Option<&str> {
        self.grouping.as_deref()
    }

    /// Trace name, or the story for grouped metrics.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Key of the chart inside a chartjson `charts` object.
    pub fn chart_key(&self) -> String {
        match &self.grouping {
            Some(grouping) => format!("{grouping}@@{}", self.chart),
            None => self.chart.clone(),
        }
    }

    /// Exact or escaped match against the requested trace.
    pub fn matches_trace(&self, name: &str) -> bool {
        name == self.trace || escape(name) == self.trace
    }
}

impl FromStr for MetricName {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.grouping {
            Some(grouping) => write!(f, "{}/{grouping}/{}", self.chart, self.trace),
            None => write!(f, "{}/{}", self.chart, self.trace),
        }
    }
}
