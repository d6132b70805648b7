//! Histogram-set ("valueset") reader.
//!
//! The document is an array mixing histograms and shared diagnostics:
//!
//! ```json
//! [
//!   {"guid": "g1", "type": "GenericSet", "values": ["http://www.rambler.ru/"]},
//!   {"name": "timeToFirstContentfulPaint", "sampleValues": [75.1, null],
//!    "diagnostics": {"stories": "g1",
//!                    "storyTags": {"type": "GenericSet", "values": ["pcv1-cold"]}}}
//! ]
//! ```
//!
//! A histogram matches `name/story` when its name is the chart and one of its
//! `stories` matches the story. With `name/grouping/story`, its `storyTags`
//! must also match the grouping (all tags joined with `_`, or any one tag).

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{FormatError, SampleSource, scalar_to_string};
use crate::compare::metric::{MetricName, escape};
use crate::compare::sample::Sample;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSetSource;

const STORIES: &str = "stories";
const STORY_TAGS: &str = "storyTags";

impl SampleSource for ValueSetSource {
    fn extract(&self, bytes: &[u8], metric: &MetricName) -> Result<Sample, FormatError> {
        let root: Value = serde_json::from_slice(bytes)?;
        let entries = root
            .as_array()
            .ok_or_else(|| FormatError::Shape("valueset root must be an array".into()))?;

        let shared: HashMap<&str, &Vec<Value>> = entries
            .iter()
            .filter_map(Value::as_object)
            .filter(|e| !e.contains_key("name"))
            .filter_map(|e| {
                let guid = e.get("guid")?.as_str()?;
                let values = e.get("values")?.as_array()?;
                Some((guid, values))
            })
            .collect();

        let mut values = Vec::new();
        for histogram in entries.iter().filter_map(Value::as_object) {
            if histogram.get("name").and_then(Value::as_str) != Some(metric.chart()) {
                continue;
            }
            let diagnostics = histogram.get("diagnostics").and_then(Value::as_object);
            let stories = diagnostic_values(diagnostics, STORIES, &shared);
            if !stories.iter().any(|s| metric.matches_trace(s)) {
                continue;
            }
            if let Some(grouping) = metric.grouping() {
                let tags = diagnostic_values(diagnostics, STORY_TAGS, &shared);
                if !grouping_matches(&tags, grouping) {
                    continue;
                }
            }
            values.extend(sample_values(histogram)?);
        }

        Ok(Sample::from_values(values))
    }
}

/// Values of a GenericSet diagnostic, inline or referenced by guid.
fn diagnostic_values(
    diagnostics: Option<&Map<String, Value>>,
    key: &str,
    shared: &HashMap<&str, &Vec<Value>>,
) -> Vec<String> {
    let values = match diagnostics.and_then(|d| d.get(key)) {
        Some(Value::String(guid)) => shared.get(guid.as_str()).copied(),
        Some(Value::Object(inline)) => inline.get("values").and_then(Value::as_array),
        _ => None,
    };
    values
        .map(|vs| vs.iter().map(scalar_to_string).collect())
        .unwrap_or_default()
}

fn grouping_matches(tags: &[String], grouping: &str) -> bool {
    let joined = tags.join("_");
    joined == grouping
        || escape(&joined) == grouping
        || tags.iter().any(|t| t == grouping || escape(t) == grouping)
}

fn sample_values(histogram: &Map<String, Value>) -> Result<Vec<f64>, FormatError> {
    let Some(raw) = histogram.get("sampleValues") else {
        return Ok(Vec::new());
    };
    let raw = raw
        .as_array()
        .ok_or_else(|| FormatError::Shape("sampleValues must be an array".into()))?;
    raw.iter()
        .filter(|v| !v.is_null())
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| FormatError::Shape(format!("non-numeric sample value {v}")))
        })
        .collect()
}
