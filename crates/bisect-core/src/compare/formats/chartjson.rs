use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{FormatError, SampleSource, scalar_to_string};
use crate::compare::metric::MetricName;
use crate::compare::sample::{HistogramBucket, MAX_HISTOGRAM_VALUES, Sample};

/// Reader for chartjson output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartJsonSource;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TraceEntry {
    ListOfScalarValues {
        #[serde(default)]
        values: Vec<Option<f64>>,
        #[serde(default)]
        grouping_keys: BTreeMap<String, Value>,
    },
    Scalar {
        value: Option<f64>,
        #[serde(default)]
        grouping_keys: BTreeMap<String, Value>,
    },
    Histogram {
        #[serde(default)]
        buckets: Vec<HistogramBucket>,
        #[serde(default)]
        grouping_keys: BTreeMap<String, Value>,
    },
}

impl TraceEntry {
    fn into_sample(self) -> Result<Sample, FormatError> {
        let (sample, grouping_keys) = match self {
            TraceEntry::ListOfScalarValues { values, grouping_keys } => {
                (Sample::from_values(values.into_iter().flatten().collect()), grouping_keys)
            }
            TraceEntry::Scalar { value, grouping_keys } => {
                (Sample::from_values(value.into_iter().collect()), grouping_keys)
            }
            TraceEntry::Histogram { buckets, grouping_keys } => {
                let sample = Sample::from_histogram(&buckets).ok_or_else(|| {
                    FormatError::Shape(format!(
                        "histogram holds more than {MAX_HISTOGRAM_VALUES} values"
                    ))
                })?;
                (sample, grouping_keys)
            }
        };
        Ok(sample.with_grouping_keys(
            grouping_keys
                .iter()
                .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                .collect(),
        ))
    }
}

impl SampleSource for ChartJsonSource {
    fn extract(&self, bytes: &[u8], metric: &MetricName) -> Result<Sample, FormatError> {
        let root: Value = serde_json::from_slice(bytes)?;
        let charts = root
            .as_object()
            .ok_or_else(|| FormatError::Shape("chartjson root must be an object".into()))?
            .get("charts")
            .and_then(Value::as_object)
            .ok_or_else(|| FormatError::Shape("missing \"charts\" object".into()))?;

        let Some(chart) = charts.get(&metric.chart_key()).and_then(Value::as_object) else {
            return Ok(Sample::default());
        };

        let entry = chart
            .get(metric.trace())
            .or_else(|| {
                chart
                    .iter()
                    .find(|(name, _)| metric.matches_trace(name))
                    .map(|(_, entry)| entry)
            });
        let Some(entry) = entry else {
            return Ok(Sample::default());
        };

        let entry: TraceEntry = serde_json::from_value(entry.clone())?;
        entry.into_sample()
    }
}
