use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric measurements of one side of a comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    values: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    grouping_keys: BTreeMap<String, String>,
}

/// One histogram bucket as written by chartjson producers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub low: f64,
    pub high: f64,
    pub count: u64,
}

/// Most values `Sample::from_histogram` rebuilds from one histogram.
pub const MAX_HISTOGRAM_VALUES: u64 = 10_000_000;

impl Sample {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            values,
            grouping_keys: BTreeMap::new(),
        }
    }

    /// Rebuild raw values from a histogram: `count` copies of each bucket
    /// midpoint, in bucket order.
    ///
    /// None when the buckets add up to more than [`MAX_HISTOGRAM_VALUES`].
    pub fn from_histogram(buckets: &[HistogramBucket]) -> Option<Self> {
        let finite = || {
            buckets
                .iter()
                .filter(|b| b.low.is_finite() && b.high.is_finite())
        };
        let total = finite().try_fold(0u64, |total, b| total.checked_add(b.count))?;
        if total > MAX_HISTOGRAM_VALUES {
            return None;
        }

        let mut values = Vec::with_capacity(total as usize);
        for b in finite() {
            let midpoint = (b.low + b.high) / 2.0;
            values.extend(std::iter::repeat_n(midpoint, b.count as usize));
        }
        Some(Self::from_values(values))
    }

    pub fn with_grouping_keys(mut self, grouping_keys: BTreeMap<String, String>) -> Self {
        self.grouping_keys = grouping_keys;
        self
    }

    /// Concatenate samples in order. Grouping keys: the first occurrence wins.
    pub fn merge<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut merged = Sample::default();
        for sample in samples {
            merged.values.extend(sample.values);
            for (key, value) in sample.grouping_keys {
                merged.grouping_keys.entry(key).or_insert(value);
            }
        }
        merged
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn grouping_keys(&self) -> &BTreeMap<String, String> {
        &self.grouping_keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean; 0.0 for an empty sample. For reporting only.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}
