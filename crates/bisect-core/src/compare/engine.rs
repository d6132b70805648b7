//! Comparison engine
//!
//! # 判定
//! 1. どちらかの Sample が空 → NEED_MORE_DATA (統計は計算しない)
//! 2. Mann-Whitney の p < alpha → REJECT
//! 3. どちらかの Sample が required_sample_size 未満 → NEED_MORE_DATA
//! 4. それ以外 → FAIL_TO_REJECT
//!
//! # ファイル入力
//! Missing files are hard errors, detected before anything is read.
//! Malformed files only degrade to an empty sample.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::formats::DataFormat;
use super::mann_whitney::{MannWhitney, mann_whitney_u};
use super::metric::MetricName;
use super::sample::Sample;
use super::significance::Significance;
use crate::config::ComparisonConfig;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid metric name {0:?}: expected <chart>/<trace> or <chart>/<grouping>/<story>")]
    InvalidMetric(String),

    #[error("unknown data format {0:?}: expected chartjson, valueset or buildbot")]
    UnknownDataFormat(String),

    #[error("no input files given for sample {side}")]
    NoInputFiles { side: &'static str },

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Verdict plus the samples it was computed from. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    significance: Significance,
    statistics: Option<MannWhitney>,
    sample_a: Sample,
    sample_b: Sample,
}

impl ComparisonResult {
    pub fn significance(&self) -> Significance {
        self.significance
    }

    /// None when a sample was empty and no test was run.
    pub fn statistics(&self) -> Option<MannWhitney> {
        self.statistics
    }

    pub fn sample_a(&self) -> &Sample {
        &self.sample_a
    }

    pub fn sample_b(&self) -> &Sample {
        &self.sample_b
    }

    pub fn to_report(&self) -> ComparisonReport {
        ComparisonReport {
            result: ReportResult {
                significance: self.significance,
                u: self.statistics.map(|s| s.u),
                p: self.statistics.map(|s| s.p),
            },
            sample_a: self.sample_a.values().to_vec(),
            sample_b: self.sample_b.values().to_vec(),
        }
    }
}

/// Wire form printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub result: ReportResult,
    #[serde(rename = "sampleA")]
    pub sample_a: Vec<f64>,
    #[serde(rename = "sampleB")]
    pub sample_b: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub significance: Significance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
}

pub fn compare_samples(a: Sample, b: Sample, config: &ComparisonConfig) -> ComparisonResult {
    if a.is_empty() || b.is_empty() {
        debug!(len_a = a.len(), len_b = b.len(), "empty sample; not testing");
        return ComparisonResult {
            significance: Significance::NeedMoreData,
            statistics: None,
            sample_a: a,
            sample_b: b,
        };
    }

    let statistics = mann_whitney_u(a.values(), b.values());
    let significance = if statistics.p < config.alpha {
        Significance::Reject
    } else if a.len() < config.required_sample_size || b.len() < config.required_sample_size {
        Significance::NeedMoreData
    } else {
        Significance::FailToReject
    };
    debug!(
        len_a = a.len(),
        len_b = b.len(),
        u = statistics.u,
        p = statistics.p,
        %significance,
        "samples compared"
    );

    ComparisonResult {
        significance,
        statistics: Some(statistics),
        sample_a: a,
        sample_b: b,
    }
}

/// Compare `metric` between two comma-separated lists of files.
pub fn compare_files(
    paths_a: &str,
    paths_b: &str,
    metric: &str,
    format: DataFormat,
    config: &ComparisonConfig,
) -> Result<ComparisonResult, CompareError> {
    let metric = MetricName::parse(metric)?;
    let paths_a = split_paths(paths_a);
    let paths_b = split_paths(paths_b);
    if paths_a.is_empty() {
        return Err(CompareError::NoInputFiles { side: "A" });
    }
    if paths_b.is_empty() {
        return Err(CompareError::NoInputFiles { side: "B" });
    }

    for path in paths_a.iter().chain(&paths_b) {
        ensure_exists(path)?;
    }

    let sample_a = load_side(&paths_a, &metric, format)?;
    let sample_b = load_side(&paths_b, &metric, format)?;
    Ok(compare_samples(sample_a, sample_b, config))
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn ensure_exists(path: &Path) -> Result<(), CompareError> {
    match std::fs::metadata(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(CompareError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CompareError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_side(
    paths: &[PathBuf],
    metric: &MetricName,
    format: DataFormat,
) -> Result<Sample, CompareError> {
    let source = format.source();
    let mut samples = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path).map_err(|source| CompareError::Io {
            path: path.clone(),
            source,
        })?;
        match source.extract(&bytes, metric) {
            Ok(sample) => {
                debug!(path = %path.display(), values = sample.len(), "sample extracted");
                samples.push(sample);
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    %format,
                    %metric,
                    error = %err,
                    "could not read sample; treating it as empty"
                );
            }
        }
    }
    Ok(Sample::merge(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn around(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn chart(chart: &str, trace: &str, values: &[f64]) -> Value {
        json!({ "charts": { chart: { trace: {
            "type": "list_of_scalar_values",
            "values": values
        }}}})
    }

    struct Fixtures {
        dir: TempDir,
        next: usize,
    }

    impl Fixtures {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                next: 0,
            }
        }

        fn write(&mut self, contents: &[u8]) -> String {
            self.next += 1;
            let path = self.dir.path().join(format!("sample-{}.json", self.next));
            std::fs::write(&path, contents).unwrap();
            path.to_str().unwrap().to_string()
        }

        fn json(&mut self, doc: &Value) -> String {
            self.write(&serde_json::to_vec(doc).unwrap())
        }
    }

    fn config() -> ComparisonConfig {
        ComparisonConfig::default()
    }

    #[test]
    fn clear_regression_is_rejected() {
        let mut fx = Fixtures::new();
        let lower = fx.json(&chart("some_chart", "some_trace", &around(9.1, 0.2, 10)));
        let higher = fx.json(&chart("some_chart", "some_trace", &around(18.5, 0.3, 10)));

        let result = compare_files(
            &lower,
            &higher,
            "some_chart/some_trace",
            DataFormat::ChartJson,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::Reject);
        assert_eq!(result.sample_a().len(), 10);
    }

    #[test]
    fn small_near_identical_samples_need_more_data() {
        let mut fx = Fixtures::new();
        let a = fx.json(&chart("c", "t", &[9.8, 10.1, 10.3, 9.6, 10.0]));
        let b = fx.json(&chart("c", "t", &[10.2, 9.9, 10.4, 9.7, 10.05]));

        let result = compare_files(&a, &b, "c/t", DataFormat::ChartJson, &config()).unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert!(result.statistics().is_some());
    }

    #[test]
    fn multiple_runs_of_the_same_distribution_fail_to_reject() {
        let mut fx = Fixtures::new();
        let a_values = around(10.0, 0.2, 20);
        let b_values = around(10.1, 0.2, 20);
        let a: Vec<String> = a_values.chunks(5).map(|c| fx.json(&chart("c", "t", c))).collect();
        let b: Vec<String> = b_values.chunks(5).map(|c| fx.json(&chart("c", "t", c))).collect();

        let result = compare_files(
            &a.join(","),
            &b.join(","),
            "c/t",
            DataFormat::ChartJson,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::FailToReject);
        assert_eq!(result.sample_a().values(), a_values.as_slice());
        assert_eq!(result.sample_b().len(), 20);
    }

    #[test]
    fn file_against_itself_needs_more_data_with_equal_means() {
        let mut fx = Fixtures::new();
        let path = fx.json(&chart("c", "t", &around(10.0, 0.5, 10)));

        let result = compare_files(&path, &path, "c/t", DataFormat::ChartJson, &config()).unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert_eq!(result.sample_a().mean(), result.sample_b().mean());
    }

    #[test]
    fn missing_trace_needs_more_data() {
        let mut fx = Fixtures::new();
        let a = fx.json(&chart("some_chart", "some_trace", &around(9.0, 0.2, 5)));
        let b = fx.json(&chart("some_chart", "some_trace", &around(19.0, 0.4, 5)));

        let result = compare_files(
            &a,
            &b,
            "some_chart/missing_trace",
            DataFormat::ChartJson,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert_eq!(result.statistics(), None);
        assert!(result.sample_a().is_empty());
    }

    #[test]
    fn missing_file_is_a_hard_error() {
        let mut fx = Fixtures::new();
        let a = fx.json(&chart("c", "t", &[1.0, 2.0]));

        let err = compare_files(
            &a,
            "/path/does/not/exist.json",
            "c/t",
            DataFormat::ChartJson,
            &config(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            CompareError::FileNotFound { path } if path == Path::new("/path/does/not/exist.json")
        ));
    }

    #[test]
    fn empty_path_list_is_a_hard_error() {
        let mut fx = Fixtures::new();
        let a = fx.json(&chart("c", "t", &[1.0, 2.0]));

        let err = compare_files("", &a, "c/t", DataFormat::ChartJson, &config()).unwrap_err();
        assert!(matches!(err, CompareError::NoInputFiles { side: "A" }));

        let err = compare_files(&a, " , ,", "c/t", DataFormat::ChartJson, &config()).unwrap_err();
        assert!(matches!(err, CompareError::NoInputFiles { side: "B" }));
    }

    #[test]
    fn oversized_histogram_degrades_to_empty_sample() {
        let mut fx = Fixtures::new();
        let path = fx.json(&json!({ "charts": { "c": { "t": {
            "type": "histogram",
            "buckets": [{ "low": 1.0, "high": 2.0, "count": u64::MAX }]
        }}}}));

        let result = compare_files(&path, &path, "c/t", DataFormat::ChartJson, &config()).unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert!(result.sample_a().is_empty());
    }

    #[test]
    fn invalid_metric_is_a_hard_error() {
        let err = compare_files("a.json", "b.json", "no_slash", DataFormat::ChartJson, &config())
            .unwrap_err();
        assert!(matches!(err, CompareError::InvalidMetric(_)));
    }

    #[test]
    fn bad_chart_degrades_to_empty_sample() {
        let mut fx = Fixtures::new();
        let good = fx.json(&chart("c", "t", &around(9.0, 0.2, 5)));
        let bad = fx.json(&json!(["obviously", "not", "a", "chart]"]));

        let result = compare_files(&good, &bad, "c/t", DataFormat::ChartJson, &config()).unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert!(result.sample_b().is_empty());
    }

    #[test]
    fn histograms_are_compared_by_reconstructed_values() {
        let mut fx = Fixtures::new();
        let histogram = |buckets: Value| {
            json!({ "charts": { "c": { "t": { "type": "histogram", "buckets": buckets }}}})
        };
        let lower = fx.json(&histogram(json!([
            { "low": 9.0, "high": 10.0, "count": 10 },
            { "low": 10.0, "high": 11.0, "count": 10 }
        ])));
        let higher = fx.json(&histogram(json!([
            { "low": 19.0, "high": 21.0, "count": 20 }
        ])));

        let result =
            compare_files(&lower, &higher, "c/t", DataFormat::ChartJson, &config()).unwrap();

        assert_eq!(result.significance(), Significance::Reject);
        assert_eq!(result.sample_a().mean(), 10.0);
        assert_eq!(result.sample_b().mean(), 20.0);
    }

    #[test]
    fn complex_metric_name_reads_grouped_chart() {
        let mut fx = Fixtures::new();
        let chart_key = "blank_about@@memory:chrome:all_processes:reported_by_os:\
                         system_memory:native_heap:proportional_resident_size_avg";
        let grouped = |values: &[f64]| {
            json!({ "charts": { chart_key: { "blank:about:blank": {
                "type": "list_of_scalar_values",
                "values": values,
                "grouping_keys": { "0": "blank", "1": "about" }
            }}}})
        };
        let lower = fx.json(&grouped(&around(9.1, 0.2, 10)));
        let higher = fx.json(&grouped(&around(18.5, 0.3, 10)));

        let result = compare_files(
            &lower,
            &higher,
            "memory:chrome:all_processes:reported_by_os:system_memory:native_heap:\
             proportional_resident_size_avg/blank_about/blank_about_blank",
            DataFormat::ChartJson,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::Reject);
        assert_eq!(result.sample_a().grouping_keys()["1"], "about");
    }

    #[test]
    fn valueset_against_itself_needs_more_data() {
        let mut fx = Fixtures::new();
        let path = fx.json(&json!([
            { "guid": "s", "type": "GenericSet", "values": ["http://www.rambler.ru/"] },
            {
                "name": "timeToFirstContentfulPaint",
                "sampleValues": [75.25, 75.5, 75.0, null, 75.25],
                "diagnostics": {
                    "stories": "s",
                    "storyTags": { "type": "GenericSet", "values": ["pcv1-cold"] }
                }
            }
        ]));

        let result = compare_files(
            &path,
            &path,
            "timeToFirstContentfulPaint/pcv1-cold/http___www.rambler.ru_",
            DataFormat::ValueSet,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert_eq!(result.sample_a().mean(), 75.25);
        assert_eq!(result.sample_b().mean(), 75.25);
    }

    #[test]
    fn buildbot_log_against_itself_needs_more_data() {
        let mut fx = Fixtures::new();
        let log = concat!(
            "[ RUN      ] DrawCallPerf.Run/gl\n",
            "*RESULT DrawCallPerf_gl: score= 4123 score\n",
        );
        let path = fx.write(log.as_bytes());

        let result = compare_files(
            &path,
            &path,
            "DrawCallPerf_gl/score",
            DataFormat::Buildbot,
            &config(),
        )
        .unwrap();

        assert_eq!(result.significance(), Significance::NeedMoreData);
        assert_eq!(result.sample_a().mean(), 4123.0);
        assert_eq!(result.statistics().map(|s| s.p), Some(1.0));
    }

    #[test]
    fn report_wire_form() {
        let result = compare_samples(
            Sample::from_values(vec![1.0]),
            Sample::from_values(vec![1.0]),
            &config(),
        );

        let v = serde_json::to_value(result.to_report()).unwrap();

        assert_eq!(v["result"]["significance"], "NEED_MORE_DATA");
        assert_eq!(v["result"]["p"], 1.0);
        assert_eq!(v["sampleA"], json!([1.0]));
        assert_eq!(v["sampleB"], json!([1.0]));
    }

    #[test]
    fn report_omits_statistics_when_not_tested() {
        let result = compare_samples(Sample::default(), Sample::from_values(vec![1.0]), &config());

        let v = serde_json::to_value(result.to_report()).unwrap();

        assert_eq!(v["result"], json!({ "significance": "NEED_MORE_DATA" }));
    }

    #[test]
    fn comparison_is_deterministic() {
        let a = Sample::from_values(around(9.1, 0.2, 10));
        let b = Sample::from_values(around(18.5, 0.3, 10));

        let first = compare_samples(a.clone(), b.clone(), &config());
        let second = compare_samples(a, b, &config());

        assert_eq!(first, second);
    }

    #[test]
    fn alpha_is_configurable() {
        let a = Sample::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = Sample::from_values(vec![6.0, 7.0, 8.0, 9.0, 10.0]);
        let loose = ComparisonConfig {
            alpha: 0.05,
            ..Default::default()
        };

        let strict = compare_samples(a.clone(), b.clone(), &config());
        let relaxed = compare_samples(a, b, &loose);

        assert_eq!(strict.significance(), Significance::NeedMoreData);
        assert_eq!(relaxed.significance(), Significance::Reject);
    }
}
