//! Compare - 2 つの Sample の差を判定する
//!
//! - **sample**: 数値の Sample (histogram からの復元を含む)
//! - **metric**: `chart/trace`, `chart/grouping/story` の解析
//! - **formats**: chartjson / valueset / buildbot の読み込み
//! - **mann_whitney**: 両側 Mann-Whitney U 検定
//! - **engine**: 判定ロジックとファイル入力

pub mod engine;
pub mod formats;
pub mod mann_whitney;
pub mod metric;
pub mod sample;
pub mod significance;

pub use self::engine::{
    CompareError, ComparisonReport, ComparisonResult, ReportResult, compare_files, compare_samples,
};
pub use self::formats::{DataFormat, FormatError, SampleSource};
pub use self::mann_whitney::{MannWhitney, mann_whitney_u};
pub use self::metric::MetricName;
pub use self::sample::{HistogramBucket, MAX_HISTOGRAM_VALUES, Sample};
pub use self::significance::Significance;
