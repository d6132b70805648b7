//! Buildbot/gtest perf log reader.
//!
//! Recognised lines (an optional leading `*` marks "important" results):
//!
//! ```text
//! *RESULT DrawCallPerf_gl: score= 4123 score
//! RESULT frame: time= [16.1,16.4,15.9] ms
//! RESULT load: total= {120.5,3.2} ms
//! ```
//!
//! A `{mean,stddev}` value contributes its mean. Other lines are ignored.

use super::{FormatError, SampleSource};
use crate::compare::metric::MetricName;
use crate::compare::sample::Sample;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildbotSource;

impl SampleSource for BuildbotSource {
    fn extract(&self, bytes: &[u8], metric: &MetricName) -> Result<Sample, FormatError> {
        let text = std::str::from_utf8(bytes)?;
        let values = text
            .lines()
            .filter_map(parse_result_line)
            .filter(|line| line.chart == metric.chart() && metric.matches_trace(line.trace))
            .flat_map(|line| line.values)
            .filter(|v| v.is_finite())
            .collect();
        Ok(Sample::from_values(values))
    }
}

#[derive(Debug, PartialEq)]
struct ResultLine<'a> {
    chart: &'a str,
    trace: &'a str,
    values: Vec<f64>,
}

fn parse_result_line(line: &str) -> Option<ResultLine<'_>> {
    let line = line.trim_start();
    let line = line.strip_prefix('*').unwrap_or(line);
    let rest = line.strip_prefix("RESULT ")?;
    let (chart, rest) = rest.split_once(": ")?;
    let (trace, value) = rest.split_once('=')?;
    let (chart, trace) = (chart.trim(), trace.trim());
    if chart.is_empty() || trace.is_empty() {
        return None;
    }
    Some(ResultLine {
        chart,
        trace,
        values: parse_value(value.trim_start())?,
    })
}

fn parse_value(value: &str) -> Option<Vec<f64>> {
    if let Some(list) = value.strip_prefix('[') {
        let (list, _units) = list.split_once(']')?;
        return list
            .split(',')
            .map(|v| v.trim().parse::<f64>().ok())
            .collect();
    }
    if let Some(pair) = value.strip_prefix('{') {
        let (pair, _units) = pair.split_once('}')?;
        let (mean, _stddev) = pair.split_once(',')?;
        return mean.trim().parse::<f64>().ok().map(|m| vec![m]);
    }
    let scalar = value.split_whitespace().next()?;
    scalar.parse::<f64>().ok().map(|v| vec![v])
}
