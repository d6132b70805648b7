use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use bisect_core::compare::DataFormat;
use bisect_core::config::{ComparisonConfig, SchedulerConfig};
use bisect_core::domain::{Change, JobSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub comparison: ComparisonConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Changes measured by `bisect demo`.
    #[serde(default = "AppConfig::default_job")]
    pub job: JobSpec,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            comparison: ComparisonConfig::default(),
            scheduler: SchedulerConfig::default(),
            telemetry: TelemetryConfig::default(),
            job: Self::default_job(),
        }
    }
}

impl AppConfig {
    fn default_job() -> JobSpec {
        JobSpec::new(vec![Change::new("base"), Change::new("head")])
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "TelemetryConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Compare {
        sample_a: String,
        sample_b: String,
        metric: String,
        data_format: DataFormat,
    },
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: Command,
    pub config: Option<String>,
}

pub const USAGE: &str = "\
usage:
  bisect compare <sampleA paths> <sampleB paths> <metric> [--data-format chartjson|valueset|buildbot] [--config <file>]
  bisect demo [--config <file>]";

impl Args {
    pub fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config: Option<String> = None;
        let mut data_format: Option<DataFormat> = None;
        let mut positional = Vec::new();

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--config" => {
                    let v = it.next().ok_or_else(|| anyhow!("--config needs a value"))?;
                    config = Some(v);
                }
                "--data-format" => {
                    let v = it.next().ok_or_else(|| anyhow!("--data-format needs a value"))?;
                    data_format = Some(v.parse()?);
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            Some("compare") => {
                let (Some(sample_a), Some(sample_b), Some(metric), None) = (
                    positional.next(),
                    positional.next(),
                    positional.next(),
                    positional.next(),
                ) else {
                    bail!("compare takes exactly three arguments\n{USAGE}");
                };
                Command::Compare {
                    sample_a,
                    sample_b,
                    metric,
                    data_format: data_format.unwrap_or_default(),
                }
            }
            Some("demo") => {
                if positional.next().is_some() {
                    bail!("demo takes no arguments\n{USAGE}");
                }
                Command::Demo
            }
            Some(other) => bail!("unknown command {other}\n{USAGE}"),
            None => bail!("missing command\n{USAGE}"),
        };

        Ok(Self { command, config })
    }
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let cfg = match path {
        None => AppConfig::default(),
        Some(p) => {
            let raw = fs::read_to_string(Path::new(p))
                .with_context(|| format!("failed to read config {p}"))?;
            let mut cfg: AppConfig = serde_json::from_str(&raw)
                .map_err(|e| anyhow!("invalid config json: {e}"))?;
            if cfg.telemetry.level.trim().is_empty() {
                cfg.telemetry.level = TelemetryConfig::default_level();
            }
            cfg
        }
    };
    cfg.comparison.validate()?;
    cfg.scheduler.validate()?;
    Ok(cfg)
}
