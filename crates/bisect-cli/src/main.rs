use std::sync::Arc;

use anyhow::Result;
use bisect_core::app::Scheduler;
use bisect_core::compare::{DataFormat, compare_files};
use bisect_core::impls::{ScriptedQuest, Step, arguments};
use bisect_core::ports::{IdGenerator, Quest, SystemClock, UlidGenerator};
use serde_json::json;
use tokio::sync::watch;
use tracing::info;

mod config;
mod telemetry;

use config::{AppConfig, Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse()?;
    let cfg = config::load_config(args.config.as_deref())?;

    telemetry::init(&cfg.telemetry)?;

    match args.command {
        Command::Compare {
            sample_a,
            sample_b,
            metric,
            data_format,
        } => compare(&cfg, &sample_a, &sample_b, &metric, data_format),
        Command::Demo => demo(&cfg).await,
    }
}

fn compare(
    cfg: &AppConfig,
    sample_a: &str,
    sample_b: &str,
    metric: &str,
    data_format: DataFormat,
) -> Result<()> {
    let result = compare_files(sample_a, sample_b, metric, data_format, &cfg.comparison)?;
    info!(
        %metric,
        significance = %result.significance(),
        mean_a = result.sample_a().mean(),
        mean_b = result.sample_b().mean(),
        "comparison finished"
    );
    println!("{}", serde_json::to_string(&result.to_report())?);
    Ok(())
}

/// isolate を探す → テストを走らせる → 値を読む、の 3 段パイプライン
fn demo_quests() -> Vec<Arc<dyn Quest>> {
    vec![
        Arc::new(ScriptedQuest::new(
            "find_isolate",
            vec![Step::Echo(arguments([("isolate_hash", json!("9f2c41d0"))]))],
        )),
        Arc::new(ScriptedQuest::new(
            "run_test",
            vec![
                Step::Running,
                Step::Blocked,
                Step::Echo(arguments([("isolate_output", json!("a71e03bb"))])),
            ],
        )),
        Arc::new(ScriptedQuest::new(
            "read_value",
            vec![Step::Echo(arguments([("values", json!([12.5, 12.7, 12.4]))]))],
        )),
    ]
}

async fn demo(cfg: &AppConfig) -> Result<()> {
    let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(SystemClock));
    let mut scheduler =
        Scheduler::from_spec(&demo_quests(), &cfg.job, ids, cfg.scheduler.clone())?;
    info!(attempts = scheduler.attempts().len(), "demo scheduled");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = scheduler.run(shutdown_rx).await?;
    ctrl_c.abort();
    info!(
        ticks = summary.ticks,
        stop = ?summary.stop,
        done = summary.counts.done,
        failed = summary.counts.failed,
        "demo finished"
    );

    for attempt in scheduler.attempts() {
        println!("{}", serde_json::to_string(&attempt.status())?);
    }
    Ok(())
}
