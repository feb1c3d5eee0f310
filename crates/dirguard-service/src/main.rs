use anyhow::{Context, Result};
use clap::Parser;
use dirguard_core::config::{DEFAULT_BASELINE, DEFAULT_INTERVAL_SECS, DEFAULT_LOG, DEFAULT_ROOT};
use dirguard_core::security_log::format_timestamp;
use dirguard_core::{log_stats, HashAlgorithm, Monitor, MonitorConfig, SecurityLog, SmtpConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod logging;
mod mailer;
mod poll;

const STATUS_TAIL_LINES: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Directory integrity watcher (polling)", long_about = None)]
struct Cli {
    /// Directory to monitor
    #[arg(long, default_value = DEFAULT_ROOT)]
    dir: PathBuf,
    /// Path to the baseline hash DB (JSON)
    #[arg(long, default_value = DEFAULT_BASELINE)]
    hash_db: PathBuf,
    /// Path to the security log
    #[arg(long, default_value = DEFAULT_LOG)]
    log: PathBuf,
    /// Keep checking at a fixed interval
    #[arg(long)]
    watch: bool,
    /// Polling interval in seconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,
    /// Update the baseline on added, deleted and modified files
    #[arg(long)]
    auto_update: bool,
    /// SMTP config JSON (optional)
    #[arg(long)]
    smtp_config: Option<PathBuf>,
    /// Content digest algorithm
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    algorithm: HashAlgorithm,
    /// Rebuild a corrupt baseline from the current files instead of failing
    #[arg(long)]
    rebuild_baseline: bool,
    /// Print counts and recent lines from the security log, then exit
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    if cli.status {
        return print_status(&cli.log);
    }

    let mut config = MonitorConfig {
        root: cli.dir,
        baseline_path: cli.hash_db,
        log_path: cli.log,
        interval_secs: cli.interval,
        auto_update: cli.auto_update,
        algorithm: cli.algorithm,
        rebuild_baseline: cli.rebuild_baseline,
        ..MonitorConfig::default()
    };
    let log = Arc::new(SecurityLog::open(&config.log_path).with_context(|| {
        format!("cannot open security log {}", config.log_path.display())
    })?);

    let smtp = match &cli.smtp_config {
        Some(path) => {
            let loaded = SmtpConfig::load(path)?;
            if loaded.is_none() {
                log.warning("SMTP config file not found, email alerts will be simulated.");
            }
            loaded
        }
        None => None,
    };
    if let Some(to) = smtp.as_ref().and_then(|c| c.to_addr.clone()) {
        config.recipient = to;
    }
    let notifier = mailer::notifier_for(smtp.as_ref());

    let interval = config.interval();
    let root = config.root.clone();
    let monitor = Arc::new(Monitor::new(config, notifier, log.clone()));

    if !cli.watch {
        let report = tokio::task::spawn_blocking(move || monitor.run_cycle()).await??;
        let last = report
            .counts
            .last_anomaly
            .map(format_timestamp)
            .unwrap_or_else(|| "None".to_string());
        println!(
            "Done. Safe: {}, Corrupted: {}, Last anomaly: {}",
            report.counts.safe, report.counts.corrupted, last
        );
        return Ok(());
    }

    let stop = poll::interrupt().context("cannot install ctrl-c handler")?;
    log.info(&format!(
        "Starting watcher on {}, interval {}s.",
        root.display(),
        interval.as_secs()
    ));
    info!(root = %root.display(), "watch loop starting");
    poll::run_watch(monitor, log, interval, stop).await;
    Ok(())
}

fn print_status(log_path: &std::path::Path) -> Result<()> {
    let summary = log_stats::summarize(log_path)?;
    let logs = log_stats::tail(log_path, STATUS_TAIL_LINES)?;
    let status = serde_json::json!({
        "safe": summary.safe,
        "corrupted": summary.corrupted,
        "last_anomaly": summary.last_anomaly,
        "logs": logs,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
