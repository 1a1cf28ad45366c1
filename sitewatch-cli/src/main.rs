mod display;
mod schedule;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use sitewatch_core::colors::CatppuccinExt;
use sitewatch_core::output::{get_formatter, OutputFormat, OutputFormatter};
use sitewatch_core::{alert, MonitorConfig, RoundRunner, Settings, SiteChecker, SiteConfig};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use display::{ProgressWriterFactory, RoundProgress, Spinner};
use schedule::{DailyTracker, Schedule, DAILY_TICK};

const DEFAULT_CONFIG: &str = "sites.toml";

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(about = "Website monitor - availability, response time, certificate and domain expiry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Site list and settings (TOML); defaults to $SITES_FILE, then sites.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CSV log to append results to, instead of the configured one
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format (human or json)
    #[arg(short, long, default_value = "human", global = true)]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every enabled site once and append the results to the log
    RunNow,
    /// Keep checking on the configured schedule until Ctrl-C
    Watch,
    /// Check a single URL with default settings; nothing is logged
    Check {
        /// URL to check
        url: String,
    },
}

#[tokio::main]
async fn main() {
    // Before tracing and config, both read the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(ProgressWriterFactory)
        .init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("{} {:#}", "Error:".ctp_red(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG`, else `LOG_LEVEL`, else info.
fn env_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level.trim().to_lowercase()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let output_format: OutputFormat = cli.format.parse().unwrap_or_default();
    let config_path = cli
        .config
        .or_else(|| std::env::var_os("SITES_FILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    match cli.command {
        Commands::RunNow => {
            let config = load_config(&config_path, cli.log_file)?;
            let formatter = get_formatter(output_format, config.settings.ssl_alert_days);
            let runner = RoundRunner::from_config(&config).with_sinks(alert::sinks_from_env());
            run_round(&config, &runner, formatter.as_ref()).await;
        }
        Commands::Watch => {
            let config = load_config(&config_path, cli.log_file)?;
            let formatter = get_formatter(output_format, config.settings.ssl_alert_days);
            let runner = RoundRunner::from_config(&config).with_sinks(alert::sinks_from_env());
            watch(&config, &runner, formatter.as_ref()).await?;
        }
        Commands::Check { url } => {
            let settings = check_settings(&config_path)?;
            let formatter = get_formatter(output_format, settings.ssl_alert_days);
            let site = SiteConfig::new(url.clone(), url.clone(), &settings);
            let checker = SiteChecker::new(&settings);

            let spinner = Spinner::checking(&url);
            let report = checker.check(&site).await;
            drop(spinner);

            let report = report.context("site was not checked")?;
            println!("{}", formatter.format_record(&report.record));
        }
    }

    Ok(())
}

fn load_config(path: &Path, log_file: Option<PathBuf>) -> anyhow::Result<MonitorConfig> {
    let mut config = MonitorConfig::load(path)
        .with_context(|| format!("could not load configuration from {}", path.display()))?;
    if let Some(log_file) = log_file {
        config.settings.log_file = log_file;
    }
    info!(
        path = %path.display(),
        sites = config.sites.len(),
        enabled = config.enabled_sites().count(),
        log_file = %config.settings.log_file.display(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Settings for `check`: the config file's when there is one, otherwise
/// defaults with environment overrides.
fn check_settings(path: &Path) -> anyhow::Result<Settings> {
    if path.exists() {
        return Ok(load_config(path, None)?.settings);
    }
    debug!(path = %path.display(), "No configuration file, using defaults");
    let mut settings = Settings::default();
    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}

async fn run_round(config: &MonitorConfig, runner: &RoundRunner, formatter: &dyn OutputFormatter) {
    let progress = RoundProgress::new(config.enabled_sites().count());
    let summary = runner.run(&config.sites, Some(progress.callback())).await;
    drop(progress);

    println!("{}", formatter.format_round(&summary));
}

async fn watch(
    config: &MonitorConfig,
    runner: &RoundRunner,
    formatter: &dyn OutputFormatter,
) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    match Schedule::from_settings(&config.settings) {
        Schedule::Interval(period) => {
            info!(interval_secs = period.as_secs(), "Watching at a fixed interval");
            let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    result = &mut shutdown => {
                        result.context("failed to listen for Ctrl-C")?;
                        break;
                    }
                    _ = ticker.tick() => run_round(config, runner, formatter).await,
                }
            }
        }
        Schedule::Daily(times) => {
            let labels: Vec<String> = times.iter().map(|t| t.format("%H:%M").to_string()).collect();
            info!(times = %labels.join(", "), "Watching at daily times");
            let mut tracker = DailyTracker::new(times);
            let mut ticker = tokio::time::interval(DAILY_TICK);

            loop {
                tokio::select! {
                    result = &mut shutdown => {
                        result.context("failed to listen for Ctrl-C")?;
                        break;
                    }
                    _ = ticker.tick() => {
                        if tracker.due(Local::now().naive_local()) {
                            run_round(config, runner, formatter).await;
                        }
                    }
                }
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}
