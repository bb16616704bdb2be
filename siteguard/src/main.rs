//! siteguard - command-line screening tool
//!
//! Reads sites (and hazard features) as JSON, screens them, and prints a JSON
//! report to stdout. Logs go to stderr, or to `[logging] file` when set.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use siteguard::resolution::{ResolutionStats, StatsSnapshot};
use siteguard::screening::{Screener, SiteVerdict, DEFAULT_CONCURRENCY};
use siteguard::types::{HazardFeature, SiteRecord};
use siteguard::SiteGuardToml;
use siteguard_common::config::{load_or_default, ConfigFileResolver, ConfigSource, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for siteguard
#[derive(Parser, Debug)]
#[command(name = "siteguard")]
#[command(about = "Environmental hazard screening for candidate sites")]
#[command(version)]
struct Args {
    /// Config file (overrides SITEGUARD_CONFIG and the default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify sites by distance to regulated hazard features
    Proximity {
        /// JSON array of site records
        #[arg(long)]
        sites: PathBuf,

        /// JSON array of hazard features
        #[arg(long)]
        hazards: PathBuf,
    },

    /// Resolve flood classification for each site through the provider chain
    Flood {
        /// JSON array of site records
        #[arg(long)]
        records: PathBuf,

        /// Sites resolved concurrently
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
}

#[derive(Serialize)]
struct Report {
    generated_at: DateTime<Utc>,
    verdicts: Vec<SiteVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StatsSnapshot>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let source = ConfigFileResolver::new(args.config.clone()).resolve();
    let config: SiteGuardToml = load_or_default(&source).context("Failed to load configuration")?;

    init_logging(&config.logging)?;
    match source.path() {
        Some(path) => info!(source = describe(&source), "Configuration: {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }
    info!("SiteGuard {}", env!("CARGO_PKG_VERSION"));

    let screener = Screener::from_config(&config).context("Invalid configuration")?;

    let report = match args.command {
        Command::Proximity { sites, hazards } => {
            let sites: Vec<SiteRecord> = read_json(&sites)?;
            let hazards: Vec<HazardFeature> = read_json(&hazards)?;
            info!(sites = sites.len(), hazards = hazards.len(), "Proximity screening");

            Report {
                generated_at: Utc::now(),
                verdicts: screener
                    .screen_proximity_batch(&sites, &hazards)
                    .context("Proximity screening failed")?,
                stats: None,
            }
        }
        Command::Flood {
            records,
            concurrency,
        } => {
            let records: Vec<SiteRecord> = read_json(&records)?;
            info!(sites = records.len(), concurrency, "Flood screening");

            let stats = ResolutionStats::new();
            let verdicts = screener
                .screen_flood_batch(&records, &stats, concurrency)
                .await
                .context("Flood screening failed")?;

            Report {
                generated_at: Utc::now(),
                verdicts,
                stats: Some(stats.snapshot()),
            }
        }
    };

    let eliminated = report.verdicts.iter().filter(|v| v.verdict.eliminate()).count();
    info!(
        screened = report.verdicts.len(),
        eliminated,
        "Screening complete"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn describe(source: &ConfigSource) -> &'static str {
    match source {
        ConfigSource::CommandLine(_) => "command line",
        ConfigSource::Environment(_) => "environment",
        ConfigSource::UserConfig(_) => "user config",
        ConfigSource::SystemConfig(_) => "system config",
        ConfigSource::CompiledDefaults => "compiled defaults",
    }
}
