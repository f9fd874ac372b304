use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use uidmerge::atom::record::parse_records;
use uidmerge::config::Config;
use uidmerge::merge::merge_batch;

/// Merge pulled metric events recorded under isolated uids into their host uid.
#[derive(Parser)]
#[command(name = "uidmerge", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    /// Overrides the config file's log_level when given.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge a YAML file of pulled events and print the result.
    Merge {
        /// YAML list of event records.
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print version information and exit.
    Version,
}

/// Build-time version info, injected via build.rs.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let input = match cli.command {
        Command::Version => {
            println!("uidmerge {}", version::full());
            return Ok(());
        }
        Command::Merge { input } => input,
    };

    let cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(cfg.log_level.as_str());
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        isolated_uids = cfg.isolated_uids.len(),
        atoms = cfg.atoms.len(),
        "starting uidmerge",
    );

    let data = std::fs::read_to_string(&input)
        .with_context(|| format!("reading events from {}", input.display()))?;
    let events =
        parse_records(&data).with_context(|| format!("decoding events from {}", input.display()))?;
    let pulled = events.len();

    let uid_map = cfg.uid_map();
    let (merged, stats) = merge_batch(events, &uid_map, &cfg.additive_fields_by_tag())
        .context("merging pulled events")?;

    for event in &merged {
        println!("{event}");
    }

    tracing::info!(
        pulled,
        merged = merged.len(),
        rewritten_uids = stats.rewritten_uids,
        malformed = stats.malformed_events,
        "merge complete",
    );

    Ok(())
}
