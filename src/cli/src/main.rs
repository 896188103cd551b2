//! lazy-pattern CLI - source layered states and exercise object pools.
//!
//! Provides commands for sourcing registry files, enumerating every valid
//! ordering, and running a concurrent pool workload.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lazy_pattern_core::config::Config;
use lazy_pattern_core::telemetry::init_telemetry;
use std::path::PathBuf;

use commands::{pool, source};
use output::OutputFormat;

/// lazy-pattern - layered sourcing and object pooling
#[derive(Parser)]
#[command(
    name = "lazy-pattern",
    version,
    about = "Layered event sourcing and async object pooling",
    long_about = "Merge labeled layers in order, enumerate every ordering a registry's constraints admit, and exercise a bounded object pool.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "LAZY_PATTERN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level directive, overriding the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the given labels from a registry file
    Source(source::SourceArgs),

    /// Print every ordering the registry admits
    Exhaustive(source::ExhaustiveArgs),

    /// Print the worst-case ordering count for n layers
    Bound(source::BoundArgs),

    /// Run concurrent leases against a splitter pool
    PoolDemo(pool::PoolDemoArgs),
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("Configuration path is not UTF-8")?;
            Config::from_file(path).with_context(|| format!("Failed to load {}", path))?
        }
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.no_color {
        config.logging.ansi = false;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = async {
        let config = load_config(&cli)?;
        init_telemetry(&config.telemetry())?;

        match cli.command {
            Commands::Source(args) => source::source(args, format),
            Commands::Exhaustive(args) => source::exhaustive(args, format),
            Commands::Bound(args) => source::bound(args, format),
            Commands::PoolDemo(args) => pool::execute(args, &config, format).await,
        }
    }
    .await;

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
