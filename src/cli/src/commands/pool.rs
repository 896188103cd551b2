//! `pool-demo`: concurrent leases against a pool of text splitters.

use anyhow::{Context, Result};
use clap::Args;
use lazy_pattern_core::config::Config;
use lazy_pattern_core::pool::{ObjectPool, ObjectPoolStats, PoolConfig, Recyclable};
use lazy_pattern_core::ErrorCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabled::Tabled;

use crate::output::{self, OutputFormat};

const SAMPLE: &str = "the quick brown fox jumps over the lazy dog";

#[derive(Args)]
pub struct PoolDemoArgs {
    /// Concurrent leases to run
    #[arg(short, long, default_value_t = 32)]
    tasks: usize,

    /// Ceiling on live splitters (defaults to the configured pool)
    #[arg(long)]
    max_live: Option<usize>,

    /// Splitters built before the first lease
    #[arg(long)]
    min_warm: Option<usize>,

    /// How long a lease may wait, e.g. `500ms` or `2s`
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// How long each task holds its splitter
    #[arg(long, default_value = "5ms", value_parser = parse_duration)]
    hold: Duration,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}

/// Splits text into tokens on a delimiter chosen per lease.
#[derive(Debug, Default)]
pub struct Splitter {
    delimiter: Option<char>,
    splits: usize,
}

impl Splitter {
    pub fn split(&mut self, text: &str) -> Vec<String> {
        self.splits += 1;
        match self.delimiter {
            Some(delimiter) => text
                .split(delimiter)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
            None => text.split_whitespace().map(str::to_string).collect(),
        }
    }
}

impl Recyclable for Splitter {
    type Args = Option<char>;

    fn initialize(&mut self, delimiter: Option<char>) {
        self.delimiter = delimiter;
    }

    fn reset(&mut self) {
        self.delimiter = None;
    }
}

#[derive(Debug, Default, Serialize)]
struct DemoOutcome {
    completed: usize,
    exhausted: usize,
    failed: usize,
    tokens: usize,
    elapsed_ms: u64,
}

#[derive(Serialize, Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct DemoReport<'a> {
    outcome: &'a DemoOutcome,
    stats: &'a ObjectPoolStats,
}

pub async fn execute(args: PoolDemoArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let mut settings = config.pool.clone();
    settings.name = "splitters".to_string();
    if let Some(max_live) = args.max_live {
        settings.max_live = max_live;
    }
    match args.min_warm {
        Some(min_warm) => settings.min_warm = min_warm,
        None => settings.min_warm = settings.min_warm.min(settings.max_live),
    }
    if let Some(timeout) = args.timeout {
        settings.acquire_timeout = timeout;
    }

    let pool = Arc::new(ObjectPool::new(PoolConfig::from_settings(
        &settings,
        || async { Ok::<_, lazy_pattern_core::PatternError>(Splitter::default()) },
    ))?);
    pool.prewarm().await?;

    let started = Instant::now();
    let handles: Vec<_> = (0..args.tasks)
        .map(|i| {
            let pool = Arc::clone(&pool);
            let hold = args.hold;
            tokio::spawn(async move {
                let delimiter = if i % 2 == 0 { None } else { Some(' ') };
                pool.lease(move |splitter| {
                    Box::pin(async move {
                        splitter.initialize(delimiter);
                        let tokens = splitter.split(SAMPLE).len();
                        tokio::time::sleep(hold).await;
                        Ok(tokens)
                    })
                })
                .await
            })
        })
        .collect();

    let mut outcome = DemoOutcome::default();
    for handle in handles {
        match handle.await.context("Lease task panicked")? {
            Ok(tokens) => {
                outcome.completed += 1;
                outcome.tokens += tokens;
            }
            Err(e) if e.code() == ErrorCode::PoolExhausted => outcome.exhausted += 1,
            Err(e) => {
                tracing::warn!(error = %e, "Lease failed");
                outcome.failed += 1;
            }
        }
    }
    outcome.elapsed_ms = started.elapsed().as_millis() as u64;

    let stats = pool.stats();
    pool.close()?;

    match format {
        OutputFormat::Table => {
            output::print_header("Pool Demo");
            output::print_list(&stat_rows(&outcome, &stats), format)?;
            if outcome.exhausted > 0 {
                output::print_warning(&format!(
                    "{} leases timed out after {:?}",
                    outcome.exhausted, settings.acquire_timeout
                ));
            } else {
                output::print_success(&format!("{} leases completed", outcome.completed));
            }
        }
        _ => output::print_item(
            &DemoReport {
                outcome: &outcome,
                stats: &stats,
            },
            format,
        )?,
    }

    Ok(())
}

fn stat_rows(outcome: &DemoOutcome, stats: &ObjectPoolStats) -> Vec<StatRow> {
    let row = |metric, value: String| StatRow { metric, value };
    vec![
        row("completed", outcome.completed.to_string()),
        row("exhausted", outcome.exhausted.to_string()),
        row("failed", outcome.failed.to_string()),
        row("tokens", outcome.tokens.to_string()),
        row("elapsed", format!("{} ms", outcome.elapsed_ms)),
        row("max_live", stats.max_live.to_string()),
        row("constructions", stats.constructions.to_string()),
        row("fetches", stats.fetches.to_string()),
        row("hit_rate", format!("{:.1}%", stats.hit_rate() * 100.0)),
        row("waits", stats.waits.to_string()),
        row("timeouts", stats.timeouts.to_string()),
        row("peak_leased", stats.peak_leased.to_string()),
        row("avg_wait", format!("{} us", stats.avg_wait_time_us)),
    ]
}
