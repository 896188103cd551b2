//! Sourcing commands: `source`, `exhaustive` and `bound`.

use anyhow::Result;
use clap::Args;
use lazy_pattern_core::sourcing::ordering_bound;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tabled::Tabled;

use super::registry;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct SourceArgs {
    /// Registry file (TOML)
    registry: PathBuf,

    /// Labels to apply, in order
    #[arg(required_unless_present = "order")]
    labels: Vec<String>,

    /// Source a named order from the registry file instead
    #[arg(long, conflicts_with = "labels")]
    order: Option<String>,

    /// Reject orders that violate the registry's constraints
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
pub struct ExhaustiveArgs {
    /// Registry file (TOML)
    registry: PathBuf,

    /// Stop after this many orderings
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Args)]
pub struct BoundArgs {
    /// Number of layers
    n: usize,
}

/// One row of `exhaustive` output.
#[derive(Debug, Serialize, Tabled)]
pub struct OrderingRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Order", display_with = "display_order")]
    pub order: Vec<String>,
    #[tabled(rename = "Effect", display_with = "display_effect")]
    pub effect: Value,
}

fn display_order(order: &[String]) -> String {
    if order.is_empty() {
        "(empty)".to_string()
    } else {
        order.join(" > ")
    }
}

fn display_effect(effect: &Value) -> String {
    effect.to_string()
}

pub fn source(args: SourceArgs, format: OutputFormat) -> Result<()> {
    let sourcer = registry::load(&args.registry)?;

    let merged = match &args.order {
        Some(name) => sourcer.source_registered(name)?,
        None => {
            if args.strict {
                sourcer.check(&args.labels)?;
            }
            sourcer.source(&args.labels)?
        }
    };

    output::print_item(&merged, format)
}

pub fn exhaustive(args: ExhaustiveArgs, format: OutputFormat) -> Result<()> {
    let sourcer = registry::load(&args.registry)?;
    let limit = args.limit.unwrap_or(usize::MAX);

    let rows: Vec<OrderingRow> = sourcer
        .exhaustive()
        .take(limit)
        .enumerate()
        .map(|(index, (order, effect))| OrderingRow {
            index: index + 1,
            order,
            effect,
        })
        .collect();

    output::print_list(&rows, format)?;

    if let OutputFormat::Table = format {
        output::print_detail(
            "Orderings",
            &format!("{} of at most {}", rows.len(), sourcer.ordering_bound()),
        );
    }

    Ok(())
}

pub fn bound(args: BoundArgs, format: OutputFormat) -> Result<()> {
    let bound = ordering_bound(args.n);

    match format {
        OutputFormat::Table => {
            output::print_header("Ordering Bound");
            output::print_detail("Layers", &args.n.to_string());
            output::print_detail("Orderings", &bound.to_string());
            if bound == u128::MAX {
                output::print_warning("Bound saturated");
            }
        }
        _ => output::print_item(
            &serde_json::json!({ "layers": args.n, "orderings": bound.to_string() }),
            format,
        )?,
    }

    Ok(())
}
