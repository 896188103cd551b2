//! Output formatting for the lazy-pattern CLI.
//!
//! Structured results go to stdout as a table, JSON or YAML. Status lines go
//! to stderr so piped output stays machine-readable.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

/// Output format selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Render as a formatted table
    #[default]
    Table,
    /// Render as JSON
    Json,
    /// Render as YAML
    Yaml,
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Render rows as a rounded table with a left-aligned first column.
pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::left()))
        .to_string()
}

/// Serialize a value for the structured formats. Tables fall back to JSON.
pub fn render_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Table | OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    Ok(rendered)
}

/// Print rows as a table, or as a structured list.
pub fn print_list<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("{}", "No results found.".dimmed()),
        OutputFormat::Table => println!("{}", render_table(rows)),
        _ => print!("{}", render_structured(rows, format)?),
    }
    Ok(())
}

/// Print a single item in a structured format.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) -> Result<()> {
    print!("{}", render_structured(item, format)?);
    Ok(())
}

pub fn print_detail(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().underline());
    println!();
}
