//! Output formatting utilities for the Vault CLI.
//!
//! Supports table, JSON, and YAML output formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use std::io::Write;
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

/// Write a success line.
pub fn write_success(out: &mut impl Write, msg: &str) -> std::io::Result<()> {
    writeln!(out, "{} {}", "[OK]".green().bold(), msg)
}

/// Write an access-denied line.
pub fn write_denied(out: &mut impl Write, msg: &str) -> std::io::Result<()> {
    writeln!(out, "{} {}", "[DENIED]".yellow().bold(), msg)
}

/// Write an error line. Session errors go to the session's own stream.
pub fn write_error(out: &mut impl Write, msg: &str) -> std::io::Result<()> {
    writeln!(out, "{} {}", "[ERROR]".red().bold(), msg)
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// Print a success message to stdout.
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// Print a denial to stdout.
pub fn print_denied(msg: &str) {
    println!("{} {}", "[DENIED]".yellow().bold(), msg);
}

/// Print a list of items in the requested format.
///
/// For table output, items must implement `Tabled`. For JSON/YAML, items must
/// implement `Serialize`.
pub fn print_list<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No results found.".dimmed());
                return Ok(());
            }
            let table = Table::new(items)
                .with(Style::rounded())
                .with(Modify::new(Columns::first()).with(Alignment::left()))
                .to_string();
            println!("{}", table);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
    }
    Ok(())
}

/// Print a single item as JSON or YAML.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item)?);
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
    }
    Ok(())
}

/// Write a section header.
pub fn write_header(out: &mut impl Write, title: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", title.bold().underline())?;
    writeln!(out)
}
