//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format an optional figure, rendering absence as a visible dash
pub fn format_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, unit),
        None => "-".to_string(),
    }
}

/// Format CO2 mass, switching to kilograms past a kilogram
pub fn format_co2_g(grams: f64) -> String {
    if grams >= 1000.0 {
        format!("{:.2}kg", grams / 1000.0)
    } else {
        format!("{:.1}g", grams)
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" | "healthy" | "running" | "live" | "measured" | "high" => status.green().to_string(),
        "degraded" | "partial" | "medium" | "stale_cache" | "self_collected" | "stopped" => {
            status.yellow().to_string()
        }
        "auth_required" | "unhealthy" | "limited" | "low" | "terminated" => {
            status.red().to_string()
        }
        _ => status.to_string(),
    }
}
