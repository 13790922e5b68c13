//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability in [0, 1] as a percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Color probability by the same cut points as the risk tiers
pub fn color_probability(probability: f64) -> String {
    let formatted = format_probability(probability);
    if probability >= 0.7 {
        formatted.red().to_string()
    } else if probability >= 0.4 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

pub fn color_risk(risk: &str) -> String {
    match risk {
        "Very High" => risk.red().bold().to_string(),
        "High" => risk.red().to_string(),
        "Medium" => risk.yellow().to_string(),
        "Low" => risk.green().to_string(),
        _ => risk.to_string(),
    }
}

pub fn color_label(label: &str) -> String {
    match label {
        "Churn" => label.red().to_string(),
        "No Churn" => label.green().to_string(),
        _ => label.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "connected" | "loaded" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "disconnected" | "not loaded" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn color_impact(impact: &str) -> String {
    match impact {
        "positive" => impact.red().to_string(),
        "negative" => impact.green().to_string(),
        _ => impact.dimmed().to_string(),
    }
}

/// Shorten a UUID for table display
pub fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}

/// Shorten an RFC 3339 timestamp to minute precision
pub fn format_timestamp(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
