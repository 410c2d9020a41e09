//! Subcommand implementations

pub mod get;
pub mod index;
pub mod parse;
pub mod search;
pub mod setup;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use oaidex_core::ElasticClient;

use crate::config::Config;

/// Table with the house style and cyan headers
pub(crate) fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Print a key-value summary table on stderr
pub(crate) fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = table(&[title, "Value"]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Connect to the configured index endpoint, failing if it does not answer.
pub(crate) fn connect(config: &Config) -> Result<ElasticClient> {
    ElasticClient::connect(&config.elastic_settings())
        .with_context(|| format!("Failed to connect to {}", config.index.endpoint))
}

pub(crate) fn print_config(config: &Config) {
    let rows = [
        ("Endpoint", config.index.endpoint.clone()),
        ("Index", config.index.name.clone()),
        (
            "Credentials",
            match (&config.index.username, &config.index.password) {
                (Some(user), Some(_)) => format!("{user} (password set)"),
                (Some(user), None) => format!("{user} (no password)"),
                (None, _) => "not set".to_string(),
            },
        ),
        (
            "Timeouts",
            format!(
                "connect {}s, request {}s",
                config.index.connect_timeout_secs, config.index.request_timeout_secs
            ),
        ),
        (
            "Shards / replicas",
            format!("{} / {}", config.index.shards, config.index.replicas),
        ),
        ("Batch workers", config.workers.batches.to_string()),
        ("In flight", config.workers.max_in_flight.to_string()),
        ("Input pattern", config.input.pattern.clone()),
        (
            "Retry",
            format!(
                "{} rounds, {}ms base delay",
                config.retry.max_retries, config.retry.base_delay_ms
            ),
        ),
    ];
    print_summary("Setting", &rows);
}

/// Shorten `s` to `max` chars for table cells
pub(crate) fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_long_text() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
        assert_eq!(clip("äöüäöü", 4).chars().count(), 4);
    }
}
