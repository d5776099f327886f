//! Output formatting for CLI

use console::style;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One property line of a report
#[derive(Debug, Tabled)]
pub struct Row {
    #[tabled(rename = "Property")]
    pub property: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl Row {
    pub fn new(property: impl Into<String>, value: impl ToString) -> Self {
        Self {
            property: property.into(),
            value: value.to_string(),
        }
    }
}

/// Format output based on selected format.
///
/// JSON serializes `data`; text and table render `rows`.
pub fn format_output<T: Serialize>(data: &T, rows: Vec<Row>, format: &str) -> anyhow::Result<String> {
    Ok(match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Text => text(&rows),
    })
}

fn text(rows: &[Row]) -> String {
    let width = rows.iter().map(|r| r.property.len()).max().unwrap_or(0);
    rows.iter()
        .map(|r| format!("{}  {}", style(format!("{:<width$}", r.property)).bold(), r.value))
        .collect::<Vec<_>>()
        .join("\n")
}
