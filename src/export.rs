//! Report Export
//!
//! Renders the last detection result as a JSON report or a CSV prediction
//! table and writes it to disk. No server round-trip is involved.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::api::DetectionResult;

/// CSV header row
pub const CSV_COLUMNS: [&str; 6] = [
    "index",
    "prediction",
    "prediction_label",
    "probability",
    "confidence",
    "actual_label",
];

/// Errors raised while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No recent results found. Run a detection to generate a report.")]
    NoResult,

    #[error("The last result has no predictions to export")]
    NoPredictions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Json => "botnet_report.json",
            ReportFormat::Csv => "botnet_predictions.csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => f.write_str("json"),
            ReportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("Unknown report format: {}", other)),
        }
    }
}

/// Pretty-printed JSON of the result; `{}` when there is none.
/// A result decoded from a server body is written exactly as received.
pub fn to_json(result: Option<&DetectionResult>) -> Result<String, ExportError> {
    match result {
        Some(result) => Ok(serde_json::to_string_pretty(result)?),
        None => Ok("{}".to_string()),
    }
}

/// Quote a text field only if it contains a comma, doubling inner quotes
fn escape_text(value: &str) -> String {
    if value.contains(',') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Shortest round-trip decimal, switching to exponent form below 1e-6 and
/// from 1e21 up, the way JavaScript prints numbers
fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude < 1e-6 || magnitude >= 1e21 {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    } else {
        value.to_string()
    }
}

/// CSV table of the predictions, rows joined by `\n` without a trailing newline.
/// Empty when there are no predictions.
pub fn to_csv(result: &DetectionResult) -> String {
    if result.predictions.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(result.predictions.len() + 1);
    lines.push(CSV_COLUMNS.join(","));

    for (i, p) in result.predictions.iter().enumerate() {
        let label = p
            .prediction_label
            .as_deref()
            .map(escape_text)
            .unwrap_or_default();
        let actual = p.actual_label.map(|a| a.to_string()).unwrap_or_default();

        lines.push(format!(
            "{},{},{},{},{},{}",
            i + 1,
            p.prediction,
            label,
            format_number(p.probability),
            format_number(p.confidence),
            actual
        ));
    }

    lines.join("\n")
}

/// Render `result` in `format` and write it under `dir`
pub fn write_report(
    result: Option<&DetectionResult>,
    format: ReportFormat,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let result = result.ok_or(ExportError::NoResult)?;

    let content = match format {
        ReportFormat::Json => to_json(Some(result))?,
        ReportFormat::Csv => {
            if result.predictions.is_empty() {
                return Err(ExportError::NoPredictions);
            }
            to_csv(result)
        }
    };

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format.file_name());
    std::fs::write(&path, content)?;

    tracing::info!(path = ?path, format = %format, "Report written");
    Ok(path)
}
