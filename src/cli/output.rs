//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::core::Record;
use crate::core::record::python_quote;
use crate::error::Error;
use crate::storage::StorageStats;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &StorageStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StorageStats) -> String {
    let mut output = String::new();
    output.push_str("HBnB Storage Status\n");
    output.push_str("===================\n\n");
    if let Some(backend) = stats.backend {
        let _ = writeln!(output, "  Backend:    {backend}");
    }
    for (class, count) in &stats.counts {
        let _ = writeln!(output, "  {:<11} {count}", format!("{class}:"));
    }
    let _ = writeln!(output, "  {:<11} {}", "Total:", stats.total);
    output
}

/// Formats records the way the console's `all` prints them: a Python-style
/// list of display strings.
#[must_use]
pub fn format_record_list<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let items: Vec<String> = records
        .into_iter()
        .map(|r| python_quote(&r.to_string()))
        .collect();
    format!("[{}]", items.join(", "))
}

/// One console line and the text it printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineOutput {
    /// The line as given.
    pub line: String,
    /// Printed lines, without trailing newlines.
    pub output: Vec<String>,
}

impl LineOutput {
    /// Splits captured console text into output lines.
    #[must_use]
    pub fn new(line: &str, printed: &str) -> Self {
        Self {
            line: line.to_string(),
            output: printed.lines().map(ToString::to_string).collect(),
        }
    }
}

/// Formats the transcript of a `run` command.
///
/// Text is exactly what the console printed; JSON pairs each line with
/// its output.
#[must_use]
pub fn format_run_output(transcript: &[LineOutput], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => transcript
            .iter()
            .flat_map(|entry| entry.output.iter())
            .fold(String::new(), |mut out, line| {
                out.push_str(line);
                out.push('\n');
                out
            }),
        OutputFormat::Json => format_json(&transcript),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorBody {
                error: String,
            }
            format_json(&ErrorBody {
                error: error.to_string(),
            })
        }
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
