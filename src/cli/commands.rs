//! CLI command implementations.
//!
//! Each command opens the configured store, does its work through the
//! storage contract, and closes the store again.

use crate::cli::console::{Console, Flow};
use crate::cli::output::{LineOutput, OutputFormat, format_run_output, format_status};
use crate::cli::parser::{Cli, Commands};
use crate::error::Result;
use crate::storage::{self, Storage, StorageStats};
use std::io::{self, IsTerminal};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success. The interactive console writes
/// straight to stdout and returns an empty string.
///
/// # Errors
///
/// Returns an error if the store cannot be configured or opened, or the
/// command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = cli.storage_config()?;
    let mut storage = storage::open(&config)?;

    let output = match cli.selected_command() {
        Commands::Console => cmd_console(storage.as_mut()),
        Commands::Run { lines } => cmd_run(storage.as_mut(), &lines, format),
        Commands::Status => cmd_status(storage.as_ref(), format),
    };

    storage.close()?;
    output
}

fn cmd_console(storage: &mut dyn Storage) -> Result<String> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut console = Console::new(storage, io::stdout().lock()).interactive(interactive);
    console.run(stdin.lock())?;
    Ok(String::new())
}

fn cmd_run(storage: &mut dyn Storage, lines: &[String], format: OutputFormat) -> Result<String> {
    let mut console = Console::new(storage, Vec::new());
    let mut transcript = Vec::with_capacity(lines.len());
    for line in lines {
        let start = console.output().len();
        let flow = console.execute(line)?;
        let printed = String::from_utf8_lossy(&console.output()[start..]);
        transcript.push(LineOutput::new(line, &printed));
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(format_run_output(&transcript, format))
}

fn cmd_status(storage: &dyn Storage, format: OutputFormat) -> Result<String> {
    let stats = StorageStats::collect(storage)?;
    Ok(format_status(&stats, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(temp: &TempDir, args: &[&str]) -> Cli {
        let path = temp.path().join("file.json");
        let path = path.to_string_lossy().into_owned();
        let mut argv = vec!["hbnb", "--storage", "file", "--file-path", path.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_run_then_status() {
        let temp = TempDir::new().unwrap();
        let out = execute(&cli(&temp, &["run", "create State name=\"Texas\"", "count State"])).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "1");

        let status = execute(&cli(&temp, &["status"])).unwrap();
        assert!(status.contains("Backend:    snapshot"));
        assert!(status.contains("State:      1"));
    }

    #[test]
    fn test_run_stops_at_quit() {
        let temp = TempDir::new().unwrap();
        let out = execute(&cli(&temp, &["run", "count City", "quit", "count City"])).unwrap();
        assert_eq!(out, "0\n");
    }

    #[test]
    fn test_run_json_transcript() {
        let temp = TempDir::new().unwrap();
        let out = execute(&cli(
            &temp,
            &["--format", "json", "run", "count State", "show Spaceship 1", "quit"],
        ))
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["line"], "count State");
        assert_eq!(entries[0]["output"][0], "0");
        assert_eq!(entries[1]["output"][0], "** class doesn't exist **");
        assert!(entries[2]["output"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_status_json() {
        let temp = TempDir::new().unwrap();
        let out = execute(&cli(&temp, &["--format", "json", "status"])).unwrap();
        assert!(out.contains("\"backend\": \"snapshot\""));
        assert!(out.contains("\"total\": 0"));
    }

    #[test]
    fn test_relational_run() {
        let cli = Cli::try_parse_from([
            "hbnb",
            "--storage",
            "db",
            "--db-host",
            "localhost",
            "--db-user",
            "dev",
            "--db-password",
            "pwd",
            "--db-name",
            ":memory:",
            "run",
            "create Amenity name=\"Wifi\"",
            "count Amenity",
        ])
        .unwrap();
        let out = execute(&cli).unwrap();
        assert!(out.ends_with("\n1\n"));
    }

    #[test]
    fn test_missing_relational_setting_fails() {
        let cli = Cli::try_parse_from([
            "hbnb",
            "--storage",
            "db",
            "--db-host",
            "localhost",
            "--db-password",
            "pwd",
            "--db-name",
            ":memory:",
            "status",
        ])
        .unwrap();
        let err = execute(&cli).unwrap_err();
        assert!(err.to_string().contains("HBNB_MYSQL_USER"));
    }
}
