//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Every storage option
//! also reads the environment variable the store has always been configured
//! through, so `HBNB_TYPE_STORAGE=db hbnb` and `hbnb --storage db` agree.

use crate::config::{
    ENV_DATABASE, ENV_FILE_PATH, ENV_HOST, ENV_MODE, ENV_PASSWORD, ENV_PORT, ENV_TYPE_STORAGE,
    ENV_USER, StorageConfig,
};
use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HBnB object store console.
///
/// Creates, inspects, updates and destroys HBnB entities in either a JSON
/// snapshot file or a relational database.
#[derive(Parser, Debug)]
#[command(name = "hbnb")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Storage backend (`db` selects the relational database).
    #[arg(long, env = ENV_TYPE_STORAGE, global = true)]
    pub storage: Option<String>,

    /// Snapshot file for the default backend.
    #[arg(long, env = ENV_FILE_PATH, global = true)]
    pub file_path: Option<PathBuf>,

    /// Database host.
    #[arg(long, env = ENV_HOST, global = true)]
    pub db_host: Option<String>,

    /// Database port.
    #[arg(long, env = ENV_PORT, global = true)]
    pub db_port: Option<String>,

    /// Database user.
    #[arg(long, env = ENV_USER, global = true)]
    pub db_user: Option<String>,

    /// Database password.
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true, global = true)]
    pub db_password: Option<String>,

    /// Database name (`:memory:` for a throwaway database).
    #[arg(long, env = ENV_DATABASE, global = true)]
    pub db_name: Option<String>,

    /// Environment name; `test` wipes the database on startup.
    #[arg(long = "env", env = ENV_MODE, global = true)]
    pub environment: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute (defaults to `console`).
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive console on stdin/stdout.
    Console,

    /// Execute console lines and exit.
    ///
    /// Each argument is one console line, e.g.
    /// `hbnb run 'create State name="California"' 'all State'`.
    Run {
        /// Console lines, executed in order.
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Show the active backend and per-class counts.
    Status,
}

impl Cli {
    /// Builds the storage configuration from the parsed options.
    ///
    /// # Errors
    ///
    /// Returns an error if the relational backend is selected and a
    /// connection parameter is missing or invalid.
    pub fn storage_config(&self) -> Result<StorageConfig, ConfigError> {
        StorageConfig::from_lookup(|key| match key {
            ENV_TYPE_STORAGE => self.storage.clone(),
            ENV_FILE_PATH => self
                .file_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            ENV_HOST => self.db_host.clone(),
            ENV_PORT => self.db_port.clone(),
            ENV_USER => self.db_user.clone(),
            ENV_PASSWORD => self.db_password.clone(),
            ENV_DATABASE => self.db_name.clone(),
            ENV_MODE => self.environment.clone(),
            _ => None,
        })
    }

    /// Returns the command to run.
    #[must_use]
    pub fn selected_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Console)
    }

    /// Returns the default log filter for the verbosity level.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationalConfig;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("hbnb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_console() {
        let cli = parse(&["--file-path", "objects.json"]);
        assert_eq!(cli.selected_command(), Commands::Console);
    }

    #[test]
    fn test_run_collects_lines() {
        let cli = parse(&["--file-path", "objects.json", "run", "count State", "all"]);
        assert_eq!(
            cli.selected_command(),
            Commands::Run {
                lines: vec!["count State".to_string(), "all".to_string()]
            }
        );
    }

    #[test]
    fn test_snapshot_config_from_options() {
        let cli = parse(&["--storage", "file", "--file-path", "/tmp/x.json", "status"]);
        assert_eq!(
            cli.storage_config().unwrap(),
            StorageConfig::Snapshot {
                path: PathBuf::from("/tmp/x.json")
            }
        );
    }

    #[test]
    fn test_relational_config_from_options() {
        let cli = parse(&[
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
            "--db-port",
            "3307",
            "--env",
            "test",
            "status",
        ]);
        assert_eq!(
            cli.storage_config().unwrap(),
            StorageConfig::Relational(RelationalConfig {
                host: "localhost".to_string(),
                port: 3307,
                user: "dev".to_string(),
                password: "pwd".to_string(),
                database: ":memory:".to_string(),
                test_mode: true,
            })
        );
    }

    #[test]
    fn test_relational_config_missing_host() {
        let cli = parse(&[
            "--storage",
            "db",
            "--db-user",
            "dev",
            "--db-password",
            "pwd",
            "--db-name",
            "hbnb",
        ]);
        assert!(cli.storage_config().is_err());
    }

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(parse(&["--file-path", "f"]).log_filter(), "warn");
        assert_eq!(parse(&["--file-path", "f", "-v"]).log_filter(), "debug");
        assert_eq!(parse(&["--file-path", "f", "-vv"]).log_filter(), "trace");
    }
}
