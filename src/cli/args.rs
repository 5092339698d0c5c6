//! Command-line argument parsing for the SQLite loader
//!
//! This module defines the CLI structure using clap derive macros: loading
//! the current database, querying it, clearing the stored copy and showing
//! what the loader would do.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::constants::DEFAULT_QUERY_LIMIT;

/// SQLite Loader - fetch, cache and query a versioned SQLite database
#[derive(Parser, Debug)]
#[command(
    name = "sqlite_loader",
    version,
    about = "Fetch, cache and query a versioned SQLite database",
    long_about = "Downloads the compressed SQLite database described by a JSON manifest,
decompresses it while streaming into local storage and reuses the stored copy
until the manifest version changes."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Durable storage directory
    #[arg(long, global = true, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Keep the database in memory only
    #[arg(long, global = true)]
    pub no_durable: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make the current database available locally
    Load(LoadArgs),

    /// Load the database and run a SQL query against it
    Query(QueryArgs),

    /// Remove the stored database and its cache record
    Clear(ClearArgs),

    /// Show capabilities, the selected source and the cache record
    Status(StatusArgs),
}

/// Options shared by commands that read the manifest
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Manifest URL (defaults to `loader.manifest_url`)
    #[arg(short, long, value_name = "URL")]
    pub manifest_url: Option<String>,

    /// Name of the database in durable storage
    #[arg(long, value_name = "NAME")]
    pub file_name: Option<String>,

    /// Never pick the brotli source
    #[arg(long)]
    pub no_brotli: bool,
}

/// Arguments for the load command
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Download even if the stored copy matches the manifest version
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the query command
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// SQL statement to run
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Maximum number of rows to print
    #[arg(short, long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: usize,

    /// Print rows as JSON lines instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the clear command
#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    /// Name of the database in durable storage
    #[arg(long, value_name = "NAME")]
    pub file_name: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level from the verbosity flags, or `configured` without any
    pub fn log_level(&self, configured: &str) -> String {
        if self.global.quiet {
            "error".to_string()
        } else if self.global.very_verbose {
            "debug".to_string()
        } else if self.global.verbose {
            "info".to_string()
        } else {
            configured.to_string()
        }
    }
}

impl GlobalArgs {
    /// Apply global flags on top of the loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.storage_dir {
            config.storage.root = Some(dir.clone());
        }
        if self.no_durable {
            config.storage.durable = false;
        }
    }
}

impl SourceArgs {
    /// Manifest URL from the flag or the configuration
    pub fn manifest_url<'a>(&'a self, config: &'a AppConfig) -> Option<&'a str> {
        self.manifest_url
            .as_deref()
            .or(config.loader.manifest_url.as_deref())
    }

    /// File name from the flag or the configuration
    pub fn file_name<'a>(&'a self, config: &'a AppConfig) -> &'a str {
        self.file_name
            .as_deref()
            .unwrap_or(&config.loader.file_name)
    }

    /// Brotli preference after `--no-brotli`
    pub fn prefer_brotli(&self, config: &AppConfig) -> bool {
        !self.no_brotli && config.loader.prefer_brotli
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sqlite_loader").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_load_args() {
        let cli = parse(&["load", "-m", "https://example.com/m.json", "--force", "--no-brotli"]);

        let Commands::Load(args) = cli.command else {
            panic!("expected load command");
        };
        assert!(args.force);
        assert!(args.source.no_brotli);
        assert_eq!(
            args.source.manifest_url.as_deref(),
            Some("https://example.com/m.json")
        );
    }

    #[test]
    fn test_query_args_default_limit() {
        let cli = parse(&["query", "SELECT 1"]);

        let Commands::Query(args) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.sql, "SELECT 1");
        assert_eq!(args.limit, DEFAULT_QUERY_LIMIT);
        assert!(!args.json);
    }

    #[test]
    fn test_source_args_fall_back_to_config() {
        let mut config = AppConfig::default();
        config.loader.manifest_url = Some("https://example.com/configured.json".to_string());
        config.loader.prefer_brotli = false;

        let args = SourceArgs::default();
        assert_eq!(
            args.manifest_url(&config),
            Some("https://example.com/configured.json")
        );
        assert_eq!(args.file_name(&config), config.loader.file_name);
        assert!(!args.prefer_brotli(&config));

        let args = SourceArgs {
            manifest_url: Some("https://example.com/flag.json".to_string()),
            file_name: Some("other.sqlite".to_string()),
            no_brotli: false,
        };
        assert_eq!(args.manifest_url(&config), Some("https://example.com/flag.json"));
        assert_eq!(args.file_name(&config), "other.sqlite");
    }

    #[test]
    fn test_global_args_apply_to_config() {
        let mut config = AppConfig::default();
        let global = GlobalArgs {
            storage_dir: Some(PathBuf::from("/tmp/loader")),
            no_durable: true,
            ..Default::default()
        };

        global.apply_to(&mut config);

        assert_eq!(config.storage.root, Some(PathBuf::from("/tmp/loader")));
        assert!(!config.storage.durable);
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = parse(&["-q", "status"]);
        let cli_verbose = parse(&["status", "--very-verbose"]);
        let cli_default = parse(&["status"]);

        assert_eq!(cli_quiet.log_level("info"), "error");
        assert_eq!(cli_verbose.log_level("info"), "debug");
        assert_eq!(cli_default.log_level("warn"), "warn");
    }
}
