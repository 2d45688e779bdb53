//! Command-line interface for mongoscan
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - Translating arguments into a scan specification

use bson::{Bson, Document};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::connection::extract_database_from_uri;
use crate::error::{QueryError, Result, ScanError};
use crate::scan::{ScanOptions, ScanSpec, SortOrder};

/// Stream a MongoDB collection to JSON Lines, surviving cursor loss
#[derive(Parser, Debug)]
#[command(
    name = "mongoscan",
    version,
    about = "Resilient MongoDB collection scanner",
    long_about = "Scans a MongoDB collection and writes every matching document as JSON Lines.
If the server loses the cursor during a long scan, the scan resumes where it left off."
)]
pub struct CliArgs {
    /// MongoDB connection URI
    ///
    /// Format: mongodb://[username:password@]host[:port][/database][?options]
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    /// Database name (defaults to the database in the URI, then "test")
    #[arg(short = 'd', long = "db", value_name = "NAME")]
    pub database: Option<String>,

    /// Collection to scan
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Query filter as (extended) JSON
    #[arg(long, value_name = "JSON")]
    pub filter: Option<String>,

    /// Sort as a JSON object of field: 1 | -1
    #[arg(long, value_name = "JSON")]
    pub sort: Option<String>,

    /// Number of matching documents to skip
    #[arg(long, default_value_t = 0)]
    pub skip: u64,

    /// Maximum number of documents (0 for no limit)
    #[arg(long, default_value_t = 0)]
    pub limit: u64,

    /// Log progress every N documents (0 disables)
    #[arg(long, value_name = "N")]
    pub progress: Option<u64>,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub bar: bool,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Documents per server round trip
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// Resume without reapplying the sort and without counting the recovered document
    #[arg(long)]
    pub legacy_resume: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for mongoscan
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the effective configuration as TOML
    Config,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already-parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, &args);
        config.validate()?;
        Ok(Self { args, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Connection URI: explicit argument first, then the configured one
    pub fn connection_uri(&self) -> String {
        self.args
            .uri
            .clone()
            .unwrap_or_else(|| self.config.connection.uri.clone())
    }

    /// Database name: `--db`, then the URI path, then "test"
    pub fn database(&self) -> String {
        if let Some(db) = &self.args.database {
            return db.clone();
        }
        extract_database_from_uri(&self.connection_uri()).unwrap_or_else(|| "test".to_string())
    }

    /// Collection name, required for a scan
    pub fn collection(&self) -> Result<String> {
        self.args
            .collection
            .clone()
            .ok_or_else(|| ScanError::Generic("--collection is required".to_string()))
    }

    /// Scan specification from `--filter`, `--sort`, `--skip` and `--limit`
    pub fn scan_spec(&self) -> Result<ScanSpec> {
        let mut spec = ScanSpec::new()
            .with_skip(self.args.skip)
            .with_limit(self.args.limit);

        if let Some(filter) = &self.args.filter {
            spec = spec.with_filter(parse_json_document(filter).map_err(QueryError::InvalidFilter)?);
        }
        if let Some(sort) = &self.args.sort {
            let doc = parse_json_document(sort).map_err(QueryError::InvalidSort)?;
            spec = spec.with_sort(SortOrder::from_document(&doc)?);
        }

        Ok(spec)
    }

    /// Scan options after config and CLI overrides
    pub fn scan_options(&self) -> ScanOptions {
        let mut options = self.config.scan_options();
        if self.args.bar && options.progress_interval == 0 {
            // The bar redraws itself at a bounded rate
            options.progress_interval = 1;
        }
        options
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if a subcommand was handled
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Config) => {
                print!("{}", self.config.to_toml()?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        Self::apply_scan_args(config, args);
        Self::apply_logging_args(config, args);

        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }
    }

    /// Apply scan-related CLI arguments to configuration
    fn apply_scan_args(config: &mut Config, args: &CliArgs) {
        if let Some(interval) = args.progress {
            config.scan.progress_interval = interval;
        }
        if args.batch_size.is_some() {
            config.scan.batch_size = args.batch_size;
        }
        if args.legacy_resume {
            config.scan.reapply_sort_on_resume = false;
            config.scan.progress_on_resume = false;
        }
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }
}

/// Parse a JSON (or extended JSON) object into a BSON document
fn parse_json_document(text: &str) -> std::result::Result<Document, String> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match Bson::try_from(value).map_err(|e| e.to_string())? {
        Bson::Document(doc) => Ok(doc),
        other => Err(format!("expected a JSON object, got {other}")),
    }
}
