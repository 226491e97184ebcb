//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use dbprobe_core::{Driver, IntrospectionConfig};
use std::path::PathBuf;

/// dbprobe - read a database schema into a portable model
#[derive(Parser, Debug)]
#[command(name = "dbprobe")]
#[command(about = "Introspect tables, keys and indexes of a PostgreSQL or SQLite database", long_about = None)]
#[command(version)]
pub struct Args {
    /// JSON configuration file; command-line values override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database connection URL
    /// (e.g., postgres://user@host/db, sqlite:///path/to/app.db)
    #[arg(long, value_name = "URL", env = "DBPROBE_URL")]
    pub url: Option<String>,

    /// Login user
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Login password
    #[arg(long, value_name = "PASSWORD", env = "DBPROBE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database driver (inferred from the URL when omitted)
    #[arg(long, value_enum)]
    pub driver: Option<DriverArg>,

    /// LIKE pattern restricting catalogs
    #[arg(long, value_name = "PATTERN")]
    pub catalog: Option<String>,

    /// LIKE pattern restricting schemas (e.g., 'public')
    #[arg(long, value_name = "PATTERN")]
    pub schema: Option<String>,

    /// LIKE pattern restricting tables (e.g., 'order%')
    #[arg(long, value_name = "PATTERN")]
    pub table: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u32>,

    /// Per-statement timeout in seconds (PostgreSQL)
    #[arg(long, value_name = "SECS")]
    pub statement_timeout: Option<u32>,

    /// Output format
    #[arg(short, long, default_value = "json", value_enum)]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log filter directive (overrides DBPROBE_LOG and RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Also write logs to a daily rotating file in the data directory
    #[arg(long)]
    pub log_file: bool,

    /// Only report errors on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

/// Driver options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DriverArg {
    Postgres,
    Sqlite,
}

impl From<DriverArg> for Driver {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::Postgres => Driver::Postgres,
            DriverArg::Sqlite => Driver::Sqlite,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Schema model as JSON
    Json,
    /// Human-readable table listing
    Summary,
}

impl Args {
    /// Apply command-line values on top of `config`.
    pub fn apply_to(&self, config: &mut IntrospectionConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(user) = &self.user {
            config.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(driver) = self.driver {
            config.driver = Some(driver.into());
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_pattern = Some(catalog.clone());
        }
        if let Some(schema) = &self.schema {
            config.schema_pattern = Some(schema.clone());
        }
        if let Some(table) = &self.table {
            config.table_pattern = Some(table.clone());
        }
        if let Some(secs) = self.connect_timeout {
            config.options.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.statement_timeout {
            config.options.statement_timeout_secs = Some(secs);
        }
    }
}
