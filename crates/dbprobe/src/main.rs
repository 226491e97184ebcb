//! dbprobe - read a database schema into a portable model.

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use dbprobe_core::logging::{init_logging, log_dir, LogConfig};
use dbprobe_core::{introspect, IntrospectionConfig, ProbeError};
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use cli::{Args, OutputFormat};
use output::{format_json, format_summary};

/// Output could not be written, or another failure outside introspection.
const EXIT_FAILURE: u8 = 1;
/// Missing, unreadable or invalid configuration.
const EXIT_CONFIG_ERROR: u8 = 2;
/// The database could not be reached or refused the session.
const EXIT_CONNECTION_ERROR: u8 = 3;
/// A catalog query failed mid-run.
const EXIT_INTROSPECTION_ERROR: u8 = 4;
/// The collected schema violated a model invariant.
const EXIT_VALIDATION_ERROR: u8 = 5;

fn main() -> ExitCode {
    let args = Args::parse();

    let mut log_config = LogConfig::new().quiet(args.quiet);
    if let Some(filter) = &args.log_filter {
        log_config = log_config.with_filter(filter);
    }
    if args.log_file {
        log_config = log_config.with_log_dir(log_dir());
    }
    let _logging_guard = init_logging(log_config);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            match e.downcast_ref::<ProbeError>() {
                Some(probe) => report(probe),
                None => eprintln!("dbprobe: error: {e:#}"),
            }
            ExitCode::from(code)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => IntrospectionConfig::from_json_file(path)?,
        None => IntrospectionConfig::default(),
    };
    args.apply_to(&mut config);

    tracing::debug!(config = ?config, "Resolved configuration");

    let model = introspect(config)?;

    let rendered = match args.format {
        OutputFormat::Json => format_json(&model, args.compact).context("Failed to serialize schema")?,
        OutputFormat::Summary => format_summary(&model),
    };

    match &args.output {
        Some(path) => fs::write(path, rendered.as_bytes())
            .with_context(|| format!("Failed to write output file {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes()).context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n").context("Failed to write to stdout")?;
            }
        }
    }

    Ok(())
}

fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<ProbeError>() {
        Some(ProbeError::Config { .. }) => EXIT_CONFIG_ERROR,
        Some(ProbeError::Connection { .. }) => EXIT_CONNECTION_ERROR,
        Some(ProbeError::Introspection { .. }) => EXIT_INTROSPECTION_ERROR,
        Some(ProbeError::Validation { .. }) => EXIT_VALIDATION_ERROR,
        None => EXIT_FAILURE,
    }
}

fn report(error: &ProbeError) {
    let info = error.to_error_info();
    eprintln!("dbprobe: {}", info.message);
    if let Some(detail) = &info.technical_detail {
        for line in detail.lines() {
            eprintln!("  {line}");
        }
    }
    if let Some(hint) = &info.hint {
        eprintln!("hint: {hint}");
    }
}
