//! v4convert CLI
//!
//! Re-encrypts a directory of EIP-2335 v4 keystores under new KDF parameters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use v4convert::{
    default_jobs, ConversionPipeline, ConvertConfig, LayoutMode, TargetKdf, TargetKdfFunction,
    DEFAULT_PBKDF2_C, DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_P, DEFAULT_SCRYPT_R, EXIT_CONFIG_ERROR,
    V4CONVERT_DEST_ENV, V4CONVERT_PASSWORD_SRC_ENV, V4CONVERT_SRC_ENV,
};
use v4convert_keystore::OsRandom;

/// Encoding of log lines on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

/// Convert KDF function parameters of EIP-2335 v4 keystores
#[derive(Parser)]
#[command(name = "v4convert")]
#[command(version)]
#[command(about = "Convert KDF function parameters of EIP-2335 v4 keystores", long_about = None)]
struct Cli {
    /// Source directory containing v4 keystores
    #[arg(long, env = V4CONVERT_SRC_ENV, value_name = "PATH")]
    src: PathBuf,

    /// Directory containing password files, or a single password file for all keystores
    #[arg(long, env = V4CONVERT_PASSWORD_SRC_ENV, value_name = "PATH")]
    password_src: PathBuf,

    /// Destination directory where converted keystores are written
    #[arg(long, env = V4CONVERT_DEST_ENV, value_name = "PATH")]
    dest: PathBuf,

    /// Keystore/password pairing: web3signer expects <pk>.json and <pk>.txt,
    /// nimbus expects <pk>/keystore.json and <pk>
    #[arg(long, value_enum, ignore_case = true, default_value_t = LayoutMode::Web3signer)]
    mode: LayoutMode,

    /// KDF function to convert to
    #[arg(long, value_enum, ignore_case = true, default_value_t = TargetKdfFunction::Pbkdf2)]
    kdf_function: TargetKdfFunction,

    /// Iteration count for pbkdf2
    #[arg(short = 'c', value_name = "INTEGER", default_value_t = DEFAULT_PBKDF2_C, help_heading = "PBKDF2 Options")]
    c: u32,

    /// CPU/memory cost for scrypt (power of 2)
    #[arg(short = 'n', value_name = "INTEGER", default_value_t = DEFAULT_SCRYPT_N, help_heading = "SCRYPT Options")]
    n: u32,

    /// Parallelization for scrypt
    #[arg(short = 'p', value_name = "INTEGER", default_value_t = DEFAULT_SCRYPT_P, help_heading = "SCRYPT Options")]
    p: u32,

    /// Block size for scrypt
    #[arg(short = 'r', value_name = "INTEGER", default_value_t = DEFAULT_SCRYPT_R, help_heading = "SCRYPT Options")]
    r: u32,

    /// Number of keystores processed in parallel
    #[arg(long, default_value_t = default_jobs())]
    jobs: usize,

    /// Level for this tool's own log lines; RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", default_value_t = Level::INFO)]
    log_level: Level,

    #[arg(long, value_enum, ignore_case = true, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    /// Disable colored logs
    #[arg(long)]
    log_no_color: bool,

    /// Print out full error chain on errors
    #[arg(long, default_value = "false")]
    trace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level, cli.log_format, cli.log_no_color);

    if let Err(e) = run(&cli).await {
        if cli.trace {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    let target = TargetKdf::from_options(cli.kdf_function, cli.c, cli.n, cli.p, cli.r);
    let config = ConvertConfig::new(cli.src.clone(), cli.password_src.clone(), cli.dest.clone())
        .with_mode(cli.mode)
        .with_target(target)
        .with_jobs(cli.jobs);
    config.validate()?;

    info!(
        mode = ?config.mode,
        target = ?config.target,
        jobs = config.jobs,
        "Starting conversion"
    );

    let pipeline = ConversionPipeline::new(&config, Arc::new(OsRandom));
    let report = pipeline.run().await.context("conversion aborted")?;

    println!(
        "Converted {} keystore(s) into {} ({} failed, {} skipped)",
        report.converted.len(),
        config.destination.display(),
        report.failed.len(),
        report.skipped.len()
    );

    Ok(())
}

/// Logs go to stderr; stdout carries only the run summary.
fn init_tracing(level: Level, format: LogFormat, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("v4convert={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color && format == LogFormat::Plain);

    match format {
        LogFormat::Plain => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}
