//! Command-line runner for scripted Android UI walkthroughs.
//!
//! # Usage
//!
//! ```bash
//! # Run every walkthrough procedure on the first online device
//! droidwalk run
//!
//! # Relaunch the app before each procedure and run only one of them
//! droidwalk run --package com.example.demo_ncl -p welcome-screen-and-navigation
//!
//! # Replace the fixed delays with poll-until-visible waits
//! droidwalk run --poll --timeout 8000
//!
//! # Machine-readable report
//! droidwalk -f json run
//!
//! # Inspect the device
//! droidwalk list-devices
//! droidwalk dump
//! droidwalk screenshot -o screen.png
//! ```

mod format;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use droidwalk_core::adb::{Adb, AdbError};
use droidwalk_core::adb_driver::AdbDriver;
use droidwalk_core::config::{logs_dir, DroidwalkConfig, WaitStrategy};
use droidwalk_core::driver::{DeviceDriver, DriverError};
use droidwalk_core::session::DeviceSession;
use droidwalk_core::walkthrough::{Procedure, WalkthroughRunner};

/// Scripted UI walkthroughs for Android apps over adb.
#[derive(Parser)]
#[command(name = "droidwalk")]
#[command(about = "Drive an Android app through a scripted UI walkthrough")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.droidwalk/config.json)
    #[arg(short, long, env = "DROIDWALK_CONFIG")]
    config: Option<PathBuf>,

    /// Device serial (defaults to the first online device)
    #[arg(short, long, env = "DROIDWALK_SERIAL")]
    serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, env = "DROIDWALK_ADB")]
    adb: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run walkthrough procedures
    Run {
        /// Procedure to run (repeatable); all of them when omitted
        #[arg(short, long = "procedure")]
        procedures: Vec<Procedure>,
        /// Package to relaunch before each procedure
        #[arg(long, env = "DROIDWALK_PACKAGE")]
        package: Option<String>,
        /// Activity to start instead of the launcher activity
        #[arg(long, requires = "package")]
        activity: Option<String>,
        /// Poll for expected elements instead of sleeping fixed delays
        #[arg(long)]
        poll: bool,
        /// Poll timeout in milliseconds
        #[arg(long, default_value = "10000", requires = "poll")]
        timeout: u64,
        /// Poll interval in milliseconds
        #[arg(long, default_value = "250", requires = "poll")]
        interval: u64,
        /// Do not write the JSON Lines action log
        #[arg(long)]
        no_log: bool,
    },

    /// List devices known to adb
    ListDevices,

    /// Print the elements on the current screen
    Dump {
        /// Print the full hierarchy instead of identifiable elements only
        #[arg(long)]
        full: bool,
    },

    /// Capture the screen
    Screenshot {
        /// Write PNG to this file instead of printing base64
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug)]
enum CliError {
    WalkthroughFailed(usize),
    Device(String),
    Config(String),
    Io(std::io::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::WalkthroughFailed(_) => ExitCode::from(1),
            CliError::Device(_) => ExitCode::from(2),
            CliError::Config(_) => ExitCode::from(3),
            CliError::Io(_) => ExitCode::from(4),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::WalkthroughFailed(n) => write!(f, "{} procedure(s) failed", n),
            CliError::Device(msg) => write!(f, "Device error: {}", msg),
            CliError::Config(msg) => write!(f, "Config error: {}", msg),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl From<DriverError> for CliError {
    fn from(e: DriverError) -> Self {
        CliError::Device(e.to_string())
    }
}

impl From<AdbError> for CliError {
    fn from(e: AdbError) -> Self {
        CliError::Device(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = logs_dir();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "droidwalk.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = load_config(cli.config.as_ref())?;
    if cli.serial.is_some() {
        config.serial = cli.serial.clone();
    }
    if cli.adb.is_some() {
        config.adb_path = cli.adb.clone();
    }

    match cli.command {
        Command::Run { procedures, package, activity, poll, timeout, interval, no_log } => {
            if package.is_some() {
                config.package = package;
                config.activity = activity;
            }
            if poll {
                if interval == 0 {
                    return Err(CliError::Config("--interval must be greater than 0".to_string()));
                }
                config.wait = WaitStrategy::Poll { timeout_ms: timeout, interval_ms: interval };
            }
            if no_log {
                config.action_log = false;
            }
            run_walkthrough(config, procedures, cli.format).await
        }
        Command::ListDevices => list_devices(&config, cli.format),
        Command::Dump { full } => dump(&config, full, cli.format).await,
        Command::Screenshot { output } => screenshot(&config, output).await,
        Command::Config => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<DroidwalkConfig, CliError> {
    match path {
        // An explicitly named file must parse; the default location falls back silently.
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<DroidwalkConfig>(&text)
                .map(DroidwalkConfig::validated)
                .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
        }
        Some(path) => {
            debug!(path = %path.display(), "config file missing, using defaults");
            Ok(DroidwalkConfig::default())
        }
        None => Ok(DroidwalkConfig::load()),
    }
}

async fn connect(config: &DroidwalkConfig) -> Result<AdbDriver, CliError> {
    let mut driver = AdbDriver::from_config(config);
    driver.connect().await?;
    Ok(driver)
}

async fn run_walkthrough(
    config: DroidwalkConfig,
    procedures: Vec<Procedure>,
    output: OutputFormat,
) -> Result<(), CliError> {
    let procedures = if procedures.is_empty() {
        Procedure::all().to_vec()
    } else {
        procedures
    };

    let driver = connect(&config).await?;
    info!(serial = driver.serial().unwrap_or_default(), "starting walkthrough");

    let write_log = config.action_log;
    let mut runner = WalkthroughRunner::new(Arc::new(driver), config);
    if write_log {
        runner = runner.with_log_dir(logs_dir());
    }
    let report = runner.run(&procedures).await;

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string(&report)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", format::report(&report)),
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::WalkthroughFailed(report.failed()))
    }
}

fn list_devices(config: &DroidwalkConfig, output: OutputFormat) -> Result<(), CliError> {
    let adb = match config.adb_path {
        Some(ref path) => Adb::with_path(path),
        None => Adb::new(),
    };
    let devices = adb.list_devices()?;
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string(&devices)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", format::devices(&devices)),
    }
    Ok(())
}

async fn dump(config: &DroidwalkConfig, full: bool, output: OutputFormat) -> Result<(), CliError> {
    let driver = connect(config).await?;
    let elements = if full {
        driver.dump_tree().await?
    } else {
        driver.list_elements().await?
    };
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string(&elements)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", format::elements(&elements)),
    }
    Ok(())
}

async fn screenshot(config: &DroidwalkConfig, output: Option<PathBuf>) -> Result<(), CliError> {
    let driver: Arc<dyn DeviceDriver> = Arc::new(connect(config).await?);
    match output {
        Some(path) => {
            let bytes = driver.screenshot().await?;
            std::fs::write(&path, bytes)?;
            eprintln!("Saved to {}", path.display());
        }
        None => {
            let session = DeviceSession::new(driver, "screenshot");
            println!("{}", session.screenshot_base64().await?);
        }
    }
    Ok(())
}
