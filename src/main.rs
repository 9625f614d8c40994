//! LED-A-Gogo CLI - run, watch and debug territory-capture sessions.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// LED-A-Gogo - a four-player territory-capture game with motion sensors
#[derive(Parser, Debug)]
#[command(name = "ledagogo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless session and print its event stream
    Run {
        #[command(flatten)]
        session: cli::SessionArgs,

        /// Session length in seconds (overrides the config)
        #[arg(short, long)]
        duration: Option<u32>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show a progress bar for the remaining time
        #[arg(short, long)]
        progress: bool,
    },

    /// Interactive TUI with keyboard control
    Watch {
        #[command(flatten)]
        session: cli::SessionArgs,

        /// Player steered with the arrow keys (1-4)
        #[arg(short, long, default_value = "1")]
        player: u8,
    },

    /// Print the messages arriving on a sensor board's serial link
    Probe {
        /// Serial device path
        #[arg(required = true)]
        path: String,

        /// Link speed
        #[arg(short, long, default_value = "9600")]
        baud: u32,

        /// Stop after this many lines (default: 20)
        #[arg(short, long, default_value = "20")]
        lines: u32,

        /// Light this many LEDs before reading
        #[arg(long)]
        leds: Option<u8>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // The TUI owns the terminal, so watch only logs when given a file.
    let to_stderr = !matches!(args.command, Commands::Watch { .. });
    if let Err(e) = init_logging(args.log_file.as_deref(), to_stderr) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match args.command {
        Commands::Run {
            session,
            duration,
            format,
            progress,
        } => cli::run::execute(&session, duration, format, progress),

        Commands::Watch { session, player } => cli::watch::execute(&session, player),

        Commands::Probe {
            path,
            baud,
            lines,
            leds,
        } => cli::probe::execute(&path, baud, lines, leds),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> Result<(), cli::CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| cli::CliError::new(format!("Failed to create {}: {e}", path.display())))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None if to_stderr => builder.with_writer(std::io::stderr).init(),
        None => {}
    }
    Ok(())
}
