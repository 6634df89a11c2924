//! `taskboard` -- command line front end for the personal task board.
//!
//! # Usage
//!
//! ```bash
//! taskboard register alice --password s3cret
//! taskboard add "Buy milk" --list grocery --deadline 2024-03-10
//! taskboard board --date today
//! taskboard move 1 done
//! taskboard chart
//! ```

use std::path::Path;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use taskboard::cli;
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::notify::{Notifier, ToastKind};
use tracing_appender::non_blocking::WorkerGuard;

fn main() {
    let cli_args = CliArgs::parse();

    let config = match ClientConfig::load(&cli_args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Logs go to a file so command output stays clean.
    let log_guard = init_logging(&cli_args.log_level, cli_args.log_file.as_deref());

    let Some(command) = cli_args.command else {
        let _ = CliArgs::command().print_help();
        std::process::exit(2);
    };

    tracing::info!(api_url = %config.api_url, command = command.name(), "running command");

    let mut notifier = Notifier::new(config.toast_ttl);
    let result = cli::run(command, &config, &mut notifier, &mut std::io::stdout().lock());

    if let Some(toast) = notifier.current(Instant::now()) {
        match toast.kind {
            ToastKind::Success => eprintln!("{}", toast.message),
            ToastKind::Error => eprintln!("error: {}", toast.message),
        }
    }

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        drop(log_guard);
        std::process::exit(1);
    }
}

/// Initialize tracing with file-based output.
///
/// Returns the non-blocking writer guard, which must be kept alive for the
/// duration of the program so buffered lines get flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
