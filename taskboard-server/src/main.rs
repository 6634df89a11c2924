//! Taskboard server -- REST backend for the personal kanban board.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000
//! cargo run --bin taskboard-server
//!
//! # Custom address and database
//! cargo run --bin taskboard-server -- --bind 127.0.0.1:8080 --database ./tasks.db
//!
//! # Or via environment variables
//! TASKBOARD_ADDR=127.0.0.1:8080 TASKBOARD_JWT_SECRET=... cargo run --bin taskboard-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::api::{self, AppState};
use taskboard_server::config::{ServerCliArgs, ServerConfig};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.uses_dev_secret() {
        tracing::warn!("no jwt secret configured, using the development secret");
    }
    tracing::info!(
        addr = %config.bind_addr,
        database = %config.database_path.display(),
        "starting taskboard server"
    );

    let state = match AppState::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "taskboard server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
