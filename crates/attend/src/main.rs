// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! attend - command queue and delivery server for biometric attendance
//! terminals.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod inspect;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// attend - command queue and delivery server for biometric attendance terminals.
#[derive(Parser, Debug)]
#[command(name = "attend", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the device gateway and operator API.
    Serve,
    /// Print the global command queue as JSON.
    Queue,
    /// Print command log entries as JSON, newest first.
    Log {
        /// Only entries for this device serial.
        #[arg(long)]
        device: Option<String>,
        /// Only entries with this status (pending, sent, executed, failed).
        #[arg(long)]
        status: Option<String>,
        /// Maximum number of entries.
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Append raw command payloads to the queue.
    Enqueue {
        /// Payload text, e.g. `C:101:DATA DELETE USERINFO PIN=7`.
        #[arg(required = true)]
        payloads: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => attend_config::load_and_validate_path(path),
        None => attend_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            attend_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Queue) => inspect::run_queue(&config).await,
        Some(Commands::Log {
            device,
            status,
            limit,
        }) => inspect::run_log(&config, device, status, limit).await,
        Some(Commands::Enqueue { payloads }) => inspect::run_enqueue(&config, payloads).await,
        None => {
            println!("attend: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
