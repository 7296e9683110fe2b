// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolechat - streaming role-play chat backend.
//!
//! This is the binary entry point for the Rolechat service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rolechat_config::{ConfigError, RolechatConfig};

/// Rolechat - streaming role-play chat backend.
#[derive(Parser, Debug)]
#[command(name = "rolechat", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP server (default).
    Serve,
    /// Validate configuration and print the effective result.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<RolechatConfig, Vec<ConfigError>> {
    match path {
        Some(path) => rolechat_config::load_and_validate_path(path),
        None => rolechat_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            rolechat_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => match rolechat_config::render_effective(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                eprintln!("rolechat: configuration is valid");
            }
            Err(e) => {
                rolechat_config::render_errors(std::slice::from_ref(&e));
                std::process::exit(1);
            }
        },
    }
}
