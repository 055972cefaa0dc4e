// SPDX-FileCopyrightText: 2026 Flowtab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flowtab - operator CLI for the flow marketplace.
//!
//! Credential vault tooling, copy recording, and creator payout runs.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod copies;
mod doctor;
mod payouts;
mod vault;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flowtab_config::model::FlowtabConfig;
use flowtab_core::{BillingMonth, FlowtabError, PayoutStatus};

use crate::app::App;

/// Flowtab - operator CLI for the flow marketplace.
#[derive(Parser, Debug)]
#[command(name = "flowtab", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Credential encryption tools.
    Vault {
        #[command(subcommand)]
        action: VaultCommands,
    },
    /// Record flow copies.
    Copy {
        #[command(subcommand)]
        action: CopyCommands,
    },
    /// Aggregate and manage creator payouts.
    Payouts {
        #[command(subcommand)]
        action: PayoutCommands,
    },
    /// Show a creator's earnings.
    Earnings {
        #[arg(long)]
        creator: String,
    },
    /// Manage Flowtab configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum VaultCommands {
    /// Generate a new 256-bit encryption key.
    Keygen,
    /// Encrypt a secret with the configured key.
    ///
    /// Reads the secret from stdin when omitted or given as `-`.
    Encrypt { plaintext: Option<String> },
    /// Decrypt a stored secret with the configured key.
    Decrypt { encoded: String },
    /// List a user's connections and check their credentials decrypt.
    Connections {
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum CopyCommands {
    /// Record that a user copied a flow.
    Record {
        #[arg(long)]
        user: String,
        #[arg(long)]
        flow: String,
        #[arg(long)]
        creator: String,
    },
}

#[derive(Subcommand, Debug)]
enum PayoutCommands {
    /// Recompute payouts for a month (YYYY-MM, default: last month).
    Aggregate {
        #[arg(long)]
        month: Option<BillingMonth>,
    },
    /// Move a payout to a new status.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: PayoutStatus,
        #[arg(long)]
        transfer_id: Option<String>,
    },
    /// List a creator's recent payouts.
    List {
        #[arg(long)]
        creator: String,
        /// Number of months (default from config).
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate configuration and run environment checks.
    Check {
        /// Also run the SQLite integrity check.
        #[arg(long)]
        deep: bool,
    },
}

fn load_config(path: Option<&std::path::Path>) -> FlowtabConfig {
    let loaded = match path {
        Some(path) => flowtab_config::load_and_validate_path(path),
        None => flowtab_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            flowtab_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, config: FlowtabConfig) -> Result<i32, FlowtabError> {
    let Some(command) = cli.command else {
        println!("flowtab: use --help for available commands");
        return Ok(0);
    };

    match command {
        Commands::Vault { action } => match action {
            VaultCommands::Keygen => vault::run_keygen().map(|()| 0),
            VaultCommands::Encrypt { plaintext } => {
                vault::run_encrypt(&config, plaintext.as_deref()).map(|()| 0)
            }
            VaultCommands::Decrypt { encoded } => vault::run_decrypt(&config, &encoded).map(|()| 0),
            VaultCommands::Connections { user } => {
                let app = App::open(&config).await?;
                let result = vault::run_connections(&app, &config, &user, cli.json).await;
                app.shutdown().await?;
                result.map(|()| 0)
            }
        },
        Commands::Config {
            action: ConfigCommands::Check { deep },
        } => {
            let failures = doctor::run_config_check(&config, deep, cli.plain).await;
            Ok(if failures > 0 { 1 } else { 0 })
        }
        Commands::Copy { action } => {
            let app = App::open(&config).await?;
            let CopyCommands::Record {
                user,
                flow,
                creator,
            } = action;
            let result =
                copies::run_copy_record(&app, &user, &flow, &creator, cli.json, cli.plain).await;
            app.shutdown().await?;
            result.map(|()| 0)
        }
        Commands::Payouts { action } => {
            let app = App::open(&config).await?;
            let result = match action {
                PayoutCommands::Aggregate { month } => {
                    payouts::run_aggregate(&app, month, cli.json, cli.plain).await
                }
                PayoutCommands::Status {
                    id,
                    status,
                    transfer_id,
                } => payouts::run_status(&app, &id, status, transfer_id.as_deref(), cli.json).await,
                PayoutCommands::List { creator, limit } => {
                    let limit = limit.unwrap_or(config.monetization.payout_history_limit);
                    payouts::run_list(&app, &creator, limit, cli.json, cli.plain).await
                }
            };
            app.shutdown().await?;
            result.map(|()| 0)
        }
        Commands::Earnings { creator } => {
            let app = App::open(&config).await?;
            let result = payouts::run_earnings(&app, &creator, cli.json, cli.plain).await;
            app.shutdown().await?;
            result.map(|()| 0)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref());
    app::init_tracing(&config.app.log_level);
    tracing::debug!(name = %config.app.name, "config loaded");

    match run(cli, config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }
}
