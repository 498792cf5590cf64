// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyward - a local encrypted secret store.
//!
//! This is the binary entry point for the `keyward` command.

mod app;
mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keyward_core::KeywardError;

use crate::app::{App, SecondFactor};
use crate::commands::backup::BackupCommand;
use crate::commands::records::{AddArgs, LabelCommand};
use crate::commands::totp::TotpCommand;
use crate::output::Output;

/// Keyward - a local encrypted secret store.
#[derive(Parser, Debug)]
#[command(name = "keyward", version, about, long_about = None)]
struct Cli {
    /// Print one JSON document per command instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    factor: SecondFactor,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the vault and set the master password.
    Init,
    /// Show whether a vault exists and how it is protected.
    Status,
    /// Check the master password and second factor.
    Unlock,
    /// Store a new credential.
    Add(AddArgs),
    /// Show a credential. The secret is masked unless --reveal is given.
    Get {
        id: String,
        #[arg(long)]
        reveal: bool,
    },
    /// List record ids and categories.
    List,
    /// Delete a record.
    Rm { id: String },
    /// Re-seal every record under a new master password.
    ChangePassword,
    /// Re-derive the key with the current iteration policy.
    Upgrade {
        /// Explicit PBKDF2 iteration count, within the configured bounds.
        #[arg(long)]
        iterations: Option<u32>,
    },
    /// Two-factor authentication.
    Totp {
        #[command(subcommand)]
        command: TotpCommand,
    },
    /// Snapshot and restore the vault.
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },
    /// Record categories.
    Category {
        #[command(subcommand)]
        command: LabelCommand,
    },
    /// Record tags.
    Tag {
        #[command(subcommand)]
        command: LabelCommand,
    },
    /// Write a safety snapshot, then delete every record.
    Destroy,
    /// Delete every record and the master password without a password.
    Reset {
        /// The confirmation phrase, for non-interactive use.
        #[arg(long)]
        confirm: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let out = Output::new(cli.json, cli.plain);

    let loaded = match &cli.config {
        Some(path) => keyward_config::load_and_validate_path(path),
        None => keyward_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            keyward_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("keyward: use --help for available commands");
        return;
    };

    let app = match App::open(config).await {
        Ok(app) => app,
        Err(e) => {
            out.error(&e);
            std::process::exit(1);
        }
    };
    let result = dispatch(&app, command, &cli.factor, &out).await;
    if let Err(e) = app.close().await {
        tracing::warn!(error = %e, "failed to checkpoint database on exit");
    }
    if let Err(e) = result {
        out.error(&e);
        std::process::exit(1);
    }
}

async fn dispatch(
    app: &App,
    command: Commands,
    factor: &SecondFactor,
    out: &Output,
) -> Result<(), KeywardError> {
    use crate::commands::{backup, records, totp, vault};

    match command {
        Commands::Init => vault::init(app, out).await,
        Commands::Status => vault::status(app, out).await,
        Commands::Unlock => vault::unlock(app, factor, out).await,
        Commands::Add(args) => records::add(app, args, factor, out).await,
        Commands::Get { id, reveal } => records::get(app, &id, reveal, factor, out).await,
        Commands::List => records::list(app, out).await,
        Commands::Rm { id } => records::remove(app, &id, factor, out).await,
        Commands::ChangePassword => vault::change_password(app, factor, out).await,
        Commands::Upgrade { iterations } => vault::upgrade(app, iterations, factor, out).await,
        Commands::Totp { command } => totp::run(app, command, factor, out).await,
        Commands::Backup { command } => backup::run(app, command, out).await,
        Commands::Category { command } => records::category(app, command, out).await,
        Commands::Tag { command } => records::tag(app, command, out).await,
        Commands::Destroy => vault::destroy(app, factor, out).await,
        Commands::Reset { confirm } => vault::reset(app, confirm, out).await,
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyward={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
