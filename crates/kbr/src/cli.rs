//! CLI surface: one `clap::Parser` struct with global flags (each with an
//! `env` fallback) plus a subcommand enum.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "kbr")]
#[command(about = "Back up and restore Keycloak realm configuration")]
pub struct Cli {
    /// Directory holding `services.yaml` or `<service>.json` files.
    #[arg(long, env = "BACKUP_RESTORE_CONFIG_PATH", default_value = "config")]
    pub config_dir: PathBuf,

    /// Port the HTTP server binds to when running `serve`.
    #[arg(long, env = "BACKUP_RESTORE_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "KBR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Per-HTTP-request timeout, in seconds, for the `serve` subcommand.
    #[arg(long, env = "KBR_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exports every configured service (or one, with `--service`) to a new snapshot.
    Backup {
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = false)]
        compress: bool,
        /// Skip committing a persisted snapshot and print the exported
        /// artifacts directly instead.
        #[arg(long, default_value_t = false)]
        no_archive: bool,
    },
    /// Applies a snapshot's entities against the live configuration.
    Restore {
        snapshot_id: String,
        #[arg(long)]
        service: Option<String>,
    },
    /// Dry-runs a restore and prints the diff without applying it.
    Plan {
        snapshot_id: String,
        #[arg(long)]
        service: Option<String>,
    },
    /// Lists every stored snapshot.
    List,
    /// Prints one snapshot's manifest.
    Info { snapshot_id: String },
    /// Starts the HTTP server exposing the backup/restore surface.
    Serve,
}
