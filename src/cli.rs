// src/cli.rs
//! CLI definitions for scriptman
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "scriptman")]
#[command(author = "Scriptman Project")]
#[command(version)]
#[command(about = "Self-updating manager for versioned script packages", long_about = None)]
pub struct Cli {
    /// Path to the database file (default: per-user data directory)
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the scriptman database
    Init,

    /// Manage configured registries
    Registry {
        #[command(subcommand)]
        command: RegistryCommands,
    },

    /// Force a catalog refresh across all registries
    Refresh,

    /// Show the lifecycle state of every known script
    Status {
        /// Group scripts by category
        #[arg(long)]
        by_category: bool,
    },

    /// Install scripts from the merged catalog
    Install {
        /// Script names to install
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Apply available updates (and recommended downgrades)
    Update {
        /// Script names to update; all eligible scripts when omitted
        names: Vec<String>,
    },

    /// Activate installed scripts
    Enable {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Deactivate installed scripts without removing them
    Disable {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Uninstall scripts and their stored settings
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Execute all active scripts matching the runtime context
    Run {
        /// Runtime context identifier to match patterns against
        /// (falls back to $SCRIPTMAN_CONTEXT, then "local")
        #[arg(long)]
        context: Option<String>,
    },

    /// Show or change a script's settings
    Config {
        /// Script name
        name: String,

        /// Set a value, as key=value; repeatable
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Add a registry (<owner>/<name>)
    Add {
        /// Registry identifier as <owner>/<name>
        ident: String,

        /// Human-readable label
        #[arg(long)]
        label: Option<String>,

        /// Access token for private registries
        #[arg(long)]
        token: Option<String>,

        /// Make this the primary registry
        #[arg(long)]
        primary: bool,
    },

    /// Remove a registry
    Remove {
        /// Registry identifier as <owner>/<name>
        ident: String,
    },

    /// List configured registries
    List,

    /// Store an access token for a registry
    Token {
        /// Registry identifier as <owner>/<name>
        ident: String,

        /// The token to store
        token: String,
    },
}
