// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, RegistryCommands};
use commands::resolve_db_path;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Some(Commands::Init) => commands::cmd_init(&db_path),
        Some(Commands::Registry { command }) => match command {
            RegistryCommands::Add {
                ident,
                label,
                token,
                primary,
            } => commands::cmd_registry_add(&db_path, &ident, label, token, primary),
            RegistryCommands::Remove { ident } => commands::cmd_registry_remove(&db_path, &ident),
            RegistryCommands::List => commands::cmd_registry_list(&db_path),
            RegistryCommands::Token { ident, token } => {
                commands::cmd_registry_token(&db_path, &ident, &token)
            }
        },
        Some(Commands::Refresh) => commands::cmd_refresh(&db_path),
        Some(Commands::Status { by_category }) => commands::cmd_status(&db_path, by_category),
        Some(Commands::Install { names }) => commands::cmd_install(&db_path, &names),
        Some(Commands::Update { names }) => commands::cmd_update(&db_path, &names),
        Some(Commands::Enable { names }) => commands::cmd_enable(&db_path, &names),
        Some(Commands::Disable { names }) => commands::cmd_disable(&db_path, &names),
        Some(Commands::Remove { names }) => commands::cmd_remove(&db_path, &names),
        Some(Commands::Run { context }) => {
            let context = context
                .or_else(|| std::env::var("SCRIPTMAN_CONTEXT").ok())
                .unwrap_or_else(|| "local".to_string());
            commands::cmd_run(&db_path, &context)
        }
        Some(Commands::Config { name, set }) => commands::cmd_config(&db_path, &name, &set),
        Some(Commands::Completions { shell }) => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scriptman", &mut std::io::stdout());
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
