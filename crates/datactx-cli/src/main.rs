//! datactx CLI
//!
//! The command-line interface for creating and inspecting data context projects.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigAction, DatasourceAction, StoreAction, SuiteAction, VariableAction};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(&cli.project_dir, cmd),
        None => {
            println!("{} data context CLI", "datactx".green().bold());
            println!();
            println!("Run {} for available commands.", "datactx --help".cyan());
            Ok(())
        }
    }
}

// Logs go to stderr so command output stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("{}: tracing subscriber already set", "warning".yellow());
    }
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(project_dir: &std::path::Path, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { name } => commands::run_init(&project_dir.join(name)),
        Commands::Config { action } => match action {
            ConfigAction::Show { substituted, json } => {
                commands::run_config_show(project_dir, substituted, json)
            }
        },
        Commands::Datasource { action } => match action {
            DatasourceAction::List { json } => commands::run_datasource_list(project_dir, json),
            DatasourceAction::Delete { name } => commands::run_datasource_delete(project_dir, &name),
        },
        Commands::Store { action } => match action {
            StoreAction::List { active, json } => commands::run_store_list(project_dir, active, json),
        },
        Commands::Suite { action } => match action {
            SuiteAction::List => commands::run_suite_list(project_dir),
            SuiteAction::New { name, overwrite } => commands::run_suite_new(project_dir, &name, overwrite),
            SuiteAction::Delete { name } => commands::run_suite_delete(project_dir, &name),
        },
        Commands::Variable { action } => match action {
            VariableAction::Set { name, value } => commands::run_variable_set(project_dir, &name, &value),
            VariableAction::List => commands::run_variable_list(project_dir),
        },
    }
}
