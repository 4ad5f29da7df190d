//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// datactx - Manage data context projects
#[derive(Parser, Debug)]
#[command(name = "datactx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root containing datactx.yml
    #[arg(short = 'd', long, global = true, env = "DATACTX_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a new project
    ///
    /// Writes datactx.yml, the store directories and an empty
    /// config variables file. An existing project is left untouched.
    ///
    /// Examples:
    ///   datactx init                 # Initialize the current directory
    ///   datactx init my-project      # Create and initialize my-project/
    Init {
        /// Directory to initialize (relative to --project-dir)
        #[arg(default_value = ".")]
        name: String,
    },

    /// Inspect project configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage datasources
    Datasource {
        #[command(subcommand)]
        action: DatasourceAction,
    },

    /// Inspect stores
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Manage expectation suites
    Suite {
        #[command(subcommand)]
        action: SuiteAction,
    },

    /// Manage config variables
    Variable {
        #[command(subcommand)]
        action: VariableAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the project configuration
    Show {
        /// Resolve ${VAR} placeholders (credentials are masked)
        #[arg(long)]
        substituted: bool,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DatasourceAction {
    /// List configured datasources
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Delete a datasource
    Delete {
        /// Name of the datasource
        name: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// List configured stores
    List {
        /// Only stores the context uses
        #[arg(long)]
        active: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SuiteAction {
    /// List expectation suite names
    List,

    /// Create an empty expectation suite
    New {
        /// Name of the suite
        name: String,

        /// Replace an existing suite of the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Delete an expectation suite
    Delete {
        /// Name of the suite
        name: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum VariableAction {
    /// Set a config variable
    ///
    /// The value is parsed as YAML, so numbers and booleans keep their type.
    Set {
        /// Variable name
        name: String,

        /// Variable value
        value: String,
    },

    /// List config variable names
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::parse_from(["datactx", "store", "list", "--active"]);
        assert_eq!(
            cli.command,
            Some(Commands::Store {
                action: StoreAction::List {
                    active: true,
                    json: false
                }
            })
        );
    }

    #[test]
    fn project_dir_is_global() {
        let cli = Cli::parse_from(["datactx", "suite", "list", "-d", "/tmp/project"]);
        assert_eq!(cli.project_dir, PathBuf::from("/tmp/project"));
    }
}
