//! Command implementations for datactx-cli

pub mod config;
pub mod datasource;
pub mod init;
pub mod store;
pub mod suite;
pub mod variable;

pub use config::run_config_show;
pub use datasource::{run_datasource_delete, run_datasource_list};
pub use init::run_init;
pub use store::run_store_list;
pub use suite::{run_suite_delete, run_suite_list, run_suite_new};
pub use variable::{run_variable_list, run_variable_set};

use crate::error::{CliError, Result};
use datactx_core::{ContextOptions, DataContext};
use std::path::Path;

/// Project config file name
const PROJECT_CONFIG: &str = "datactx.yml";

/// Open the project at `path`, with a hint when it has not been initialized.
pub fn open_context(path: &Path) -> Result<DataContext> {
    if !path.join(PROJECT_CONFIG).is_file() {
        return Err(CliError::not_initialized(path));
    }
    Ok(DataContext::open(path, ContextOptions::default())?)
}

/// Print a list of JSON entries either as JSON or as `name  class_name` lines.
pub(crate) fn print_entries(entries: &[serde_json::Value], json: bool, empty: &str) -> Result<()> {
    use colored::Colorize;

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("{}", empty.dimmed());
        return Ok(());
    }
    for entry in entries {
        let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        let class_name = entry.get("class_name").and_then(|v| v.as_str()).unwrap_or("-");
        println!("  {} {:<28} {}", "+".green(), name, class_name.dimmed());
    }
    Ok(())
}
