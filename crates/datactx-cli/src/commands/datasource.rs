//! Datasource commands

use std::path::Path;

use colored::Colorize;

use crate::commands::{open_context, print_entries};
use crate::error::Result;

/// List datasources with credentials masked.
pub fn run_datasource_list(path: &Path, json: bool) -> Result<()> {
    let ctx = open_context(path)?;
    let datasources = ctx.list_datasources()?;
    print_entries(&datasources, json, "No datasources configured")
}

/// Delete a datasource and persist the change.
pub fn run_datasource_delete(path: &Path, name: &str) -> Result<()> {
    let mut ctx = open_context(path)?;
    ctx.delete_datasource(name)?;
    println!("{} Datasource '{}' removed", "-".red(), name);
    Ok(())
}
