//! Config variable commands

use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use crate::commands::open_context;
use crate::error::{CliError, Result};

// Plain strings that YAML would turn into null stay strings.
fn parse_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

pub fn run_variable_set(path: &Path, name: &str, raw: &str) -> Result<()> {
    CliError::check_variable_name(name)?;
    let mut ctx = open_context(path)?;
    ctx.save_config_variable(name, parse_value(raw))?;
    println!("{} Variable '{}' set", "+".green(), name);
    Ok(())
}

/// List variable names; values are never printed.
pub fn run_variable_list(path: &Path) -> Result<()> {
    let ctx = open_context(path)?;
    let variables = ctx.config_variables();
    if variables.is_empty() {
        println!("{}", "No config variables".dimmed());
    }
    for name in variables.keys() {
        println!("  {} {}", "+".green(), name);
    }
    Ok(())
}
