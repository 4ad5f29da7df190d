//! Expectation suite commands

use std::path::Path;

use colored::Colorize;
use datactx_core::ExpectationSuite;

use crate::commands::open_context;
use crate::error::Result;

pub fn run_suite_list(path: &Path) -> Result<()> {
    let ctx = open_context(path)?;
    let names = ctx.list_expectation_suite_names()?;
    if names.is_empty() {
        println!("{}", "No expectation suites".dimmed());
    }
    for name in names {
        println!("  {} {}", "+".green(), name);
    }
    Ok(())
}

pub fn run_suite_new(path: &Path, name: &str, overwrite: bool) -> Result<()> {
    let mut ctx = open_context(path)?;
    ctx.save_expectation_suite(&ExpectationSuite::new(name), None, overwrite)?;
    println!("{} Suite '{}' created", "+".green(), name);
    Ok(())
}

pub fn run_suite_delete(path: &Path, name: &str) -> Result<()> {
    let mut ctx = open_context(path)?;
    ctx.delete_expectation_suite(name)?;
    println!("{} Suite '{}' removed", "-".red(), name);
    Ok(())
}
