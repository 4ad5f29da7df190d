//! Init command implementation

use std::path::Path;

use colored::Colorize;
use datactx_core::{ContextOptions, DataContext};

use crate::error::Result;

/// Create (or reopen) the project at `path`.
pub fn run_init(path: &Path) -> Result<()> {
    let existed = path.join("datactx.yml").is_file();
    std::fs::create_dir_all(path)?;
    let ctx = DataContext::create(path, ContextOptions::default())?;

    if existed {
        println!(
            "{} Project already initialized at {}",
            "=".yellow(),
            path.display()
        );
    } else {
        println!(
            "{} Project initialized at {}",
            "OK".green().bold(),
            path.display()
        );
    }
    println!("  {:<18} {}", "data_context_id:".dimmed(), ctx.data_context_id());
    Ok(())
}
