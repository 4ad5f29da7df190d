//! Store listing command

use std::path::Path;

use crate::commands::{open_context, print_entries};
use crate::error::Result;

pub fn run_store_list(path: &Path, active: bool, json: bool) -> Result<()> {
    let ctx = open_context(path)?;
    let stores = if active {
        ctx.list_active_stores()?
    } else {
        ctx.list_stores()?
    };
    print_entries(&stores, json, "No stores configured")
}
