//! Configuration display command

use std::path::Path;

use datactx_core::mask_credentials;

use crate::commands::open_context;
use crate::error::Result;

/// Print the raw or substituted project configuration.
///
/// Substituted output has credentials masked.
pub fn run_config_show(path: &Path, substituted: bool, json: bool) -> Result<()> {
    let ctx = open_context(path)?;
    let value = if substituted {
        mask_credentials(&ctx.get_config_with_variables_substituted()?.to_value())
    } else {
        ctx.config().to_value()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", serde_yaml::to_string(&value)?);
    }
    Ok(())
}
