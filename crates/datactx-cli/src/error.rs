//! Error types for datactx-cli

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] datactx_core::Error),

    #[error(transparent)]
    Fs(#[from] datactx_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render output: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The directory has no `datactx.yml`
    #[error("No datactx.yml found in {}. Run 'datactx init' first.", path.display())]
    NotInitialized { path: PathBuf },

    #[error("Invalid config variable name {name:?}: {reason}")]
    InvalidVariableName { name: String, reason: &'static str },
}

impl CliError {
    pub fn not_initialized(path: impl Into<PathBuf>) -> Self {
        Self::NotInitialized { path: path.into() }
    }

    /// Config variable names are substituted as `${NAME}`, so they may not
    /// be empty or contain the token delimiters.
    pub fn check_variable_name(name: &str) -> Result<()> {
        let reason = if name.is_empty() {
            "must not be empty"
        } else if name.contains(['$', '{', '}', '(', ')']) {
            "must not contain `$`, braces or parentheses"
        } else if name.chars().any(char::is_whitespace) {
            "must not contain whitespace"
        } else {
            return Ok(());
        };
        Err(Self::InvalidVariableName {
            name: name.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_points_at_init() {
        let message = CliError::not_initialized("/srv/project").to_string();
        assert!(message.contains("/srv/project"), "{message}");
        assert!(message.contains("datactx init"), "{message}");
    }

    #[test]
    fn variable_names_are_checked() {
        assert!(CliError::check_variable_name("DB_PASSWORD").is_ok());
        for name in ["", "${DB}", "DB PASSWORD", "f(x)"] {
            assert!(
                matches!(
                    CliError::check_variable_name(name),
                    Err(CliError::InvalidVariableName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }
}
