//! Conventional locations inside a datactx project root.

use std::path::Path;

/// Well-known files and directories of a project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPath {
    /// The project configuration document
    ProjectConfig,
    /// Default expectation suite directory
    ExpectationsDir,
    /// Default checkpoint directory (also the legacy checkpoint-store marker)
    CheckpointsDir,
    /// Default profiler directory (also the legacy profiler-store marker)
    ProfilersDir,
    /// Directory for files that must not be committed
    UncommittedDir,
    /// Default validation results directory
    ValidationsDir,
    /// Default config-variables file
    ConfigVariablesFile,
    /// Default plugins directory
    PluginsDir,
}

impl ProjectPath {
    /// Get the path relative to the project root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectConfig => "datactx.yml",
            Self::ExpectationsDir => "expectations",
            Self::CheckpointsDir => "checkpoints",
            Self::ProfilersDir => "profilers",
            Self::UncommittedDir => "uncommitted",
            Self::ValidationsDir => "uncommitted/validations",
            Self::ConfigVariablesFile => "uncommitted/config_variables.yml",
            Self::PluginsDir => "plugins",
        }
    }
}

impl AsRef<Path> for ProjectPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for ProjectPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
