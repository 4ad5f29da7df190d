//! Creating a new project on disk

use super::{ContextOptions, DataContext};
use crate::Result;
use crate::config::ProjectConfig;
use datactx_fs::{ConfigStore, NormalizedPath, ProjectPath, io};
use std::path::Path;

/// Initial contents of the config variables file.
pub const CONFIG_VARIABLES_TEMPLATE: &str = "\
# Values defined here are substituted into datactx.yml wherever ${NAME} appears.
# Keep secrets here; this file lives under uncommitted/ and should not be versioned.
";

const GITIGNORE_FILE: &str = ".gitignore";
const GITIGNORE_CONTENT: &str = "uncommitted/\n";

const PROJECT_DIRECTORIES: [ProjectPath; 6] = [
    ProjectPath::ExpectationsDir,
    ProjectPath::CheckpointsDir,
    ProjectPath::ProfilersDir,
    ProjectPath::PluginsDir,
    ProjectPath::UncommittedDir,
    ProjectPath::ValidationsDir,
];

impl DataContext {
    /// Open the project in `root`, scaffolding it first if it does not exist.
    pub fn create(root: impl AsRef<Path>, options: ContextOptions) -> Result<Self> {
        let root = NormalizedPath::new(root.as_ref());
        let config_path = root.join(ProjectPath::ProjectConfig.as_str());
        if config_path.is_file() {
            tracing::info!(root = %root, "Project already initialized; opening it");
        } else {
            Self::scaffold(&root)?;
        }
        Self::open(root.to_native(), options)
    }

    /// Write the directory layout and default files; existing files are kept.
    pub fn scaffold(root: &NormalizedPath) -> Result<()> {
        for directory in PROJECT_DIRECTORIES {
            let path = root.join(directory.as_str()).to_native();
            std::fs::create_dir_all(&path).map_err(|e| datactx_fs::Error::io(&path, e))?;
        }

        let variables_path = root.join(ProjectPath::ConfigVariablesFile.as_str());
        if !variables_path.exists() {
            io::write_text(&variables_path, CONFIG_VARIABLES_TEMPLATE)?;
        }

        let gitignore = root.join(GITIGNORE_FILE);
        if !gitignore.exists() {
            io::write_text(&gitignore, GITIGNORE_CONTENT)?;
        }

        let config_path = root.join(ProjectPath::ProjectConfig.as_str());
        if !config_path.exists() {
            ConfigStore::new().save(&config_path, &ProjectConfig::filesystem_defaults())?;
        }
        tracing::info!(root = %root, "Scaffolded new project");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn options() -> ContextOptions {
        ContextOptions::new(Environment::empty().without_global_config())
    }

    #[test]
    fn create_scaffolds_layout() {
        let temp = TempDir::new().unwrap();
        let ctx = DataContext::create(temp.path(), options()).unwrap();

        for directory in PROJECT_DIRECTORIES {
            assert!(temp.path().join(directory.as_str()).is_dir(), "{directory}");
        }
        assert!(temp.path().join("datactx.yml").is_file());
        assert!(ctx.config_variables().is_empty());
        assert_eq!(ctx.plugin_search_paths().len(), 1);
        assert_eq!(ctx.checkpoint_store_name().unwrap(), "checkpoint_store");
    }

    #[test]
    fn create_twice_keeps_identity() {
        let temp = TempDir::new().unwrap();
        let first = DataContext::create(temp.path(), options()).unwrap();
        let second = DataContext::create(temp.path(), options()).unwrap();
        assert_eq!(first.data_context_id(), second.data_context_id());
    }

    #[test]
    fn open_without_project_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            DataContext::open(temp.path(), options()),
            Err(crate::Error::Configuration { .. })
        ));
    }
}
