//! [`TestProject`] builder for on-disk datactx projects.

use crate::fixtures;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Project config file name.
pub const PROJECT_CONFIG: &str = "datactx.yml";

/// Default location of the config variables file.
pub const CONFIG_VARIABLES: &str = "uncommitted/config_variables.yml";

/// A temporary project directory with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use datactx_test_utils::project::TestProject;
///
/// let project = TestProject::new()
///     .with_filesystem_config()
///     .with_config_variables("DB_PASSWORD: secret\n");
/// project.assert_file_exists("datactx.yml");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the project root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `datactx.yml`.
    pub fn with_config(self, yaml: &str) -> Self {
        self.write_file(PROJECT_CONFIG, yaml);
        self
    }

    /// Write [`fixtures::FILESYSTEM_CONFIG`] and create its store directories.
    pub fn with_filesystem_config(self) -> Self {
        self.with_config(fixtures::FILESYSTEM_CONFIG)
            .with_dirs(&["expectations", "checkpoints", "uncommitted/validations"])
    }

    /// Write the config variables file at its default location.
    pub fn with_config_variables(self, yaml: &str) -> Self {
        self.write_file(CONFIG_VARIABLES, yaml);
        self
    }

    /// Create directories relative to the root.
    pub fn with_dirs(self, dirs: &[&str]) -> Self {
        for dir in dirs {
            fs::create_dir_all(self.path(dir))
                .unwrap_or_else(|e| panic!("TestProject::with_dirs: failed to create {dir}: {e}"));
        }
        self
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("TestProject::write_file: failed to write {}: {e}", path.display()));
    }

    /// Read `relative` as text.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read_file(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(full_path.exists(), "Expected file to exist: {}", full_path.display());
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(!full_path.exists(), "Expected file NOT to exist: {}", full_path.display());
    }

    /// Assert that the file at `path` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let file_content = self.read_file(path);
        assert!(
            file_content.contains(content),
            "File {path} does not contain expected content.\nExpected: {content}\nActual: {file_content}"
        );
    }

    /// Assert that the file at `path` does not contain `content`.
    pub fn assert_file_lacks(&self, path: &str, content: &str) {
        let file_content = self.read_file(path);
        assert!(
            !file_content.contains(content),
            "File {path} unexpectedly contains: {content}\nActual: {file_content}"
        );
    }
}
