//! Shared, explicitly owned project configuration document
//!
//! The context and the inline store backend both hold an `Rc` to the same
//! [`ConfigDocument`]. Writes go through the document, and `persist` flushes
//! it to whatever sink the owning context chose.

use super::ProjectConfig;
use crate::Result;
use datactx_fs::{ConfigStore, NormalizedPath};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Destination for a persisted configuration document.
pub trait DocumentSink: fmt::Debug {
    fn persist(&self, config: &ProjectConfig) -> Result<()>;

    /// Whether `persist` reaches durable storage.
    fn is_durable(&self) -> bool;
}

/// Writes the document as YAML to a file, atomically.
#[derive(Debug)]
pub struct FileSink {
    path: NormalizedPath,
    store: ConfigStore,
}

impl FileSink {
    pub fn new(path: NormalizedPath) -> Self {
        Self {
            path,
            store: ConfigStore::new(),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

impl DocumentSink for FileSink {
    fn persist(&self, config: &ProjectConfig) -> Result<()> {
        self.store.save(&self.path, config)?;
        tracing::debug!(path = %self.path, "Saved project configuration");
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}

/// Process-only document.
#[derive(Debug, Default)]
pub struct NullSink;

impl DocumentSink for NullSink {
    fn persist(&self, _config: &ProjectConfig) -> Result<()> {
        tracing::trace!("In-memory configuration; nothing to persist");
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// A mutable project configuration plus the sink it persists to.
#[derive(Debug)]
pub struct ConfigDocument {
    config: RefCell<ProjectConfig>,
    sink: Box<dyn DocumentSink>,
}

impl ConfigDocument {
    pub fn new(config: ProjectConfig, sink: Box<dyn DocumentSink>) -> Rc<Self> {
        Rc::new(Self {
            config: RefCell::new(config),
            sink,
        })
    }

    pub fn in_memory(config: ProjectConfig) -> Rc<Self> {
        Self::new(config, Box::new(NullSink))
    }

    pub fn file_backed(config: ProjectConfig, path: NormalizedPath) -> Rc<Self> {
        Self::new(config, Box::new(FileSink::new(path)))
    }

    pub fn read(&self) -> Ref<'_, ProjectConfig> {
        self.config.borrow()
    }

    /// Mutable access. The borrow must be dropped before calling [`Self::persist`].
    pub fn write(&self) -> RefMut<'_, ProjectConfig> {
        self.config.borrow_mut()
    }

    pub fn replace(&self, config: ProjectConfig) -> ProjectConfig {
        self.config.replace(config)
    }

    pub fn snapshot(&self) -> ProjectConfig {
        self.config.borrow().clone()
    }

    pub fn persist(&self) -> Result<()> {
        self.sink.persist(&self.config.borrow())
    }

    pub fn is_durable(&self) -> bool {
        self.sink.is_durable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VariableSchema;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn file_backed_document_writes_yaml() {
        let dir = TempDir::new().unwrap();
        let path = NormalizedPath::new(dir.path().join("datactx.yml"));
        let document = ConfigDocument::file_backed(ProjectConfig::default(), path.clone());

        document
            .write()
            .set(VariableSchema::PluginsDirectory, json!("plugins/"))
            .unwrap();
        document.persist().unwrap();

        let content = std::fs::read_to_string(path.to_native()).unwrap();
        let reloaded = ProjectConfig::from_yaml_str(&content).unwrap();
        assert_eq!(reloaded, document.snapshot());
        assert!(document.is_durable());
    }

    #[test]
    fn in_memory_document_never_touches_disk() {
        let document = ConfigDocument::in_memory(ProjectConfig::default());
        document.persist().unwrap();
        assert!(!document.is_durable());
    }
}
