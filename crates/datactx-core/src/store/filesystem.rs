//! Filesystem store backend: tuple keys become path segments

use super::{StoreBackend, StoreKey};
use crate::{Error, Result};
use datactx_fs::{NormalizedPath, io, validate_path_segment};
use serde_json::{Value, json};
use std::cell::OnceCell;
use std::fs;

/// File in the base directory recording the backend identity.
pub const STORE_BACKEND_ID_FILE: &str = ".datactx_store_backend_id";

const STORE_BACKEND_ID_PREFIX: &str = "store_backend_id = ";

/// Stores each value as a JSON file at `<base>/<k1>/.../<kn><suffix>`.
#[derive(Debug)]
pub struct FilesystemStoreBackend {
    base_directory: NormalizedPath,
    configured_base_directory: String,
    filepath_suffix: String,
    suppress_store_backend_id: bool,
    manually_initialize_store_backend_id: Option<String>,
    backend_id: OnceCell<Option<String>>,
}

impl FilesystemStoreBackend {
    pub fn new(base_directory: NormalizedPath) -> Self {
        Self {
            configured_base_directory: base_directory.to_string(),
            base_directory,
            filepath_suffix: ".json".to_string(),
            suppress_store_backend_id: false,
            manually_initialize_store_backend_id: None,
            backend_id: OnceCell::new(),
        }
    }

    /// Keep the relative directory as written in config for listings.
    pub fn with_configured_base_directory(mut self, configured: impl Into<String>) -> Self {
        self.configured_base_directory = configured.into();
        self
    }

    pub fn with_filepath_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.filepath_suffix = suffix.into();
        self
    }

    pub fn with_suppressed_store_backend_id(mut self, suppress: bool) -> Self {
        self.suppress_store_backend_id = suppress;
        self
    }

    /// Identity to write when no identity file exists yet.
    pub fn with_manual_store_backend_id(mut self, id: Option<String>) -> Self {
        self.manually_initialize_store_backend_id = id;
        self
    }

    pub fn base_directory(&self) -> &NormalizedPath {
        &self.base_directory
    }

    fn key_to_path(&self, key: &StoreKey) -> Result<NormalizedPath> {
        let Some((last, dirs)) = key.parts().split_last() else {
            return Err(Error::InvalidKey {
                key: key.to_string(),
                message: "filesystem keys need at least one segment".to_string(),
            });
        };
        let mut path = self.base_directory.clone();
        for segment in dirs {
            validate_path_segment(segment)?;
            path = path.join(segment);
        }
        validate_path_segment(last)?;
        Ok(path.join(&format!("{last}{}", self.filepath_suffix)))
    }

    fn collect_keys(&self, dir: &NormalizedPath, parts: &mut Vec<String>, out: &mut Vec<StoreKey>) -> Result<()> {
        let native = dir.to_native();
        let entries = fs::read_dir(&native).map_err(|e| datactx_fs::Error::io(&native, e))?;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                parts.push(name.clone());
                self.collect_keys(&dir.join(&name), parts, out)?;
                parts.pop();
            } else if let Some(stem) = name.strip_suffix(&self.filepath_suffix) {
                let mut key = parts.clone();
                key.push(stem.to_string());
                out.push(StoreKey::from(key));
            }
        }
        Ok(())
    }

    fn id_file(&self) -> NormalizedPath {
        self.base_directory.join(STORE_BACKEND_ID_FILE)
    }

    fn read_or_create_id(&self) -> Result<Option<String>> {
        let path = self.id_file();
        if path.is_file() {
            let content = io::read_text(&path)?;
            let id = content
                .trim()
                .strip_prefix(STORE_BACKEND_ID_PREFIX)
                .unwrap_or(content.trim())
                .to_string();
            return Ok(Some(id));
        }
        if self.suppress_store_backend_id {
            return Ok(None);
        }
        let id = self
            .manually_initialize_store_backend_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        io::write_text(&path, &format!("{STORE_BACKEND_ID_PREFIX}{id}\n"))?;
        tracing::debug!(path = %path, "Initialized store backend id");
        Ok(Some(id))
    }
}

impl StoreBackend for FilesystemStoreBackend {
    fn get(&self, key: &StoreKey) -> Result<Value> {
        let path = self.key_to_path(key)?;
        if !path.is_file() {
            return Err(Error::key_lookup(key));
        }
        let content = io::read_text(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn set(&mut self, key: &StoreKey, value: Value) -> Result<()> {
        let path = self.key_to_path(key)?;
        let content = serde_json::to_string_pretty(&value)?;
        io::write_text(&path, &content)?;
        Ok(())
    }

    fn remove_key(&mut self, key: &StoreKey) -> Result<()> {
        let path = self.key_to_path(key)?;
        if !path.is_file() {
            return Err(Error::backend(format!("cannot remove absent key {key}")));
        }
        io::remove_file(&path)?;
        Ok(())
    }

    fn list_keys(&self, prefix: &StoreKey) -> Result<Vec<StoreKey>> {
        if !self.base_directory.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        self.collect_keys(&self.base_directory, &mut Vec::new(), &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn has_key(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.key_to_path(key)?.is_file())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn store_backend_id(&self) -> Option<String> {
        self.backend_id
            .get_or_init(|| match self.read_or_create_id() {
                Ok(id) => id,
                Err(e) => {
                    if !self.suppress_store_backend_id {
                        tracing::warn!(
                            base_directory = %self.base_directory,
                            error = %e,
                            "Could not read or create store backend id"
                        );
                    }
                    None
                }
            })
            .clone()
    }

    fn config(&self) -> Value {
        let mut config = json!({
            "class_name": "FilesystemStoreBackend",
            "base_directory": self.configured_base_directory,
        });
        if self.filepath_suffix != ".json" {
            config["filepath_suffix"] = json!(self.filepath_suffix);
        }
        if self.suppress_store_backend_id {
            config["suppress_store_backend_id"] = json!(true);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> FilesystemStoreBackend {
        FilesystemStoreBackend::new(NormalizedPath::new(dir.path().join("store")))
    }

    #[test]
    fn values_live_in_nested_json_files() {
        let dir = TempDir::new().unwrap();
        let mut store = backend(&dir);
        let key = StoreKey::new(["run", "suite"]);

        store.set(&key, json!({"ok": true})).unwrap();
        assert!(dir.path().join("store/run/suite.json").is_file());
        assert_eq!(store.get(&key).unwrap(), json!({"ok": true}));
        assert_eq!(store.list_keys(&StoreKey::root()).unwrap(), vec![key.clone()]);

        store.remove_key(&key).unwrap();
        assert!(!store.has_key(&key).unwrap());
        assert!(matches!(store.remove_key(&key), Err(Error::Backend { .. })));
    }

    #[test]
    fn rejects_traversal_segments() {
        let dir = TempDir::new().unwrap();
        let mut store = backend(&dir);
        assert!(store.set(&StoreKey::new(["..", "escape"]), json!(1)).is_err());
        assert!(store.get(&StoreKey::root()).is_err());
    }

    #[test]
    fn identity_is_created_once_and_reread() {
        let dir = TempDir::new().unwrap();
        let first = backend(&dir)
            .with_manual_store_backend_id(Some("seeded-id".to_string()))
            .store_backend_id();
        assert_eq!(first.as_deref(), Some("seeded-id"));

        let second = backend(&dir).store_backend_id();
        assert_eq!(second, first);
        assert!(
            backend(&dir)
                .list_keys(&StoreKey::root())
                .unwrap()
                .is_empty(),
            "identity file is not a key"
        );
    }

    #[test]
    fn suppressed_identity_is_not_created() {
        let dir = TempDir::new().unwrap();
        let store = backend(&dir).with_suppressed_store_backend_id(true);
        assert_eq!(store.store_backend_id(), None);
        assert!(!dir.path().join("store").join(STORE_BACKEND_ID_FILE).exists());
    }
}
