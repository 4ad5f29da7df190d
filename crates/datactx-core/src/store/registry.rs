//! Construction of stores and backends from configuration

use super::{
    CloudCredentials, CloudStoreBackend, FilesystemStoreBackend, InMemoryStoreBackend,
    InlineStoreBackend, Store, StoreBackend, StoreKind,
};
use crate::config::ConfigDocument;
use crate::{Error, Result};
use datactx_fs::NormalizedPath;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Builds a backend from its `store_backend` mapping.
pub type BackendFactory = fn(&Map<String, Value>, &BackendContext) -> Result<Box<dyn StoreBackend>>;

/// What a backend factory may need from the owning context.
#[derive(Debug, Clone, Default)]
pub struct BackendContext {
    /// Base for relative backend directories.
    pub root_directory: Option<NormalizedPath>,
    /// Document served by inline backends.
    pub document: Option<Rc<ConfigDocument>>,
}

/// Maps backend `class_name` tags to factories.
pub struct StoreRegistry {
    backends: HashMap<String, BackendFactory>,
}

fn string_field(config: &Map<String, Value>, field: &str) -> Option<String> {
    config.get(field).and_then(Value::as_str).map(str::to_string)
}

fn build_in_memory(_config: &Map<String, Value>, _ctx: &BackendContext) -> Result<Box<dyn StoreBackend>> {
    Ok(Box::new(InMemoryStoreBackend::new()))
}

fn build_filesystem(config: &Map<String, Value>, ctx: &BackendContext) -> Result<Box<dyn StoreBackend>> {
    let base_directory = string_field(config, "base_directory").ok_or_else(|| {
        Error::configuration("FilesystemStoreBackend requires a `base_directory`")
    })?;
    let resolved = match &ctx.root_directory {
        Some(root) => root.resolve(&base_directory),
        None => NormalizedPath::new(&base_directory),
    };

    let mut backend = FilesystemStoreBackend::new(resolved)
        .with_configured_base_directory(base_directory)
        .with_suppressed_store_backend_id(
            config
                .get("suppress_store_backend_id")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        )
        .with_manual_store_backend_id(string_field(config, "manually_initialize_store_backend_id"));
    if let Some(suffix) = string_field(config, "filepath_suffix") {
        backend = backend.with_filepath_suffix(suffix);
    }
    Ok(Box::new(backend))
}

fn build_inline(_config: &Map<String, Value>, ctx: &BackendContext) -> Result<Box<dyn StoreBackend>> {
    let document = ctx.document.clone().ok_or_else(|| {
        Error::configuration("InlineStoreBackend needs a configuration document to serve")
    })?;
    Ok(Box::new(InlineStoreBackend::new(document)))
}

fn build_cloud(config: &Map<String, Value>, _ctx: &BackendContext) -> Result<Box<dyn StoreBackend>> {
    let credentials = CloudCredentials::new(
        string_field(config, "base_url"),
        string_field(config, "organization_id"),
        string_field(config, "access_token"),
    )?;
    let resource_type = string_field(config, "resource_type")
        .ok_or_else(|| Error::configuration("CloudStoreBackend requires a `resource_type`"))?;
    Ok(Box::new(CloudStoreBackend::new(credentials, resource_type)?))
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registry with every built-in backend.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("InMemoryStoreBackend", build_in_memory);
        registry.register("FilesystemStoreBackend", build_filesystem);
        registry.register("TupleFilesystemStoreBackend", build_filesystem);
        registry.register("InlineStoreBackend", build_inline);
        registry.register("CloudStoreBackend", build_cloud);
        registry
    }

    pub fn register(&mut self, class_name: impl Into<String>, factory: BackendFactory) {
        self.backends.insert(class_name.into(), factory);
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.backends.contains_key(class_name)
    }

    /// Registered backend tags (sorted).
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.backends.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Build a backend from a `store_backend` mapping.
    pub fn build_backend(&self, config: &Value, ctx: &BackendContext) -> Result<Box<dyn StoreBackend>> {
        let config = config
            .as_object()
            .ok_or_else(|| Error::configuration("store_backend must be a mapping"))?;
        let class_name = config
            .get("class_name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration("store_backend requires a `class_name`"))?;
        let factory = self.backends.get(class_name).ok_or_else(|| {
            Error::configuration(format!("unknown store backend class `{class_name}`"))
        })?;
        factory(config, ctx)
    }

    /// Build a named store from its entry under `stores`.
    ///
    /// Stores without a `store_backend` are kept in memory.
    pub fn build_store(&self, name: &str, config: &Value, ctx: &BackendContext) -> Result<Store> {
        let class_name = config
            .get("class_name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::configuration(format!("store `{name}` requires a `class_name`")))?;
        let kind = StoreKind::from_class_name(class_name).ok_or_else(|| {
            Error::configuration(format!("store `{name}` has unknown class `{class_name}`"))
        })?;
        let backend = match config.get("store_backend") {
            Some(backend_config) if !backend_config.is_null() => {
                self.build_backend(backend_config, ctx)?
            }
            _ => Box::new(InMemoryStoreBackend::new()),
        };
        tracing::debug!(store = name, class_name, "Built store");
        Ok(Store::new(name, kind, backend))
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("backends", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::store::StoreKey;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn builds_store_without_backend_in_memory() {
        let registry = StoreRegistry::with_builtins();
        let store = registry
            .build_store(
                "evaluation_parameter_store",
                &json!({"class_name": "EvaluationParameterStore"}),
                &BackendContext::default(),
            )
            .unwrap();
        assert_eq!(store.kind(), StoreKind::EvaluationParameter);
        assert!(!store.backend().is_persistent());
    }

    #[test]
    fn resolves_filesystem_directories_against_root() {
        let dir = TempDir::new().unwrap();
        let ctx = BackendContext {
            root_directory: Some(NormalizedPath::new(dir.path())),
            document: None,
        };
        let mut store = StoreRegistry::with_builtins()
            .build_store(
                "expectations_store",
                &json!({
                    "class_name": "ExpectationsStore",
                    "store_backend": {"class_name": "FilesystemStoreBackend", "base_directory": "expectations/"}
                }),
                &ctx,
            )
            .unwrap();
        store.set(&StoreKey::single("suite"), json!({})).unwrap();
        assert!(dir.path().join("expectations/suite.json").is_file());
        assert_eq!(store.config()["store_backend"]["base_directory"], json!("expectations/"));
    }

    #[test]
    fn unknown_tags_are_configuration_errors() {
        let registry = StoreRegistry::with_builtins();
        let ctx = BackendContext::default();

        let err = registry
            .build_store("s", &json!({"class_name": "MysteryStore"}), &ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let err = registry
            .build_store(
                "s",
                &json!({"class_name": "ExpectationsStore", "store_backend": {"class_name": "S3StoreBackend"}}),
                &ctx,
            )
            .unwrap_err();
        assert!(err.to_string().contains("S3StoreBackend"));
    }

    #[test]
    fn inline_backend_needs_a_document() {
        let registry = StoreRegistry::with_builtins();
        let config = json!({"class_name": "InlineStoreBackend"});
        assert!(registry.build_backend(&config, &BackendContext::default()).is_err());

        let ctx = BackendContext {
            root_directory: None,
            document: Some(ConfigDocument::in_memory(ProjectConfig::default())),
        };
        assert!(registry.build_backend(&config, &ctx).is_ok());
    }

    #[test]
    fn lists_builtin_tags_sorted() {
        let registry = StoreRegistry::with_builtins();
        assert_eq!(
            registry.list(),
            vec![
                "CloudStoreBackend",
                "FilesystemStoreBackend",
                "InMemoryStoreBackend",
                "InlineStoreBackend",
                "TupleFilesystemStoreBackend",
            ]
        );
    }
}
