//! Store construction and lookup

use super::DataContext;
use crate::config::{
    CURRENT_CONFIG_VERSION, DEFAULT_CHECKPOINT_STORE_NAME, DEFAULT_PROFILER_STORE_NAME, ProjectConfig,
    VariableSchema, filesystem_store,
};
use crate::masking::mask_credentials;
use crate::store::{BackendContext, Store, StoreKind};
use crate::{Error, Result};
use datactx_fs::ProjectPath;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Stores that predate their top-level name fields and may be discovered
/// from a directory in the project root instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LegacyStore {
    Checkpoint,
    Profiler,
}

impl LegacyStore {
    fn field(self) -> VariableSchema {
        match self {
            Self::Checkpoint => VariableSchema::CheckpointStoreName,
            Self::Profiler => VariableSchema::ProfilerStoreName,
        }
    }

    fn directory(self) -> ProjectPath {
        match self {
            Self::Checkpoint => ProjectPath::CheckpointsDir,
            Self::Profiler => ProjectPath::ProfilersDir,
        }
    }

    fn default_name(self) -> &'static str {
        match self {
            Self::Checkpoint => DEFAULT_CHECKPOINT_STORE_NAME,
            Self::Profiler => DEFAULT_PROFILER_STORE_NAME,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Checkpoint => "checkpoint",
            Self::Profiler => "profiler",
        }
    }

    fn default_store_config(self) -> Value {
        let kind = match self {
            Self::Checkpoint => StoreKind::Checkpoint,
            Self::Profiler => StoreKind::Profiler,
        };
        filesystem_store(kind.class_name(), &format!("{}/", self.directory()), true)
    }
}

impl DataContext {
    pub(super) fn backend_context(&self) -> BackendContext {
        BackendContext {
            root_directory: self.root_directory.clone(),
            document: Some(Rc::clone(&self.document)),
        }
    }

    /// Build every configured store from the substituted config.
    pub(super) fn init_stores(&mut self) -> Result<()> {
        let config = self.get_config_with_variables_substituted()?;
        let active = self.active_store_names_of(&config);
        let identity = config.anonymous_usage_statistics()?.data_context_id;
        let ctx = self.backend_context();

        let mut stores = BTreeMap::new();
        for (name, store_config) in config.stores().into_iter().flatten() {
            let mut store_config = store_config.clone();
            if let Some(backend) = store_config
                .get_mut("store_backend")
                .and_then(Value::as_object_mut)
            {
                if config.expectations_store_name() == Some(name.as_str()) {
                    if let Some(id) = &identity {
                        backend.insert(
                            "manually_initialize_store_backend_id".to_string(),
                            Value::String(id.clone()),
                        );
                    }
                }
                if !active.contains(name) {
                    backend.insert("suppress_store_backend_id".to_string(), Value::Bool(true));
                }
            }
            let store = self.store_registry.build_store(name, &store_config, &ctx)?;
            stores.insert(name.clone(), store);
        }
        self.stores = stores;

        let required = [
            (VariableSchema::ExpectationsStoreName, config.expectations_store_name()),
            (VariableSchema::ValidationsStoreName, config.validations_store_name()),
            (
                VariableSchema::EvaluationParameterStoreName,
                config.evaluation_parameter_store_name(),
            ),
        ];
        for (field, name) in required {
            if let Some(name) = name {
                if !self.stores.contains_key(name) {
                    return Err(Error::configuration(format!(
                        "`{field}` names store `{name}`, which is not configured under `stores`"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The expectations backend's persistent id if it has one, else the configured id.
    pub(super) fn construct_data_context_id(&self) -> Result<String> {
        let store = self.expectations_store()?;
        if store.backend().is_persistent() {
            if let Some(id) = store.backend().store_backend_id() {
                return Ok(id);
            }
        }
        let usage = self.document.read().anonymous_usage_statistics()?;
        Ok(usage
            .data_context_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()))
    }

    fn active_store_names_of(&self, config: &ProjectConfig) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = [
            config.expectations_store_name(),
            config.validations_store_name(),
            config.evaluation_parameter_store_name(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
        for legacy in [LegacyStore::Checkpoint, LegacyStore::Profiler] {
            if let Ok(name) = self.resolve_store_name(legacy, config) {
                names.insert(name);
            }
        }
        names
    }

    fn legacy_directory_exists(&self, store: LegacyStore) -> bool {
        self.root_directory
            .as_ref()
            .is_some_and(|root| root.join(store.directory().as_str()).is_dir())
    }

    fn resolve_store_name(&self, store: LegacyStore, config: &ProjectConfig) -> Result<String> {
        if let Some(name) = config.str_value(store.field()) {
            return Ok(name.to_string());
        }
        if self.legacy_directory_exists(store) {
            return Ok(store.default_name().to_string());
        }

        let field = store.field();
        let directory = store.directory();
        let location = match &self.root_directory {
            Some(root) => root.join(directory.as_str()).to_string(),
            None => directory.to_string(),
        };
        Err(Error::InvalidTopLevelConfigKey {
            message: format!(
                "Attempted to access the `{field}` field with no `{directory}` directory.\n  \
                 Please create the following directory: {location}\n  \
                 or add a `{field}` entry to {config_file}.\n  \
                 Configs at config_version {CURRENT_CONFIG_VERSION} name this store explicitly; \
                 upgrade older projects to that version.",
                config_file = ProjectPath::ProjectConfig,
            ),
        })
    }

    fn legacy_store(&mut self, store: LegacyStore) -> Result<&Store> {
        let name = self.resolve_store_name(store, &self.get_config_with_variables_substituted()?)?;
        if !self.stores.contains_key(&name) {
            if !self.legacy_directory_exists(store) {
                return Err(Error::StoreConfiguration {
                    message: format!(
                        "Attempted to access the {} store named `{name}`, which is not a configured store.",
                        store.label()
                    ),
                });
            }
            tracing::warn!(
                store = %name,
                directory = %store.directory(),
                "{} store is not configured; falling back to a default store in the {} directory",
                store.label(),
                store.directory()
            );
            let built = self
                .store_registry
                .build_store(&name, &store.default_store_config(), &self.backend_context())?;
            self.stores.insert(name.clone(), built);
        }
        self.stores.get(&name).ok_or_else(|| Error::StoreConfiguration {
            message: format!("store `{name}` is not configured"),
        })
    }

    pub fn checkpoint_store_name(&self) -> Result<String> {
        self.resolve_store_name(LegacyStore::Checkpoint, &self.get_config_with_variables_substituted()?)
    }

    /// Checkpoint store, falling back to `checkpoints/` for older projects.
    pub fn checkpoint_store(&mut self) -> Result<&Store> {
        self.legacy_store(LegacyStore::Checkpoint)
    }

    pub fn profiler_store_name(&self) -> Result<String> {
        self.resolve_store_name(LegacyStore::Profiler, &self.get_config_with_variables_substituted()?)
    }

    /// Profiler store, falling back to `profilers/` for older projects.
    pub fn profiler_store(&mut self) -> Result<&Store> {
        self.legacy_store(LegacyStore::Profiler)
    }

    pub(super) fn store_name(&self, field: VariableSchema) -> Result<String> {
        self.get_config_with_variables_substituted()?
            .str_value(field)
            .map(str::to_string)
            .ok_or_else(|| Error::configuration(format!("`{field}` is not set")))
    }

    fn named_store(&self, field: VariableSchema) -> Result<&Store> {
        let name = self.store_name(field)?;
        self.stores.get(&name).ok_or_else(|| Error::StoreConfiguration {
            message: format!("store `{name}` named by `{field}` is not configured"),
        })
    }

    fn named_store_mut(&mut self, field: VariableSchema) -> Result<&mut Store> {
        let name = self.store_name(field)?;
        self.stores.get_mut(&name).ok_or_else(|| Error::StoreConfiguration {
            message: format!("store `{name}` named by `{field}` is not configured"),
        })
    }

    pub fn expectations_store_name(&self) -> Result<String> {
        self.store_name(VariableSchema::ExpectationsStoreName)
    }

    pub fn validations_store_name(&self) -> Result<String> {
        self.store_name(VariableSchema::ValidationsStoreName)
    }

    pub fn evaluation_parameter_store_name(&self) -> Result<String> {
        self.store_name(VariableSchema::EvaluationParameterStoreName)
    }

    pub fn expectations_store(&self) -> Result<&Store> {
        self.named_store(VariableSchema::ExpectationsStoreName)
    }

    pub fn expectations_store_mut(&mut self) -> Result<&mut Store> {
        self.named_store_mut(VariableSchema::ExpectationsStoreName)
    }

    pub fn validations_store(&self) -> Result<&Store> {
        self.named_store(VariableSchema::ValidationsStoreName)
    }

    pub fn validations_store_mut(&mut self) -> Result<&mut Store> {
        self.named_store_mut(VariableSchema::ValidationsStoreName)
    }

    pub fn evaluation_parameter_store(&self) -> Result<&Store> {
        self.named_store(VariableSchema::EvaluationParameterStoreName)
    }

    pub fn evaluation_parameter_store_mut(&mut self) -> Result<&mut Store> {
        self.named_store_mut(VariableSchema::EvaluationParameterStoreName)
    }

    pub fn stores(&self) -> &BTreeMap<String, Store> {
        &self.stores
    }

    pub fn store(&self, name: &str) -> Option<&Store> {
        self.stores.get(name)
    }

    pub fn store_mut(&mut self, name: &str) -> Option<&mut Store> {
        self.stores.get_mut(name)
    }

    pub fn datasource_store(&self) -> &Store {
        &self.datasource_store
    }

    /// Add a store to the in-memory config and build it.
    ///
    /// Call [`DataContext::save_project_config`] to persist the entry.
    pub fn add_store(&mut self, name: &str, config: Value) -> Result<&Store> {
        if name.is_empty() {
            return Err(Error::invalid_argument("store names must not be empty"));
        }
        let substituted = crate::substitution::substitute_config(&config, &self.determine_substitutions());
        let store = self
            .store_registry
            .build_store(name, &substituted, &self.backend_context())?;
        self.document
            .write()
            .section_map_mut(VariableSchema::Stores)?
            .insert(name.to_string(), config);
        self.stores.insert(name.to_string(), store);
        tracing::info!(store = name, "Added store");
        self.stores
            .get(name)
            .ok_or_else(|| Error::configuration(format!("store `{name}` was not added")))
    }

    /// Configured stores with credentials masked, each tagged with its name.
    pub fn list_stores(&self) -> Result<Vec<Value>> {
        let config = self.get_config_with_variables_substituted()?;
        Ok(config
            .stores()
            .into_iter()
            .flatten()
            .map(|(name, store_config)| {
                let mut entry = mask_credentials(store_config);
                if let Value::Object(map) = &mut entry {
                    map.insert("name".to_string(), Value::String(name.clone()));
                }
                entry
            })
            .collect())
    }

    /// The subset of [`DataContext::list_stores`] the context actually uses.
    ///
    /// Checkpoint and profiler stores are skipped when their names cannot be resolved.
    pub fn list_active_stores(&self) -> Result<Vec<Value>> {
        let config = self.get_config_with_variables_substituted()?;
        let active = self.active_store_names_of(&config);
        Ok(self
            .list_stores()?
            .into_iter()
            .filter(|entry| {
                entry
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| active.contains(name))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextOptions;
    use crate::environment::Environment;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options() -> ContextOptions {
        ContextOptions::new(Environment::empty().without_global_config())
    }

    #[test]
    fn missing_named_store_is_a_configuration_error() {
        let mut config = ProjectConfig::default();
        config
            .set(VariableSchema::ValidationsStoreName, json!("nowhere"))
            .unwrap();
        let err = DataContext::ephemeral(config, options()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "{err}");
    }

    #[test]
    fn ephemeral_stores_are_built() {
        let ctx = DataContext::ephemeral(ProjectConfig::default(), options()).unwrap();
        assert_eq!(ctx.expectations_store().unwrap().kind(), StoreKind::Expectations);
        assert_eq!(ctx.validations_store().unwrap().kind(), StoreKind::Validations);
        assert_eq!(
            ctx.evaluation_parameter_store().unwrap().kind(),
            StoreKind::EvaluationParameter
        );
        assert_eq!(ctx.datasource_store().kind(), StoreKind::Datasource);
    }

    #[test]
    fn legacy_names_without_directory_fail() {
        let mut config = ProjectConfig::default();
        config.remove(VariableSchema::CheckpointStoreName);
        let mut ctx = DataContext::ephemeral(config, options()).unwrap();
        assert!(matches!(
            ctx.checkpoint_store_name(),
            Err(Error::InvalidTopLevelConfigKey { .. })
        ));
        assert!(matches!(
            ctx.checkpoint_store(),
            Err(Error::InvalidTopLevelConfigKey { .. })
        ));
    }

    #[test]
    fn unconfigured_legacy_store_without_directory_fails() {
        let mut config = ProjectConfig::default();
        config
            .set(VariableSchema::ProfilerStoreName, json!("custom_profilers"))
            .unwrap();
        let mut ctx = DataContext::ephemeral(config, options()).unwrap();
        assert_eq!(ctx.profiler_store_name().unwrap(), "custom_profilers");
        assert!(matches!(
            ctx.profiler_store(),
            Err(Error::StoreConfiguration { .. })
        ));
    }

    #[test]
    fn active_stores_skip_unresolvable_legacy_stores() {
        let mut config = ProjectConfig::default();
        config.remove(VariableSchema::CheckpointStoreName);
        config.remove(VariableSchema::ProfilerStoreName);
        let ctx = DataContext::ephemeral(config, options()).unwrap();

        let names = |entries: Vec<Value>| -> Vec<String> {
            entries
                .iter()
                .filter_map(|e| e["name"].as_str().map(str::to_string))
                .collect()
        };
        assert_eq!(
            names(ctx.list_active_stores().unwrap()),
            ["evaluation_parameter_store", "expectations_store", "validations_store"]
        );
        assert_eq!(names(ctx.list_stores().unwrap()).len(), 5);
    }

    #[test]
    fn add_store_builds_and_records() {
        let mut ctx = DataContext::ephemeral(ProjectConfig::default(), options()).unwrap();
        ctx.add_store("extra", json!({"class_name": "ValidationsStore"}))
            .unwrap();
        assert!(ctx.store("extra").is_some());
        assert!(ctx.config().stores().unwrap().contains_key("extra"));
    }
}
