//! The data context: one project's configuration, stores and datasources
//!
//! A context is built in a fixed order: global overrides are applied to the
//! raw config, then plugins, stores, the datasource store, the context
//! identity, usage statistics and finally the datasources themselves.
//! Datasources that fail to build at startup are logged and skipped.

mod datasources;
mod overrides;
mod scaffold;
mod stores;
mod suites;

pub use scaffold::CONFIG_VARIABLES_TEMPLATE;

use crate::config::{
    ConcurrencyConfig, ConfigDocument, ProgressBarsConfig, ProjectConfig, UsageStatisticsConfig,
    VariableSchema,
};
use crate::datasource::{Datasource, DatasourceRegistry};
use crate::environment::Environment;
use crate::metrics::EvaluationParameterDependencies;
use crate::store::{InlineStoreBackend, Store, StoreKind, StoreRegistry};
use crate::substitution::{DOLLAR_SIGN_ESCAPE, Substitutions, substitute_config, substitute_str};
use crate::usage::UsageStatisticsHandler;
use crate::variables::DataContextVariables;
use crate::{Error, Result};
use datactx_fs::{NormalizedPath, ProjectPath, io};
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Name of the implicit store holding datasource configs.
pub const DATASOURCE_STORE_NAME: &str = "datasource_store";

/// Collaborators and inputs for building a context.
#[derive(Debug)]
pub struct ContextOptions {
    pub environment: Environment,
    /// Highest-precedence substitution values.
    pub runtime_environment: Substitutions,
    pub store_registry: StoreRegistry,
    pub datasource_registry: DatasourceRegistry,
}

impl ContextOptions {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            runtime_environment: Substitutions::new(),
            store_registry: StoreRegistry::with_builtins(),
            datasource_registry: DatasourceRegistry::with_builtins(),
        }
    }

    pub fn with_runtime_environment(mut self, runtime_environment: Substitutions) -> Self {
        self.runtime_environment = runtime_environment;
        self
    }

    pub fn with_runtime_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.runtime_environment.insert(name.into(), value.into());
        self
    }

    pub fn with_store_registry(mut self, registry: StoreRegistry) -> Self {
        self.store_registry = registry;
        self
    }

    pub fn with_datasource_registry(mut self, registry: DatasourceRegistry) -> Self {
        self.datasource_registry = registry;
        self
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self::new(Environment::process())
    }
}

/// Coordination point for one project.
///
/// File-backed contexts have a root directory and persist their config to
/// `datactx.yml`. Ephemeral contexts live only in the process.
#[derive(Debug)]
pub struct DataContext {
    root_directory: Option<NormalizedPath>,
    document: Rc<ConfigDocument>,
    environment: Environment,
    runtime_environment: Substitutions,
    config_variables: Substitutions,
    variables: Option<DataContextVariables>,
    stores: BTreeMap<String, Store>,
    datasource_store: Store,
    store_registry: StoreRegistry,
    datasource_registry: DatasourceRegistry,
    cached_datasources: BTreeMap<String, Rc<dyn Datasource>>,
    data_context_id: String,
    in_memory_instance_id: OnceCell<String>,
    usage_statistics_handler: Option<UsageStatisticsHandler>,
    plugin_search_paths: Vec<NormalizedPath>,
    evaluation_parameter_dependencies: EvaluationParameterDependencies,
    evaluation_parameter_dependencies_compiled: bool,
}

impl DataContext {
    /// A process-only context over `config`.
    pub fn ephemeral(config: ProjectConfig, options: ContextOptions) -> Result<Self> {
        Self::build(config, None, options)
    }

    /// Open the project whose `datactx.yml` lives in `root`.
    pub fn open(root: impl AsRef<Path>, options: ContextOptions) -> Result<Self> {
        let root = NormalizedPath::new(root.as_ref());
        let path = root.join(ProjectPath::ProjectConfig.as_str());
        if !path.is_file() {
            return Err(Error::configuration(format!(
                "no {} found in {root}; run `datactx init` to create a project",
                ProjectPath::ProjectConfig
            )));
        }
        let content = io::read_text(&path)?;
        let config = ProjectConfig::from_yaml_str(&content)?;
        Self::build(config, Some(root.canonicalize()?), options)
    }

    /// A file-backed context rooted at `root` using `config` instead of the file on disk.
    pub fn with_root(config: ProjectConfig, root: impl AsRef<Path>, options: ContextOptions) -> Result<Self> {
        Self::build(config, Some(NormalizedPath::new(root.as_ref())), options)
    }

    fn build(config: ProjectConfig, root_directory: Option<NormalizedPath>, options: ContextOptions) -> Result<Self> {
        let ContextOptions {
            environment,
            runtime_environment,
            store_registry,
            datasource_registry,
        } = options;

        let config = overrides::apply_global_config_overrides(&config, &environment)?;
        let document = match &root_directory {
            Some(root) => ConfigDocument::file_backed(config, root.join(ProjectPath::ProjectConfig.as_str())),
            None => ConfigDocument::in_memory(config),
        };
        let datasource_store = Store::new(
            DATASOURCE_STORE_NAME,
            StoreKind::Datasource,
            Box::new(InlineStoreBackend::new(Rc::clone(&document))),
        );

        let mut context = Self {
            root_directory,
            document,
            environment,
            runtime_environment,
            config_variables: Substitutions::new(),
            variables: None,
            stores: BTreeMap::new(),
            datasource_store,
            store_registry,
            datasource_registry,
            cached_datasources: BTreeMap::new(),
            data_context_id: String::new(),
            in_memory_instance_id: OnceCell::new(),
            usage_statistics_handler: None,
            plugin_search_paths: Vec::new(),
            evaluation_parameter_dependencies: EvaluationParameterDependencies::new(),
            evaluation_parameter_dependencies_compiled: false,
        };

        context.config_variables = context.load_config_variables()?;
        context.init_plugins()?;
        context.init_stores()?;
        context.data_context_id = context.construct_data_context_id()?;
        context.apply_data_context_id()?;
        context.init_usage_statistics()?;
        context.init_datasources()?;
        tracing::debug!(
            data_context_id = %context.data_context_id,
            root = ?context.root_directory.as_ref().map(|r| r.as_str()),
            "Data context ready"
        );
        Ok(context)
    }

    pub fn root_directory(&self) -> Option<&NormalizedPath> {
        self.root_directory.as_ref()
    }

    pub fn is_file_backed(&self) -> bool {
        self.root_directory.is_some()
    }

    pub fn document(&self) -> &Rc<ConfigDocument> {
        &self.document
    }

    /// Raw config, placeholders intact.
    pub fn config(&self) -> ProjectConfig {
        self.document.snapshot()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn runtime_environment(&self) -> &Substitutions {
        &self.runtime_environment
    }

    pub fn set_runtime_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.runtime_environment.insert(name.into(), value.into());
    }

    pub fn data_context_id(&self) -> &str {
        &self.data_context_id
    }

    pub fn usage_statistics_handler(&self) -> Option<&UsageStatisticsHandler> {
        self.usage_statistics_handler.as_ref()
    }

    pub fn plugin_search_paths(&self) -> &[NormalizedPath] {
        &self.plugin_search_paths
    }

    pub(crate) fn record_usage(&self, event: &str, payload: Value, success: bool) {
        if let Some(handler) = &self.usage_statistics_handler {
            handler.record(event, payload, success);
        }
    }

    pub(crate) fn anonymize(&self, value: &str) -> Option<String> {
        self.usage_statistics_handler
            .as_ref()
            .map(|handler| handler.anonymize(value))
    }

    // ----- substitution -----

    /// Config-variables file < environment < runtime overrides.
    ///
    /// Config variables are substituted against the environment first.
    /// Recomputed on every call so environment changes are picked up.
    pub fn determine_substitutions(&self) -> Substitutions {
        let environment = self.environment.substitutions();
        let file_variables: Map<String, Value> = self
            .config_variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut substitutions: Substitutions = match substitute_config(&Value::Object(file_variables), &environment) {
            Value::Object(resolved) => resolved.into_iter().collect(),
            _ => Substitutions::new(),
        };
        substitutions.extend(environment);
        substitutions.extend(self.runtime_environment.clone());
        substitutions
    }

    /// Deep copy of the config with every placeholder resolved where possible.
    pub fn get_config_with_variables_substituted(&self) -> Result<ProjectConfig> {
        let raw = self.document.read().to_value();
        ProjectConfig::from_value(substitute_config(&raw, &self.determine_substitutions()))
    }

    /// Typed facade over the config, refreshed with current substitutions.
    pub fn variables(&mut self) -> Result<&mut DataContextVariables> {
        let substitutions = self.determine_substitutions();
        let variables = match self.variables.take() {
            Some(variables) => variables,
            None if self.is_file_backed() => DataContextVariables::file_backed(Some(Rc::clone(&self.document)))?,
            None => DataContextVariables::ephemeral(Rc::clone(&self.document)),
        };
        let variables = self.variables.insert(variables);
        variables.set_substitutions(substitutions);
        Ok(variables)
    }

    /// Persist the whole config through the variables store.
    pub fn save_project_config(&mut self) -> Result<()> {
        self.variables()?.save()
    }

    pub fn concurrency(&self) -> Result<Option<ConcurrencyConfig>> {
        self.get_config_with_variables_substituted()?
            .typed(VariableSchema::Concurrency)
    }

    pub fn progress_bars(&self) -> Result<Option<ProgressBarsConfig>> {
        self.get_config_with_variables_substituted()?
            .typed(VariableSchema::ProgressBars)
    }

    pub fn notebooks(&self) -> Result<Option<Value>> {
        Ok(self
            .get_config_with_variables_substituted()?
            .get(VariableSchema::Notebooks)
            .cloned())
    }

    pub fn anonymous_usage_statistics(&self) -> Result<UsageStatisticsConfig> {
        self.get_config_with_variables_substituted()?
            .anonymous_usage_statistics()
    }

    fn resolve_path(&self, path: &str) -> NormalizedPath {
        match &self.root_directory {
            Some(root) => root.resolve(path),
            None => NormalizedPath::new(path),
        }
    }

    // ----- config variables -----

    fn config_variables_path(&self) -> Option<NormalizedPath> {
        self.root_directory.as_ref()?;
        let raw = self
            .document
            .read()
            .str_value(VariableSchema::ConfigVariablesFilePath)?
            .to_string();
        let defined = match substitute_str(&raw, &self.environment.substitutions(), DOLLAR_SIGN_ESCAPE) {
            Value::String(path) => path,
            other => other.to_string(),
        };
        Some(self.resolve_path(&defined))
    }

    fn load_config_variables(&self) -> Result<Substitutions> {
        let Some(path) = self.config_variables_path() else {
            return Ok(Substitutions::new());
        };
        if !path.is_file() {
            tracing::debug!(path = %path, "No config variables file; using an empty map");
            return Ok(Substitutions::new());
        }
        let content = io::read_text(&path)?;
        match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => Ok(Substitutions::new()),
            Value::Object(variables) => Ok(variables.into_iter().collect()),
            _ => Err(Error::configuration(format!(
                "config variables file {path} must be a mapping of names to values"
            ))),
        }
    }

    /// Re-read the config variables file.
    pub fn reload_config_variables(&mut self) -> Result<()> {
        self.config_variables = self.load_config_variables()?;
        Ok(())
    }

    pub fn config_variables(&self) -> &Substitutions {
        &self.config_variables
    }

    /// Set a config variable, writing the variables file for file-backed contexts.
    pub fn save_config_variable(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("config variable names must not be empty"));
        }
        self.config_variables.insert(name.to_string(), value.into());
        if let Some(path) = self.config_variables_path() {
            let variables: Map<String, Value> = self
                .config_variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            io::write_text(&path, &serde_yaml::to_string(&variables)?)?;
            tracing::debug!(path = %path, variable = name, "Saved config variable");
        }
        Ok(())
    }

    /// Per-installation id: the `instance_id` config variable, else one per process.
    pub fn instance_id(&self) -> String {
        match self.config_variables.get("instance_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => self
                .in_memory_instance_id
                .get_or_init(|| uuid::Uuid::new_v4().to_string())
                .clone(),
        }
    }

    // ----- startup steps -----

    /// Plugins directory resolved against the root.
    pub fn plugins_directory(&self) -> Result<Option<NormalizedPath>> {
        let config = self.get_config_with_variables_substituted()?;
        Ok(config
            .str_value(VariableSchema::PluginsDirectory)
            .map(|dir| self.resolve_path(dir)))
    }

    fn init_plugins(&mut self) -> Result<()> {
        if let Some(dir) = self.plugins_directory()? {
            if dir.is_dir() {
                tracing::debug!(path = %dir, "Adding plugins directory to search path");
                if !self.plugin_search_paths.contains(&dir) {
                    self.plugin_search_paths.push(dir);
                }
            }
        }
        Ok(())
    }

    fn apply_data_context_id(&mut self) -> Result<()> {
        let mut config = self.document.write();
        let mut usage = config.anonymous_usage_statistics()?;
        usage.data_context_id = Some(self.data_context_id.clone());
        config.set_anonymous_usage_statistics(&usage)
    }

    fn init_usage_statistics(&mut self) -> Result<()> {
        let usage = self.anonymous_usage_statistics()?;
        if !usage.enabled {
            tracing::info!("Usage statistics is disabled; skipping initialization");
            self.usage_statistics_handler = None;
            return Ok(());
        }
        let handler = UsageStatisticsHandler::new(
            self.data_context_id.clone(),
            self.instance_id(),
            usage.usage_statistics_url,
        );
        handler.record("data_context.__init__", serde_json::json!({}), true);
        self.usage_statistics_handler = Some(handler);
        Ok(())
    }
}
