//! Typed access to project configuration sections
//!
//! Getters substitute `${VAR}` placeholders on every read with the mapping
//! most recently handed over by the context. Setters write raw values, so the
//! persisted document keeps its placeholders.

use crate::config::{
    ConcurrencyConfig, ConfigDocument, ProgressBarsConfig, UsageStatisticsConfig, VariableSchema,
};
use crate::store::{
    CloudCredentials, CloudStoreBackend, InMemoryStoreBackend, InlineStoreBackend, Store,
    StoreKey, StoreKind,
};
use crate::substitution::{DOLLAR_SIGN_ESCAPE, Substitutions, substitute};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::rc::Rc;

/// Where [`DataContextVariables::save`] sends the document.
#[derive(Debug, Clone)]
pub enum VariablesBackend {
    /// Process-only.
    Ephemeral,
    /// Through the owning context's project file.
    File,
    /// To the hosted API.
    Cloud(CloudCredentials),
}

/// Typed facade over the project configuration document.
#[derive(Debug)]
pub struct DataContextVariables {
    document: Rc<ConfigDocument>,
    substitutions: Substitutions,
    backend: VariablesBackend,
    store: Option<Store>,
}

impl DataContextVariables {
    pub fn ephemeral(document: Rc<ConfigDocument>) -> Self {
        Self::with_backend(document, VariablesBackend::Ephemeral)
    }

    /// Variables saved through the document's file.
    ///
    /// Fails without a document to write back to.
    pub fn file_backed(document: Option<Rc<ConfigDocument>>) -> Result<Self> {
        let document = document.ok_or_else(|| {
            Error::invalid_argument("file-backed variables need the owning context's document")
        })?;
        Ok(Self::with_backend(document, VariablesBackend::File))
    }

    /// Variables saved to the hosted API. Every credential is required.
    pub fn cloud(
        document: Rc<ConfigDocument>,
        base_url: Option<String>,
        organization_id: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let credentials = CloudCredentials::new(base_url, organization_id, access_token)?;
        Ok(Self::with_backend(document, VariablesBackend::Cloud(credentials)))
    }

    fn with_backend(document: Rc<ConfigDocument>, backend: VariablesBackend) -> Self {
        Self {
            document,
            substitutions: Substitutions::new(),
            backend,
            store: None,
        }
    }

    pub fn backend(&self) -> &VariablesBackend {
        &self.backend
    }

    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    pub fn set_substitutions(&mut self, substitutions: Substitutions) {
        self.substitutions = substitutions;
    }

    /// The single key under which the whole document is saved.
    pub fn key(&self) -> StoreKey {
        StoreKey::single(VariableSchema::AllVariables.as_str())
    }

    fn store(&mut self) -> Result<&mut Store> {
        if self.store.is_none() {
            let store = match &self.backend {
                VariablesBackend::Ephemeral => Store::new(
                    "data_context_store",
                    StoreKind::DataContext,
                    Box::new(InMemoryStoreBackend::new()),
                ),
                VariablesBackend::File => Store::new(
                    "data_context_store",
                    StoreKind::DataContext,
                    Box::new(InlineStoreBackend::new(Rc::clone(&self.document))),
                ),
                VariablesBackend::Cloud(credentials) => Store::new(
                    "data_context_store",
                    StoreKind::DataContext,
                    Box::new(CloudStoreBackend::new(
                        credentials.clone(),
                        VariableSchema::AllVariables.as_str(),
                    )?),
                ),
            };
            self.store = Some(store);
        }
        self.store
            .as_mut()
            .ok_or_else(|| Error::backend("variables store unavailable"))
    }

    /// Persist the whole document through the configured backend.
    pub fn save(&mut self) -> Result<()> {
        let key = self.key();
        let config = self.document.read().to_value();
        self.store()?.set(&key, config)
    }

    /// Substituted value of a section.
    pub fn get(&self, section: VariableSchema) -> Option<Value> {
        let config = self.document.read();
        config
            .get(section)
            .map(|raw| substitute(raw, &self.substitutions, DOLLAR_SIGN_ESCAPE))
    }

    /// Raw, unsubstituted value of a section.
    pub fn get_raw(&self, section: VariableSchema) -> Option<Value> {
        self.document.read().get(section).cloned()
    }

    /// Assign a raw value. Persisting is up to [`Self::save`].
    pub fn set(&mut self, section: VariableSchema, value: Value) -> Result<()> {
        self.document.write().set(section, value)
    }

    fn get_typed<T: DeserializeOwned>(&self, section: VariableSchema) -> Result<Option<T>> {
        self.get(section)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::configuration(format!("invalid `{section}`: {e}")))
    }

    fn set_typed<T: Serialize>(&mut self, section: VariableSchema, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set(section, value)
    }

    fn get_string(&self, section: VariableSchema) -> Option<String> {
        self.get(section).and_then(|v| v.as_str().map(str::to_string))
    }

    fn get_map(&self, section: VariableSchema) -> Option<Map<String, Value>> {
        match self.get(section) {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn config_version(&self) -> Option<f64> {
        self.get(VariableSchema::ConfigVersion).and_then(|v| v.as_f64())
    }

    pub fn set_config_version(&mut self, version: f64) -> Result<()> {
        self.set_typed(VariableSchema::ConfigVersion, &version)
    }

    pub fn config_variables_file_path(&self) -> Option<String> {
        self.get_string(VariableSchema::ConfigVariablesFilePath)
    }

    pub fn set_config_variables_file_path(&mut self, path: &str) -> Result<()> {
        self.set_typed(VariableSchema::ConfigVariablesFilePath, &path)
    }

    pub fn plugins_directory(&self) -> Option<String> {
        self.get_string(VariableSchema::PluginsDirectory)
    }

    pub fn set_plugins_directory(&mut self, path: &str) -> Result<()> {
        self.set_typed(VariableSchema::PluginsDirectory, &path)
    }

    pub fn expectations_store_name(&self) -> Option<String> {
        self.get_string(VariableSchema::ExpectationsStoreName)
    }

    pub fn set_expectations_store_name(&mut self, name: &str) -> Result<()> {
        self.set_typed(VariableSchema::ExpectationsStoreName, &name)
    }

    pub fn validations_store_name(&self) -> Option<String> {
        self.get_string(VariableSchema::ValidationsStoreName)
    }

    pub fn set_validations_store_name(&mut self, name: &str) -> Result<()> {
        self.set_typed(VariableSchema::ValidationsStoreName, &name)
    }

    pub fn evaluation_parameter_store_name(&self) -> Option<String> {
        self.get_string(VariableSchema::EvaluationParameterStoreName)
    }

    pub fn set_evaluation_parameter_store_name(&mut self, name: &str) -> Result<()> {
        self.set_typed(VariableSchema::EvaluationParameterStoreName, &name)
    }

    pub fn checkpoint_store_name(&self) -> Option<String> {
        self.get_string(VariableSchema::CheckpointStoreName)
    }

    pub fn set_checkpoint_store_name(&mut self, name: &str) -> Result<()> {
        self.set_typed(VariableSchema::CheckpointStoreName, &name)
    }

    pub fn profiler_store_name(&self) -> Option<String> {
        self.get_string(VariableSchema::ProfilerStoreName)
    }

    pub fn set_profiler_store_name(&mut self, name: &str) -> Result<()> {
        self.set_typed(VariableSchema::ProfilerStoreName, &name)
    }

    pub fn stores(&self) -> Option<Map<String, Value>> {
        self.get_map(VariableSchema::Stores)
    }

    pub fn set_stores(&mut self, stores: Map<String, Value>) -> Result<()> {
        self.set(VariableSchema::Stores, Value::Object(stores))
    }

    pub fn data_docs_sites(&self) -> Option<Map<String, Value>> {
        self.get_map(VariableSchema::DataDocsSites)
    }

    pub fn set_data_docs_sites(&mut self, sites: Map<String, Value>) -> Result<()> {
        self.set(VariableSchema::DataDocsSites, Value::Object(sites))
    }

    pub fn notebooks(&self) -> Option<Value> {
        self.get(VariableSchema::Notebooks)
    }

    pub fn set_notebooks(&mut self, notebooks: Value) -> Result<()> {
        self.set(VariableSchema::Notebooks, notebooks)
    }

    pub fn anonymous_usage_statistics(&self) -> Result<Option<UsageStatisticsConfig>> {
        self.get_typed(VariableSchema::AnonymousUsageStatistics)
    }

    pub fn set_anonymous_usage_statistics(&mut self, usage: &UsageStatisticsConfig) -> Result<()> {
        self.set_typed(VariableSchema::AnonymousUsageStatistics, usage)
    }

    pub fn concurrency(&self) -> Result<Option<ConcurrencyConfig>> {
        self.get_typed(VariableSchema::Concurrency)
    }

    pub fn set_concurrency(&mut self, concurrency: &ConcurrencyConfig) -> Result<()> {
        self.set_typed(VariableSchema::Concurrency, concurrency)
    }

    pub fn progress_bars(&self) -> Result<Option<ProgressBarsConfig>> {
        self.get_typed(VariableSchema::ProgressBars)
    }

    pub fn set_progress_bars(&mut self, progress_bars: &ProgressBarsConfig) -> Result<()> {
        self.set_typed(VariableSchema::ProgressBars, progress_bars)
    }
}
