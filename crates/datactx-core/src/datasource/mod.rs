//! Datasource handles and the registry that builds them
//!
//! Datasources are opaque to the context: it only needs to build one from a
//! config mapping and hand the shared handle back to callers.

mod builtins;

pub use builtins::{ExecutionEngineDatasource, SqlDatasource};

use crate::config::ConcurrencyConfig;
use crate::{Error, Result};
use datactx_fs::NormalizedPath;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A constructed connector.
pub trait Datasource: fmt::Debug {
    fn name(&self) -> &str;

    fn class_name(&self) -> &str;

    /// Substituted configuration the datasource was built from.
    fn config(&self) -> &Map<String, Value>;
}

/// What a datasource factory may need from the owning context.
#[derive(Debug, Clone, Default)]
pub struct DatasourceContext {
    pub root_directory: Option<NormalizedPath>,
    pub concurrency: Option<ConcurrencyConfig>,
}

type BuildFn = Box<dyn Fn(&str, &Map<String, Value>, &DatasourceContext) -> Result<Rc<dyn Datasource>>>;
type ConfigureFn = Box<dyn Fn(Map<String, Value>) -> Result<Map<String, Value>>>;

struct DatasourceEntry {
    build: BuildFn,
    build_configuration: Option<ConfigureFn>,
}

/// Maps datasource `class_name` tags to factories.
pub struct DatasourceRegistry {
    entries: HashMap<String, DatasourceEntry>,
}

impl DatasourceRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the built-in datasource types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ExecutionEngineDatasource::CLASS_NAME, |name, config, ctx| {
            Ok(Rc::new(ExecutionEngineDatasource::from_config(name, config, ctx)?) as Rc<dyn Datasource>)
        });
        registry.register_with_configuration(
            SqlDatasource::CLASS_NAME,
            |name, config, _ctx| Ok(Rc::new(SqlDatasource::from_config(name, config)?) as Rc<dyn Datasource>),
            SqlDatasource::build_configuration,
        );
        registry
    }

    pub fn register<F>(&mut self, class_name: impl Into<String>, build: F)
    where
        F: Fn(&str, &Map<String, Value>, &DatasourceContext) -> Result<Rc<dyn Datasource>> + 'static,
    {
        self.entries.insert(
            class_name.into(),
            DatasourceEntry {
                build: Box::new(build),
                build_configuration: None,
            },
        );
    }

    /// Register a type whose configs are normalised before being stored.
    pub fn register_with_configuration<F, C>(&mut self, class_name: impl Into<String>, build: F, configure: C)
    where
        F: Fn(&str, &Map<String, Value>, &DatasourceContext) -> Result<Rc<dyn Datasource>> + 'static,
        C: Fn(Map<String, Value>) -> Result<Map<String, Value>> + 'static,
    {
        self.entries.insert(
            class_name.into(),
            DatasourceEntry {
                build: Box::new(build),
                build_configuration: Some(Box::new(configure)),
            },
        );
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.entries.contains_key(class_name)
    }

    /// Registered type tags (sorted).
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    fn entry(&self, class_name: &str) -> Result<&DatasourceEntry> {
        self.entries.get(class_name).ok_or_else(|| {
            Error::configuration(format!("unknown datasource class `{class_name}`"))
        })
    }

    /// Normalise a config through its type's hook, if it has one.
    pub fn build_configuration(&self, class_name: &str, config: Map<String, Value>) -> Result<Map<String, Value>> {
        match &self.entry(class_name)?.build_configuration {
            Some(configure) => configure(config),
            None => Ok(config),
        }
    }

    /// Build a datasource from a substituted config naming its `class_name`.
    pub fn instantiate(
        &self,
        name: &str,
        config: &Map<String, Value>,
        ctx: &DatasourceContext,
    ) -> Result<Rc<dyn Datasource>> {
        let class_name = class_name_of(config)?;
        (self.entry(class_name)?.build)(name, config, ctx)
    }
}

/// The `class_name` of a datasource config.
pub fn class_name_of(config: &Map<String, Value>) -> Result<&str> {
    config
        .get("class_name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::configuration("datasource config requires a `class_name`"))
}

impl Default for DatasourceRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for DatasourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceRegistry")
            .field("classes", &self.list())
            .finish()
    }
}
