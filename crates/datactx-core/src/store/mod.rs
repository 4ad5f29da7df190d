//! Key-value stores and their backends
//!
//! A [`Store`] is a named, typed endpoint wrapping a [`StoreBackend`]. Backends
//! are built from configuration through the [`StoreRegistry`].

mod cloud;
mod filesystem;
mod inline;
mod memory;
mod registry;

pub use cloud::{CloudCredentials, CloudStoreBackend};
pub use filesystem::{FilesystemStoreBackend, STORE_BACKEND_ID_FILE};
pub use inline::InlineStoreBackend;
pub use memory::InMemoryStoreBackend;
pub use registry::{BackendContext, BackendFactory, StoreRegistry};

use crate::config::VariableSchema;
use crate::{Error, Result};
use serde_json::{Value, json};
use std::fmt;

/// Tuple key addressing one entry of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(Vec<String>);

impl StoreKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// The empty key; as a prefix it matches everything.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &StoreKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// A new key with `part` appended.
    pub fn child(&self, part: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(part.into());
        Self(parts)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

impl From<&str> for StoreKey {
    fn from(part: &str) -> Self {
        Self::single(part)
    }
}

impl From<Vec<String>> for StoreKey {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

/// Persistence contract shared by every store backend.
pub trait StoreBackend: fmt::Debug {
    /// Read the value at `key`; absent keys are [`Error::KeyLookup`].
    fn get(&self, key: &StoreKey) -> Result<Value>;

    fn set(&mut self, key: &StoreKey, value: Value) -> Result<()>;

    /// Delete the value at `key`; absent keys are [`Error::Backend`].
    fn remove_key(&mut self, key: &StoreKey) -> Result<()>;

    /// Keys below `prefix`. An empty prefix lists everything.
    fn list_keys(&self, prefix: &StoreKey) -> Result<Vec<StoreKey>>;

    fn has_key(&self, key: &StoreKey) -> Result<bool>;

    /// Relocate a value.
    fn move_key(&mut self, source: &StoreKey, dest: &StoreKey) -> Result<()> {
        let value = self.get(source)?;
        self.set(dest, value)?;
        self.remove_key(source)
    }

    /// Whether values survive the process.
    fn is_persistent(&self) -> bool {
        false
    }

    /// Stable identity of the underlying storage, if it has one.
    fn store_backend_id(&self) -> Option<String> {
        None
    }

    /// Configuration describing this backend, for listings.
    fn config(&self) -> Value;
}

/// Role a store plays for the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Expectations,
    Validations,
    EvaluationParameter,
    Checkpoint,
    Profiler,
    Datasource,
    DataContext,
}

impl StoreKind {
    pub const ALL: [StoreKind; 7] = [
        Self::Expectations,
        Self::Validations,
        Self::EvaluationParameter,
        Self::Checkpoint,
        Self::Profiler,
        Self::Datasource,
        Self::DataContext,
    ];

    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Expectations => "ExpectationsStore",
            Self::Validations => "ValidationsStore",
            Self::EvaluationParameter => "EvaluationParameterStore",
            Self::Checkpoint => "CheckpointStore",
            Self::Profiler => "ProfilerStore",
            Self::Datasource => "DatasourceStore",
            Self::DataContext => "DataContextStore",
        }
    }

    pub fn from_class_name(class_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.class_name() == class_name)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// A named store: kind plus backend.
#[derive(Debug)]
pub struct Store {
    name: String,
    kind: StoreKind,
    backend: Box<dyn StoreBackend>,
}

impl Store {
    pub fn new(name: impl Into<String>, kind: StoreKind, backend: Box<dyn StoreBackend>) -> Self {
        Self {
            name: name.into(),
            kind,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn backend(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }

    pub fn get(&self, key: &StoreKey) -> Result<Value> {
        self.backend.get(key)
    }

    pub fn set(&mut self, key: &StoreKey, value: Value) -> Result<()> {
        self.backend.set(key, value)
    }

    pub fn remove_key(&mut self, key: &StoreKey) -> Result<()> {
        self.backend.remove_key(key)
    }

    pub fn has_key(&self, key: &StoreKey) -> Result<bool> {
        self.backend.has_key(key)
    }

    pub fn list_keys(&self) -> Result<Vec<StoreKey>> {
        self.backend.list_keys(&StoreKey::root())
    }

    pub fn move_key(&mut self, source: &StoreKey, dest: &StoreKey) -> Result<()> {
        self.backend.move_key(source, dest)
    }

    /// Store configuration as it would appear under `stores`.
    pub fn config(&self) -> Value {
        json!({
            "class_name": self.kind.class_name(),
            "store_backend": self.backend.config(),
        })
    }

    // Datasource stores keep entries under the `datasources` section so the
    // same code works over the inline document or any tuple backend.
    fn datasource_key(&self, name: &str) -> Result<StoreKey> {
        if self.kind != StoreKind::Datasource {
            return Err(Error::backend(format!(
                "store `{}` is a {}, not a datasource store",
                self.name, self.kind
            )));
        }
        Ok(StoreKey::new([VariableSchema::Datasources.as_str(), name]))
    }

    /// Datasource config stored under `name`.
    pub fn retrieve_by_name(&self, name: &str) -> Result<Value> {
        let key = self.datasource_key(name)?;
        self.get(&key)
    }

    pub fn set_by_name(&mut self, name: &str, config: Value) -> Result<()> {
        let key = self.datasource_key(name)?;
        self.set(&key, config)
    }

    pub fn delete_by_name(&mut self, name: &str) -> Result<()> {
        let key = self.datasource_key(name)?;
        self.remove_key(&key)
    }

    pub fn has_name(&self, name: &str) -> Result<bool> {
        let key = self.datasource_key(name)?;
        self.has_key(&key)
    }

    /// Names of all stored datasources.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let prefix = StoreKey::single(VariableSchema::Datasources.as_str());
        Ok(self
            .backend
            .list_keys(&prefix)?
            .into_iter()
            .filter_map(|key| key.last().map(str::to_string))
            .collect())
    }
}
