//! Store backend whose storage is the live project configuration
//!
//! Keys are `(section,)` or `(section, name)` where `section` is a
//! [`VariableSchema`] member. `(data_context_variables,)` addresses the whole
//! document. Every successful write persists the document.

use super::{StoreBackend, StoreKey};
use crate::config::{ConfigDocument, ProjectConfig, VariableSchema};
use crate::{Error, Result};
use serde_json::{Value, json};
use std::rc::Rc;

/// Adapter presenting a [`ConfigDocument`] as a store backend.
#[derive(Debug, Clone)]
pub struct InlineStoreBackend {
    document: Rc<ConfigDocument>,
}

struct ConfigKey<'a> {
    section: VariableSchema,
    name: Option<&'a str>,
}

impl InlineStoreBackend {
    pub fn new(document: Rc<ConfigDocument>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Rc<ConfigDocument> {
        &self.document
    }

    fn parse_key<'a>(&self, key: &'a StoreKey) -> Result<ConfigKey<'a>> {
        let invalid = |message: &str| Error::InvalidKey {
            key: key.to_string(),
            message: message.to_string(),
        };
        let (section, name) = match key.parts() {
            [section] => (section, None),
            [section, name] => (section, Some(name.as_str())),
            [] => return Err(invalid("keys need a configuration section")),
            _ => return Err(invalid("keys have at most a section and a name")),
        };
        let section: VariableSchema = section.parse()?;
        if section == VariableSchema::AllVariables && name.is_some() {
            return Err(invalid("the whole document has no named entries"));
        }
        if name.is_some_and(str::is_empty) {
            return Err(invalid("entry names must not be empty"));
        }
        Ok(ConfigKey { section, name })
    }

    fn replace_document(&self, value: Value) -> Result<()> {
        let value = match value {
            Value::String(content) => serde_yaml::from_str(&content)?,
            other => other,
        };
        let config = ProjectConfig::from_value(value)?;
        self.document.replace(config);
        Ok(())
    }
}

impl StoreBackend for InlineStoreBackend {
    fn get(&self, key: &StoreKey) -> Result<Value> {
        let ConfigKey { section, name } = self.parse_key(key)?;
        let config = self.document.read();
        if section == VariableSchema::AllVariables {
            return Ok(config.to_value());
        }
        let value = config.get(section).ok_or_else(|| Error::key_lookup(key))?;
        match name {
            None => Ok(value.clone()),
            Some(name) => value
                .get(name)
                .cloned()
                .ok_or_else(|| Error::key_lookup(key)),
        }
    }

    fn set(&mut self, key: &StoreKey, value: Value) -> Result<()> {
        let ConfigKey { section, name } = self.parse_key(key)?;
        match (section, name) {
            (VariableSchema::AllVariables, _) => self.replace_document(value)?,
            (section, None) => self.document.write().set(section, value)?,
            (section, Some(name)) => {
                self.document
                    .write()
                    .section_map_mut(section)?
                    .insert(name.to_string(), value);
            }
        }
        self.document.persist()
    }

    fn remove_key(&mut self, key: &StoreKey) -> Result<()> {
        let ConfigKey { section, name } = self.parse_key(key)?;
        if section == VariableSchema::AllVariables {
            return Err(Error::backend("the whole configuration cannot be deleted"));
        }
        let Some(name) = name else {
            return Err(Error::backend(format!(
                "top-level section `{section}` cannot be deleted"
            )));
        };
        let present = self
            .document
            .read()
            .section_map(section)
            .is_some_and(|entries| entries.contains_key(name));
        if !present {
            return Err(Error::backend(format!(
                "cannot remove `{name}`: no such entry in `{section}`"
            )));
        }
        self.document
            .write()
            .section_map_mut(section)?
            .shift_remove(name);
        self.document.persist()
    }

    fn move_key(&mut self, source: &StoreKey, dest: &StoreKey) -> Result<()> {
        Err(Error::backend(format!(
            "configuration entries cannot be moved ({source} -> {dest})"
        )))
    }

    fn list_keys(&self, prefix: &StoreKey) -> Result<Vec<StoreKey>> {
        let config = self.document.read();
        if prefix.is_empty() {
            return Ok(config
                .section_names()
                .into_iter()
                .map(StoreKey::single)
                .collect());
        }

        let ConfigKey { section, .. } = self.parse_key(prefix)?;
        if section == VariableSchema::AllVariables {
            return Ok(config
                .section_names()
                .into_iter()
                .map(StoreKey::single)
                .collect());
        }
        let entries = config.section_map(section).ok_or_else(|| {
            Error::backend(format!("cannot list keys in `{section}`: not a mapping"))
        })?;
        Ok(entries
            .keys()
            .map(|name| StoreKey::new([section.as_str(), name.as_str()]))
            .collect())
    }

    fn has_key(&self, key: &StoreKey) -> Result<bool> {
        let ConfigKey { section, name } = self.parse_key(key)?;
        let config = self.document.read();
        Ok(match (section, name) {
            (VariableSchema::AllVariables, _) => true,
            (section, None) => config.contains(section),
            (section, Some(name)) => config
                .get(section)
                .is_some_and(|value| value.get(name).is_some()),
        })
    }

    fn is_persistent(&self) -> bool {
        self.document.is_durable()
    }

    fn config(&self) -> Value {
        json!({"class_name": "InlineStoreBackend"})
    }
}
