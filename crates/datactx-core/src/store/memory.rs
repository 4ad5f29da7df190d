//! Process-local store backend

use super::{StoreBackend, StoreKey};
use crate::{Error, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Store backend holding values in a map for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryStoreBackend {
    data: BTreeMap<StoreKey, Value>,
}

impl InMemoryStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StoreBackend for InMemoryStoreBackend {
    fn get(&self, key: &StoreKey) -> Result<Value> {
        self.data.get(key).cloned().ok_or_else(|| Error::key_lookup(key))
    }

    fn set(&mut self, key: &StoreKey, value: Value) -> Result<()> {
        self.data.insert(key.clone(), value);
        Ok(())
    }

    fn remove_key(&mut self, key: &StoreKey) -> Result<()> {
        self.data
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::backend(format!("cannot remove absent key {key}")))
    }

    fn list_keys(&self, prefix: &StoreKey) -> Result<Vec<StoreKey>> {
        Ok(self
            .data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn has_key(&self, key: &StoreKey) -> Result<bool> {
        Ok(self.data.contains_key(key))
    }

    fn config(&self) -> Value {
        json!({"class_name": "InMemoryStoreBackend"})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud() {
        let mut backend = InMemoryStoreBackend::new();
        let key = StoreKey::new(["suite", "run"]);

        assert!(matches!(backend.get(&key), Err(Error::KeyLookup { .. })));
        backend.set(&key, json!(1)).unwrap();
        assert_eq!(backend.get(&key).unwrap(), json!(1));
        assert!(backend.has_key(&key).unwrap());
        assert_eq!(backend.list_keys(&StoreKey::single("suite")).unwrap(), vec![key.clone()]);
        assert!(backend.list_keys(&StoreKey::single("other")).unwrap().is_empty());

        backend.remove_key(&key).unwrap();
        assert!(backend.is_empty());
        assert!(matches!(backend.remove_key(&key), Err(Error::Backend { .. })));
    }

    #[test]
    fn move_key_relocates() {
        let mut backend = InMemoryStoreBackend::new();
        backend.set(&StoreKey::single("a"), json!("v")).unwrap();
        backend
            .move_key(&StoreKey::single("a"), &StoreKey::single("b"))
            .unwrap();
        assert!(!backend.has_key(&StoreKey::single("a")).unwrap());
        assert_eq!(backend.get(&StoreKey::single("b")).unwrap(), json!("v"));
    }
}
