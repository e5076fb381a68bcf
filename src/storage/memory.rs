use crate::{
    prelude::{Arc, HashMap, Mutex},
    storage::{KeyValueStore, StoredValue, WriteBatch},
    MapError, Result,
};

/// In-memory store. Clones share the same entries, so a clone kept by the
/// caller sees everything committed through another handle.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.len(),
            Err(_) => {
                log::error!("memory store lock poisoned, reporting it as empty");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn contains(&self, key: &str) -> bool {
        match self.entries.lock() {
            Ok(entries) => entries.contains_key(key),
            Err(_) => {
                log::error!("memory store lock poisoned, treating '{key}' as absent");
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<StoredValue> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => {
                log::error!("memory store lock poisoned, treating '{key}' as absent");
                None
            }
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| MapError::Storage("memory store lock poisoned".into()))?;
        batch.apply_to(&mut *entries);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(_) => {
                log::error!("memory store lock poisoned, listing no keys");
                Vec::new()
            }
        }
    }

    fn health(&self) -> Result<()> {
        if self.entries.is_poisoned() {
            return Err(MapError::Storage("memory store lock poisoned".into()));
        }
        Ok(())
    }
}
