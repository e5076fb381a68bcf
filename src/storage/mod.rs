//! Flat key-value persistence
//!
//! Marker data lives in a string-keyed store with typed values. Writes are
//! grouped into a [`WriteBatch`] and applied all-or-nothing by
//! [`KeyValueStore::commit`], which returns only once the batch is durable
//! for that store.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::{prelude::HashMap, Result};
use serde::{Deserialize, Serialize};

/// A value held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    String(String),
    Float(f64),
    Int(i64),
}

impl StoredValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Floats, and ints widened to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::String(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(String, StoredValue),
    Remove(String),
}

/// An ordered set of writes committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops
            .push(WriteOp::Put(key.into(), StoredValue::String(value.into())));
        self
    }

    pub fn put_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.ops.push(WriteOp::Put(key.into(), StoredValue::Float(value)));
        self
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.ops.push(WriteOp::Put(key.into(), StoredValue::Int(value)));
        self
    }

    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove(key.into()));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every write in order; later writes to a key win
    pub(crate) fn apply_to<M>(self, entries: &mut M)
    where
        M: EntryMap,
    {
        for op in self.ops {
            match op {
                WriteOp::Put(key, value) => entries.put(key, value),
                WriteOp::Remove(key) => entries.delete(&key),
            }
        }
    }
}

/// Map types a batch can be applied to
pub(crate) trait EntryMap {
    fn put(&mut self, key: String, value: StoredValue);
    fn delete(&mut self, key: &str);
}

impl EntryMap for HashMap<String, StoredValue> {
    fn put(&mut self, key: String, value: StoredValue) {
        self.insert(key, value);
    }

    fn delete(&mut self, key: &str) {
        self.remove(key);
    }
}

impl EntryMap for std::collections::BTreeMap<String, StoredValue> {
    fn put(&mut self, key: String, value: StoredValue) {
        self.insert(key, value);
    }

    fn delete(&mut self, key: &str) {
        self.remove(key);
    }
}

/// String-keyed persistence scoped to the application
pub trait KeyValueStore {
    fn contains(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<StoredValue>;

    /// Applies the batch atomically and makes it durable before returning
    fn commit(&mut self, batch: WriteBatch) -> Result<()>;

    /// All keys currently present, in no particular order
    fn keys(&self) -> Vec<String>;

    /// Fails if the store can no longer be read reliably. Reads on an
    /// unhealthy store may report keys as missing.
    fn health(&self) -> Result<()> {
        Ok(())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_float())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }

    fn get(&self, key: &str) -> Option<StoredValue> {
        (**self).get(key)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        (**self).commit(batch)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn health(&self) -> Result<()> {
        (**self).health()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_applies_in_order() {
        let mut entries: HashMap<String, StoredValue> = HashMap::default();
        let mut batch = WriteBatch::new();
        batch
            .put_int("a", 1)
            .put_string("b", "x")
            .remove("a")
            .put_float("c", 1.5);
        assert_eq!(batch.len(), 4);

        batch.apply_to(&mut entries);

        assert!(!entries.contains_key("a"));
        assert_eq!(entries.get("b"), Some(&StoredValue::String("x".into())));
        assert_eq!(entries.get("c"), Some(&StoredValue::Float(1.5)));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(StoredValue::Int(3).as_float(), Some(3.0));
        assert_eq!(StoredValue::Float(3.0).as_int(), None);
        assert_eq!(StoredValue::String("s".into()).as_str(), Some("s"));
        assert_eq!(StoredValue::String("s".into()).as_float(), None);
    }

    #[test]
    fn test_value_json_shape() {
        let json = serde_json::to_string(&StoredValue::Float(2.0)).unwrap();
        assert_eq!(json, r#"{"type":"float","value":2.0}"#);
        let back: StoredValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StoredValue::Float(2.0));
    }
}
