//! # In-Memory Record Store
//!
//! `RecordStore` backed by a `BTreeMap` keyed by id, with one hash index
//! per unique field. All mutations take the write lock, so a uniqueness
//! check and the write it guards are never interleaved with another writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use super::kind::EntityKind;
use super::record::{NewRecord, Record};
use super::store::{RecordStore, StoreError, StoreResult};
use crate::clock::{Clock, SystemClock};

/// In-memory store for one entity kind
pub struct InMemoryRecordStore {
    kind: EntityKind,
    clock: Arc<dyn Clock>,
    collection: RwLock<Collection>,
}

#[derive(Debug, Default)]
struct Collection {
    records: BTreeMap<u64, Record>,
    /// field -> (canonical value -> owning id)
    unique: HashMap<&'static str, HashMap<String, u64>>,
}

/// Canonical index key for a unique field value; `null` is never indexed
fn index_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl Collection {
    /// Find the first unique field in `fields` already owned by a record
    /// other than `except`
    fn conflict(
        &self,
        unique: &[&'static str],
        fields: &Map<String, Value>,
        except: Option<u64>,
    ) -> Option<StoreError> {
        for field in unique {
            let Some(key) = fields.get(*field).and_then(index_key) else {
                continue;
            };
            let owner = self.unique.get(field).and_then(|idx| idx.get(&key));
            if let Some(owner) = owner {
                if Some(*owner) != except {
                    return Some(StoreError::Duplicate {
                        field: field.to_string(),
                        value: key,
                    });
                }
            }
        }
        None
    }

    fn index(&mut self, unique: &[&'static str], id: u64, fields: &Map<String, Value>) {
        for field in unique {
            if let Some(key) = fields.get(*field).and_then(index_key) {
                self.unique.entry(*field).or_default().insert(key, id);
            }
        }
    }

    fn unindex(&mut self, unique: &[&'static str], fields: &Map<String, Value>) {
        for field in unique {
            if let Some(key) = fields.get(*field).and_then(index_key) {
                if let Some(idx) = self.unique.get_mut(field) {
                    idx.remove(&key);
                }
            }
        }
    }
}

impl InMemoryRecordStore {
    /// Create an empty store using the wall clock
    pub fn new(kind: EntityKind) -> Self {
        Self::with_clock(kind, Arc::new(SystemClock))
    }

    /// Create an empty store with an injected clock
    pub fn with_clock(kind: EntityKind, clock: Arc<dyn Clock>) -> Self {
        Self {
            kind,
            clock,
            collection: RwLock::new(Collection::default()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.read().map(|c| c.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unique_fields(&self) -> &'static [&'static str] {
        self.kind.schema().unique
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collection>> {
        self.collection
            .read()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collection>> {
        self.collection
            .write()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn find_by_key(&self, id: u64) -> StoreResult<Option<Record>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    fn find_by_key_set(&self, ids: &BTreeSet<u64>) -> StoreResult<Vec<Record>> {
        let collection = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| collection.records.get(id))
            .cloned()
            .collect())
    }

    fn find_by_field(&self, field: &str, values: &[Value]) -> StoreResult<Vec<Record>> {
        let collection = self.read()?;
        Ok(collection
            .records
            .values()
            .filter(|r| r.get(field).map_or(false, |v| values.contains(v)))
            .cloned()
            .collect())
    }

    fn check_unique(&self, fields: &Map<String, Value>) -> StoreResult<()> {
        match self.read()?.conflict(self.unique_fields(), fields, None) {
            Some(conflict) => Err(conflict),
            None => Ok(()),
        }
    }

    fn list(&self) -> StoreResult<Vec<Record>> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    fn insert(&self, record: NewRecord) -> StoreResult<Record> {
        if record.kind != self.kind {
            return Err(StoreError::Unavailable(format!(
                "{} record sent to {} store",
                record.kind, self.kind
            )));
        }

        let unique = self.unique_fields();
        let mut collection = self.write()?;

        if collection.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate {
                field: self.kind.id_field().to_string(),
                value: record.id.to_string(),
            });
        }
        if let Some(conflict) = collection.conflict(unique, &record.fields, None) {
            return Err(conflict);
        }

        let stored = Record::stamped(record, self.clock.now());
        collection.index(unique, stored.id(), stored.fields());
        collection.records.insert(stored.id(), stored.clone());

        Ok(stored)
    }

    fn update_by_key(
        &self,
        id: u64,
        mut partial: Map<String, Value>,
    ) -> StoreResult<Option<Record>> {
        let id_field = self.kind.id_field();
        if let Some(echoed) = partial.remove(id_field) {
            if echoed.as_u64() != Some(id) {
                return Err(StoreError::ImmutableField(id_field.to_string()));
            }
        }

        let unique = self.unique_fields();
        let mut collection = self.write()?;

        let previous: Map<String, Value> = match collection.records.get(&id) {
            Some(existing) => unique
                .iter()
                .filter(|f| partial.contains_key(**f))
                .filter_map(|f| existing.get(f).map(|v| (f.to_string(), v.clone())))
                .collect(),
            None => return Ok(None),
        };

        if let Some(conflict) = collection.conflict(unique, &partial, Some(id)) {
            return Err(conflict);
        }

        collection.unindex(unique, &previous);
        collection.index(unique, id, &partial);

        let now = self.clock.now();
        let Some(record) = collection.records.get_mut(&id) else {
            return Ok(None);
        };
        record.apply(partial, now);

        Ok(Some(record.clone()))
    }

    fn delete_by_key(&self, id: u64) -> StoreResult<u64> {
        let unique = self.unique_fields();
        let mut collection = self.write()?;

        match collection.records.remove(&id) {
            Some(removed) => {
                collection.unindex(unique, removed.fields());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
