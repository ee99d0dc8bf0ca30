//! # Records
//!
//! A stored business entity: kind-scoped id, free-form fields and the two
//! store-managed timestamps.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use super::kind::EntityKind;

/// A record about to be inserted; the store stamps the timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub kind: EntityKind,
    pub id: u64,
    pub fields: Map<String, Value>,
}

impl NewRecord {
    pub fn new(kind: EntityKind, id: u64, fields: Map<String, Value>) -> Self {
        Self { kind, id, fields }
    }
}

/// A persisted record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: EntityKind,
    id: u64,
    fields: Map<String, Value>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl Record {
    /// Stamp a new record at insertion time
    pub fn stamped(new: NewRecord, now: DateTime<Utc>) -> Self {
        Self {
            kind: new.kind,
            id: new.id,
            fields: new.fields,
            created: now,
            updated: now,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of the natural key, if it is a string
    pub fn natural_key(&self) -> Option<&str> {
        self.get(self.kind.natural_key()).and_then(Value::as_str)
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// Merge a partial field set and bump `updated`
    pub(crate) fn apply(&mut self, partial: Map<String, Value>, now: DateTime<Utc>) {
        for (key, value) in partial {
            self.fields.insert(key, value);
        }
        self.updated = now;
    }

    /// The record as it appears on the wire
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry(self.kind.id_field(), &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("created", &self.created)?;
        map.serialize_entry("updated", &self.updated)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn song(title: &str) -> NewRecord {
        let fields = json!({"title": title, "songNo": 12})
            .as_object()
            .cloned()
            .unwrap();
        NewRecord::new(EntityKind::Songs, 5, fields)
    }

    #[test]
    fn test_serializes_kind_id_field() {
        let record = Record::stamped(song("Blessed Assurance"), Utc::now());
        let json = record.to_json();
        assert_eq!(json["songId"], 5);
        assert_eq!(json["title"], "Blessed Assurance");
        assert!(json.get("created").is_some());
        assert!(json.get("updated").is_some());
    }

    #[test]
    fn test_apply_keeps_created() {
        let t0 = Utc::now();
        let mut record = Record::stamped(song("A"), t0);
        let t1 = t0 + Duration::seconds(1);

        record.apply(json!({"title": "B"}).as_object().cloned().unwrap(), t1);

        assert_eq!(record.natural_key(), Some("B"));
        assert_eq!(record.created(), t0);
        assert_eq!(record.updated(), t1);
        assert_eq!(record.get("songNo"), Some(&json!(12)));
    }
}
