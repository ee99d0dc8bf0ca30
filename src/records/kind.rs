//! # Entity Kinds
//!
//! The seven resource collections of the library and the per-kind field
//! rules taken from their document models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LibraryError, LibraryResult};

/// Longest accepted value for bounded string fields
pub const MAX_STRING_LEN: usize = 100;

/// Fields the store manages itself; clients cannot set them
const MANAGED_FIELDS: [&str; 2] = ["created", "updated"];

/// A resource collection with its own id space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Books,
    Songs,
    Drafts,
    Edits,
    Listings,
    Organisations,
    Users,
}

impl EntityKind {
    /// Every kind, in routing order
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Books,
        EntityKind::Songs,
        EntityKind::Drafts,
        EntityKind::Edits,
        EntityKind::Listings,
        EntityKind::Organisations,
        EntityKind::Users,
    ];

    /// Collection name; also the sequence counter key
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Books => "books",
            EntityKind::Songs => "songs",
            EntityKind::Drafts => "drafts",
            EntityKind::Edits => "edits",
            EntityKind::Listings => "listings",
            EntityKind::Organisations => "organisations",
            EntityKind::Users => "users",
        }
    }

    /// Human-readable singular name used in messages
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Books => "Book",
            EntityKind::Songs => "Song",
            EntityKind::Drafts => "Draft",
            EntityKind::Edits => "Edit",
            EntityKind::Listings => "Listing",
            EntityKind::Organisations => "Organisation",
            EntityKind::Users => "User",
        }
    }

    pub fn schema(&self) -> &'static KindSchema {
        match self {
            EntityKind::Books => &BOOKS,
            EntityKind::Songs => &SONGS,
            EntityKind::Drafts => &DRAFTS,
            EntityKind::Edits => &EDITS,
            EntityKind::Listings => &LISTINGS,
            EntityKind::Organisations => &ORGANISATIONS,
            EntityKind::Users => &USERS,
        }
    }

    /// Name of the kind-scoped integer id field (`songId`, `userId`, ...)
    pub fn id_field(&self) -> &'static str {
        self.schema().id_field
    }

    /// Name of the natural key field (`title` or `username`)
    pub fn natural_key(&self) -> &'static str {
        self.schema().natural_key
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "books" => Ok(EntityKind::Books),
            "songs" => Ok(EntityKind::Songs),
            "drafts" => Ok(EntityKind::Drafts),
            "edits" => Ok(EntityKind::Edits),
            "listings" => Ok(EntityKind::Listings),
            "organisations" | "orgs" => Ok(EntityKind::Organisations),
            "users" => Ok(EntityKind::Users),
            other => Err(LibraryError::validation(format!(
                "unknown collection '{}'",
                other
            ))),
        }
    }
}

/// Default value applied to a missing field on create
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Int(i64),
    Bool(bool),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            FieldDefault::Int(n) => Value::from(n),
            FieldDefault::Bool(b) => Value::Bool(b),
        }
    }
}

/// Field rules for one kind
#[derive(Debug)]
pub struct KindSchema {
    pub id_field: &'static str,
    pub natural_key: &'static str,
    /// Must be present and non-empty on create
    pub required: &'static [&'static str],
    /// Unique within the kind; enforced by the store
    pub unique: &'static [&'static str],
    /// Strings limited to `MAX_STRING_LEN` characters
    pub bounded: &'static [&'static str],
    /// Integers that may not go below zero
    pub non_negative: &'static [&'static str],
    pub defaults: &'static [(&'static str, FieldDefault)],
}

const SONG_LIKE_DEFAULTS: &[(&str, FieldDefault)] = &[
    ("book", FieldDefault::Int(0)),
    ("songNo", FieldDefault::Int(0)),
    ("views", FieldDefault::Int(0)),
    ("likes", FieldDefault::Int(0)),
    ("liked", FieldDefault::Bool(false)),
];

static BOOKS: KindSchema = KindSchema {
    id_field: "bookId",
    natural_key: "title",
    required: &["title", "subTitle"],
    unique: &["title", "subTitle"],
    bounded: &["title", "subTitle"],
    non_negative: &["songs", "position", "bookNo"],
    defaults: &[
        ("user", FieldDefault::Int(1)),
        ("songs", FieldDefault::Int(0)),
        ("position", FieldDefault::Int(0)),
        ("bookNo", FieldDefault::Int(0)),
        ("enabled", FieldDefault::Bool(true)),
    ],
};

static SONGS: KindSchema = KindSchema {
    id_field: "songId",
    natural_key: "title",
    required: &["title"],
    unique: &["title"],
    bounded: &["title", "alias"],
    non_negative: &[],
    defaults: SONG_LIKE_DEFAULTS,
};

static DRAFTS: KindSchema = KindSchema {
    id_field: "draftId",
    natural_key: "title",
    required: &["title"],
    unique: &["title"],
    bounded: &["title", "alias"],
    non_negative: &[],
    defaults: SONG_LIKE_DEFAULTS,
};

static EDITS: KindSchema = KindSchema {
    id_field: "editId",
    natural_key: "title",
    required: &["title"],
    unique: &["title"],
    bounded: &["title", "alias"],
    non_negative: &[],
    defaults: SONG_LIKE_DEFAULTS,
};

static LISTINGS: KindSchema = KindSchema {
    id_field: "listingId",
    natural_key: "title",
    required: &["title"],
    unique: &["title"],
    bounded: &["title"],
    non_negative: &[],
    defaults: &[],
};

static ORGANISATIONS: KindSchema = KindSchema {
    id_field: "orgId",
    natural_key: "title",
    required: &["title"],
    unique: &["title"],
    bounded: &["title"],
    non_negative: &[],
    defaults: &[("public", FieldDefault::Bool(true))],
};

static USERS: KindSchema = KindSchema {
    id_field: "userId",
    natural_key: "username",
    required: &["username"],
    unique: &["username", "email", "phone"],
    bounded: &["username", "fullname", "email"],
    non_negative: &[],
    defaults: &[],
};

impl KindSchema {
    /// Validate and normalize a create payload.
    ///
    /// Strips server-managed fields and any client-supplied id, trims unique
    /// string fields, checks required/bounded/non-negative rules and fills in
    /// defaults.
    pub fn prepare_create(&self, payload: Value) -> LibraryResult<Map<String, Value>> {
        let mut fields = into_object(payload)?;
        fields.remove(self.id_field);
        self.normalize(&mut fields)?;

        for field in self.required {
            match fields.get(*field) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => return Err(LibraryError::validation(format!("{} is required", field))),
            }
        }

        for (field, default) in self.defaults {
            fields
                .entry(field.to_string())
                .or_insert_with(|| default.to_value());
        }

        Ok(fields)
    }

    /// Validate and normalize a partial update for record `id`.
    ///
    /// The id field may be echoed back unchanged but never altered.
    pub fn prepare_update(&self, id: u64, payload: Value) -> LibraryResult<Map<String, Value>> {
        let mut fields = into_object(payload)?;

        if let Some(echoed) = fields.remove(self.id_field) {
            if echoed.as_u64() != Some(id) {
                return Err(LibraryError::validation(format!(
                    "{} is immutable",
                    self.id_field
                )));
            }
        }

        self.normalize(&mut fields)?;

        for field in self.required {
            if let Some(value) = fields.get(*field) {
                if !matches!(value, Value::String(s) if !s.is_empty()) {
                    return Err(LibraryError::validation(format!(
                        "{} cannot be empty",
                        field
                    )));
                }
            }
        }

        if fields.is_empty() {
            return Err(LibraryError::validation("no fields to update"));
        }

        Ok(fields)
    }

    fn normalize(&self, fields: &mut Map<String, Value>) -> LibraryResult<()> {
        for managed in MANAGED_FIELDS {
            fields.remove(managed);
        }

        for field in self.unique {
            if let Some(Value::String(s)) = fields.get_mut(*field) {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
        }

        for field in self.bounded {
            match fields.get(*field) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) if s.chars().count() > MAX_STRING_LEN => {
                    return Err(LibraryError::validation(format!(
                        "{} cannot exceed {} characters",
                        field, MAX_STRING_LEN
                    )));
                }
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(LibraryError::validation(format!(
                        "{} must be a string",
                        field
                    )));
                }
            }
        }

        for field in self.non_negative {
            match fields.get(*field) {
                None | Some(Value::Null) => {}
                Some(v) if v.as_u64().is_some() => {}
                Some(_) => {
                    return Err(LibraryError::validation(format!(
                        "{} must be a non-negative integer",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}

fn into_object(payload: Value) -> LibraryResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(LibraryError::validation("payload must be a JSON object")),
    }
}
