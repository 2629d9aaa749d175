use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StorageError;

/// The three collections the store manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Bookmarks,
    History,
    Downloads,
}

impl Collection {
    /// Every collection, in schema-creation order
    pub const ALL: [Collection; 3] = [Collection::Bookmarks, Collection::History, Collection::Downloads];

    /// Stable on-disk name
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Bookmarks => "bookmarks",
            Collection::History => "history",
            Collection::Downloads => "downloads",
        }
    }

    /// Fields with a secondary (non-unique) index
    pub fn indexed_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Bookmarks => &["url", "title", "folderId"],
            Collection::History => &["url", "title", "timestamp"],
            Collection::Downloads => &["url", "filename", "timestamp"],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One durable stored unit
///
/// `id` is unique within its collection. The store hands out owned copies;
/// replacing a record is an explicit `put` with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            fields,
        }
    }

    /// Build a record from any serializable value. The value must
    /// serialize to a JSON object.
    pub fn from_serializable<T: Serialize>(
        id: impl Into<String>,
        value: &T,
    ) -> Result<Self, StorageError> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self::new(id, fields)),
            other => Err(StorageError::Conflict(format!(
                "record fields must be an object, got {}",
                match other {
                    Value::Null => "null",
                    Value::Bool(_) => "a boolean",
                    Value::Number(_) => "a number",
                    Value::String(_) => "a string",
                    Value::Array(_) => "an array",
                    Value::Object(_) => unreachable!(),
                }
            ))),
        }
    }

    /// Read the record back into a typed value
    pub fn deserialize<T: for<'de> Deserialize<'de>>(&self) -> Result<T, StorageError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// A single named field, if present
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The index key for a field value. Strings index by their content,
    /// everything else by its JSON text.
    pub(crate) fn index_key(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
