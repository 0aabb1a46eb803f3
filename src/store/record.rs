use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A searchable entry: a display name plus an opaque payload
///
/// Only `name` takes part in matching and ordering. Everything else in the
/// source row (codes, coordinates, ...) is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style payload attachment
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String payload field, if present and a string
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A record is well-formed when its name has visible content
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
    }
}
