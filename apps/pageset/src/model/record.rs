use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a real record, issued by the remote source.
///
/// Valid identifiers are non-negative; the negative range is reserved for
/// placeholders (see [`crate::selection::MarkerCodec`]). Pages carrying a
/// negative id are rejected before they reach the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Display attributes; opaque to the selection logic.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(id: i64) -> Self {
        Self {
            id: RecordId(id),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Short human label: the `name` or `title` attribute, else the id.
    pub fn label(&self) -> String {
        ["name", "title"]
            .iter()
            .find_map(|key| self.attributes.get(*key))
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| self.id.to_string())
    }
}
