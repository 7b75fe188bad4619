//! Common types for the bim environment abstraction.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Seconds since the Unix epoch (signed, UTC).
pub type Timestamp = i64;

/// Stable identifier of one alarm (the bim bus `clock_id`).
///
/// Never empty: construction goes through [`AlarmId::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmId(String);

impl AlarmId {
    /// Creates an id, or `None` if `id` is empty.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AlarmId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AlarmId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AlarmId::new(value).ok_or_else(|| "alarm id must not be empty".to_string())
    }
}

impl From<AlarmId> for String {
    fn from(id: AlarmId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AlarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One value of an alarm record.
///
/// Settings stores hand out loosely typed maps; this keeps the shape
/// without committing to a schema. Variant order matters for
/// deserialization: integers must be tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<RecordValue>),
    Map(BTreeMap<String, RecordValue>),
}

impl RecordValue {
    /// Short type name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordValue::Null => "null",
            RecordValue::Bool(_) => "bool",
            RecordValue::Int(_) => "int",
            RecordValue::Float(_) => "float",
            RecordValue::Text(_) => "text",
            RecordValue::List(_) => "list",
            RecordValue::Map(_) => "map",
        }
    }

    /// Returns the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        RecordValue::Text(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        RecordValue::Text(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        RecordValue::Int(value)
    }
}

impl From<bool> for RecordValue {
    fn from(value: bool) -> Self {
        RecordValue::Bool(value)
    }
}

/// A single alarm as delivered by the settings source.
///
/// Only `id` and `ring_time` carry meaning for the agent; any other key
/// (name, days, snooze…) rides along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmRecord {
    fields: BTreeMap<String, RecordValue>,
}

impl AlarmRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RecordValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a record with an `id` and an optional `ring_time`.
    pub fn alarm(id: &str, ring_time: Option<&str>) -> Self {
        let record = Self::new().with("id", id);
        match ring_time {
            Some(ring_time) => record.with("ring_time", ring_time),
            None => record,
        }
    }

    /// Inserts or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RecordValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Looks up a field.
    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.fields.get(key)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered alarm list, as read from the settings source in one go.
pub type AlarmSnapshot = Vec<AlarmRecord>;
