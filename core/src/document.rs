use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A field value. JSON carries it bare (`2019`, `"text"`, `["a", "b"]`);
/// binary formats carry a variant tag since they cannot self-describe.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Bare {
    Int(i64),
    Text(String),
    List(Vec<String>),
}

#[derive(Serialize, Deserialize)]
enum Tagged {
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let human = serializer.is_human_readable();
        match (self, human) {
            (FieldValue::Int(n), true) => n.serialize(serializer),
            (FieldValue::Text(s), true) => s.serialize(serializer),
            (FieldValue::List(items), true) => items.serialize(serializer),
            (FieldValue::Int(n), false) => Tagged::Int(*n).serialize(serializer),
            (FieldValue::Text(s), false) => Tagged::Text(s.clone()).serialize(serializer),
            (FieldValue::List(items), false) => Tagged::List(items.clone()).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Ok(match Bare::deserialize(deserializer)? {
                Bare::Int(n) => FieldValue::Int(n),
                Bare::Text(s) => FieldValue::Text(s),
                Bare::List(items) => FieldValue::List(items),
            })
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Int(n) => FieldValue::Int(n),
                Tagged::Text(s) => FieldValue::Text(s),
                Tagged::List(items) => FieldValue::List(items),
            })
        }
    }
}

impl FieldValue {
    /// Text form used for analysis; list entries are joined with a single space.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Int(n) => Cow::Owned(n.to_string()),
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::List(items) => Cow::Owned(items.join(" ")),
        }
    }

    /// Empty or whitespace-only text, or a list with no non-blank entry.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Int(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::List(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { FieldValue::Text(s.to_string()) }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self { FieldValue::Text(s) }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self { FieldValue::Int(n) }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self { FieldValue::Int(n.into()) }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self { FieldValue::List(items) }
}

/// A structured record handed over by ingestion. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), fields: BTreeMap::new() }
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}
