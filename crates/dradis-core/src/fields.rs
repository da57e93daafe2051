//! # Field Mappings and the Field-Block Codec
//!
//! Dradis stores the content of issues and content blocks as a single text
//! blob made of `#[Name]#` headed sections:
//!
//! ```text
//! #[Title]#\r\n
//! SQL injection\r\n
//! \r\n
//! #[Rating]#\r\n
//! High\r\n
//! \r\n
//! ```
//!
//! The platform parses that blob on write and hands back a pre-parsed
//! `fields` object on read, so only the encoding direction lives here.
//! Markers inside values are not escaped; a value containing `#[` ... `]#`
//! on its own line will be read back by Dradis as an extra field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Opening delimiter of a field marker.
pub const MARKER_OPEN: &str = "#[";
/// Closing delimiter of a field marker.
pub const MARKER_CLOSE: &str = "]#";
/// Line terminator used inside an encoded block.
pub const CRLF: &str = "\r\n";

// =============================================================================
// FIELD MAP
// =============================================================================

/// Ordered mapping of field names to values for one record.
///
/// Iteration follows insertion order; overwriting an existing key keeps its
/// original position. Values stay JSON at the boundary and are rendered to
/// text only when encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Value of `name` rendered as text, if present.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.0.get(name).map(field_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Insert or overwrite a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Serialize the mapping into a Dradis field block.
    ///
    /// Every field, including the last, is followed by a blank line, so the
    /// result of a non-empty mapping always ends in `\r\n\r\n`.
    pub fn encode(&self) -> String {
        let mut block = String::new();
        for (name, value) in &self.0 {
            block.push_str(MARKER_OPEN);
            block.push_str(name);
            block.push_str(MARKER_CLOSE);
            block.push_str(CRLF);
            block.push_str(&field_text(value));
            block.push_str(CRLF);
            block.push_str(CRLF);
        }
        block
    }
}

impl From<Map<String, Value>> for FieldMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<FieldMap> for Value {
    fn from(fields: FieldMap) -> Self {
        Value::Object(fields.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for FieldMap {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// TEXT RENDERING
// =============================================================================

/// Render a field value the way it appears inside an encoded block.
///
/// Strings are written verbatim, `null` as the empty string, and any other
/// value as its compact JSON text.
pub fn field_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
