//! # Field Allow-List
//!
//! Each deployment decides which issue fields the record tools accept
//! (`DRADIS_VULNERABILITY_PARAMETERS`). Tool arguments arrive as one
//! untyped `fields` object and are checked against this list at call time.

use crate::fields::{FieldMap, field_text};
use crate::DradisError;
use serde_json::{Map, Value};

/// Fields accepted when the deployment configures none.
pub const DEFAULT_FIELDS: [&str; 2] = ["Title", "Description"];

/// Ordered set of field names accepted by record tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAllowList {
    names: Vec<String>,
}

impl Default for FieldAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_FIELDS)
    }
}

impl FieldAllowList {
    /// Build from explicit names. Blank names and repeats are dropped; an
    /// empty result falls back to [`DEFAULT_FIELDS`].
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            unique = DEFAULT_FIELDS.iter().map(|s| (*s).to_string()).collect();
        }
        Self { names: unique }
    }

    /// Parse a comma-separated list such as `"Title, Rating, CVE"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Turn tool arguments into a field mapping ready for encoding.
    ///
    /// Unknown names are rejected. Null values are dropped, never encoded as
    /// empty. Remaining values are coerced to text. The result follows the
    /// allow-list order, not the argument order.
    pub fn accept(&self, args: &Map<String, Value>) -> Result<FieldMap, DradisError> {
        let unknown: Vec<&str> = args
            .keys()
            .filter(|name| !self.contains(name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(DradisError::Validation(format!(
                "Unknown field(s): {}. Allowed fields: {}",
                unknown.join(", "),
                self.names.join(", ")
            )));
        }

        let mut fields = FieldMap::new();
        for name in &self.names {
            match args.get(name) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    fields.insert(name.clone(), field_text(value).into_owned());
                }
            }
        }
        Ok(fields)
    }
}
