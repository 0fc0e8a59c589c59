//! Key/value records, the unit of data held by every partition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual stand-in for an absent field, as rendered to users.
pub const NULL_TEXT: &str = "null";

/// Selects which half of a record an operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Key,
    Value,
}

impl Field {
    pub fn on_key(on_key: bool) -> Self {
        if on_key { Field::Key } else { Field::Value }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Key => write!(f, "key"),
            Field::Value => write!(f, "value"),
        }
    }
}

/// A single data item: an optional key and a value, both opaque text.
///
/// Numbers are parsed on demand by the operations that need them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    key: Option<String>,
    value: String,
}

impl Record {
    pub fn new(key: Option<String>, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// A keyed record.
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(Some(key.into()), value)
    }

    /// A record without a key.
    pub fn value_only(value: impl Into<String>) -> Self {
        Self::new(None, value)
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The selected field; only the key can be absent.
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Key => self.key(),
            Field::Value => Some(self.value()),
        }
    }

    /// The key as text, with an absent key rendered as `"null"`.
    pub fn key_text(&self) -> &str {
        self.key().unwrap_or(NULL_TEXT)
    }

    /// Key equality used by every by-key operation. Two keyless records
    /// match each other.
    pub fn same_key(&self, key: Option<&str>) -> bool {
        self.key() == key
    }

    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::new(self.key.clone(), value)
    }

    pub fn into_parts(self) -> (Option<String>, String) {
        (self.key, self.value)
    }
}

impl From<(Option<String>, String)> for Record {
    fn from((key, value): (Option<String>, String)) -> Self {
        Self::new(key, value)
    }
}

impl From<(&str, &str)> for Record {
    fn from((key, value): (&str, &str)) -> Self {
        Self::pair(key, value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "({}, {})", key, self.value),
            None => write!(f, "({})", self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access() {
        let record = Record::pair("a", "1");
        assert_eq!(record.field(Field::Key), Some("a"));
        assert_eq!(record.field(Field::Value), Some("1"));

        let keyless = Record::value_only("7");
        assert_eq!(keyless.field(Field::Key), None);
        assert_eq!(keyless.key_text(), "null");
    }

    #[test]
    fn test_same_key() {
        let record = Record::pair("a", "1");
        assert!(record.same_key(Some("a")));
        assert!(!record.same_key(Some("b")));
        assert!(!record.same_key(None));
        assert!(Record::value_only("x").same_key(None));
    }

    #[test]
    fn test_display() {
        assert_eq!(Record::pair("k", "v").to_string(), "(k, v)");
        assert_eq!(Record::value_only("v").to_string(), "(v)");
    }
}
