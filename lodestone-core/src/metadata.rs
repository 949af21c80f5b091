//! Opaque chunk metadata.
//!
//! Metadata is a string-to-string mapping carried alongside a vector for
//! diagnostics. The core never interprets it; it is stored on insert and
//! surfaced through stats/debugging paths only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// String-to-string metadata attached to an indexed vector.
///
/// # Example
///
/// ```
/// use lodestone_core::Metadata;
///
/// let meta = Metadata::new()
///     .with_field("source", "user-manual.pdf")
///     .with_field("page", "12");
///
/// assert_eq!(meta.get("source"), Some("user-manual.pdf"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    fields: BTreeMap<String, String>,
}

impl Metadata {
    /// Creates a new empty metadata map.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. Chainable.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets a field value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.fields.insert(key.into(), value.into());
    }

    /// Gets a field value by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns true if the map contains the given key.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Metadata {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
