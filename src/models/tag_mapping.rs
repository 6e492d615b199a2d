use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::ParseError;

/// Lookup from an original tag to its canonical tag.
///
/// Tags without an entry map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMapping {
    entries: BTreeMap<String, String>,
}

impl TagMapping {
    /// Builds a mapping from a parsed oracle object.
    ///
    /// `raw` is the response the object came from, kept for the error.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if any value is not a string.
    pub fn from_object(object: Map<String, Value>, raw: &str) -> Result<Self, ParseError> {
        let mut entries = BTreeMap::new();
        for (original, canonical) in object {
            match canonical {
                Value::String(canonical) => {
                    entries.insert(original, canonical);
                }
                other => {
                    return Err(ParseError::new(
                        raw,
                        format!("canonical tag for '{original}' is not a string: {other}"),
                    ));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Returns the canonical form of `tag`, or `tag` itself if unmapped.
    pub fn canonical<'a>(&'a self, tag: &'a str) -> &'a str {
        self.entries.get(tag).map_or(tag, String::as_str)
    }

    /// Maps every tag through the mapping, collapsing duplicates.
    pub fn apply(&self, tags: &BTreeSet<String>) -> BTreeSet<String> {
        tags.iter().map(|t| self.canonical(t).to_string()).collect()
    }

    /// Returns canonical tags that the mapping would rewrite again.
    ///
    /// When this is empty, applying the mapping is idempotent.
    pub fn unstable_canonicals(&self) -> Vec<(&str, &str)> {
        self.entries
            .values()
            .filter_map(|canonical| {
                let next = self.canonical(canonical);
                (next != canonical.as_str()).then_some((canonical.as_str(), next))
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the distinct canonical tags.
    pub fn canonical_tags(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
