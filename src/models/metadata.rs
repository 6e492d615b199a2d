use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::Language;
use crate::error::EnrichError;

/// Keys the extraction prompt asks the oracle to return.
pub const METADATA_KEYS: [&str; 3] = ["line_count", "language", "tags"];

/// Maximum number of tags requested per post.
pub const MAX_TAGS_PER_POST: usize = 2;

/// How strictly an extracted metadata object is checked.
///
/// `Lenient` trusts the oracle and merges whatever it returned; `Strict` enforces
/// the shape the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Lenient,
    Strict,
}

/// Derived fields for one post, as returned by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    fields: Map<String, Value>,
}

impl Metadata {
    /// Builds metadata from a parsed oracle object.
    ///
    /// In both modes the `tags` field is normalized to an array of strings: a
    /// missing or non-array value becomes `[]` and non-string entries are dropped.
    ///
    /// # Errors
    ///
    /// In `Strict` mode, returns `EnrichError::Validation` when the key set is not
    /// exactly `line_count`/`language`/`tags`, `line_count` is not a non-negative
    /// integer, `language` is outside the closed set, or `tags` is not an array of
    /// at most two strings.
    pub fn from_object(
        mut fields: Map<String, Value>,
        mode: ValidationMode,
    ) -> Result<Self, EnrichError> {
        if mode == ValidationMode::Strict {
            validate_strict(&fields)?;
        }

        let tags: Vec<Value> = match fields.get("tags") {
            Some(Value::Array(items)) => items.iter().filter(|v| v.is_string()).cloned().collect(),
            Some(other) => {
                debug!(value = %other, "tags field is not an array, treating as empty");
                Vec::new()
            }
            None => {
                debug!("tags field missing, treating as empty");
                Vec::new()
            }
        };
        fields.insert("tags".to_string(), Value::Array(tags));

        Ok(Self { fields })
    }

    /// Returns the extracted tags as a set.
    pub fn tags(&self) -> BTreeSet<String> {
        tag_set(self.fields.get("tags"))
    }

    pub fn line_count(&self) -> Option<u64> {
        self.fields.get("line_count").and_then(Value::as_u64)
    }

    pub fn language(&self) -> Option<Language> {
        self.fields
            .get("language")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Returns all fields that will be merged into the post.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

/// Collects the string entries of a JSON array into a set.
pub(crate) fn tag_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn validate_strict(fields: &Map<String, Value>) -> Result<(), EnrichError> {
    let invalid = |msg: String| Err(EnrichError::Validation(msg));

    if fields.len() != METADATA_KEYS.len() || !METADATA_KEYS.iter().all(|k| fields.contains_key(*k))
    {
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        return invalid(format!(
            "expected exactly the keys {:?}, got {:?}",
            METADATA_KEYS, keys
        ));
    }

    if fields["line_count"].as_u64().is_none() {
        return invalid(format!(
            "line_count must be a non-negative integer, got {}",
            fields["line_count"]
        ));
    }

    match fields["language"].as_str() {
        Some(lang) => {
            lang.parse::<Language>().map_err(EnrichError::Validation)?;
        }
        None => {
            return invalid(format!(
                "language must be a string, got {}",
                fields["language"]
            ));
        }
    }

    let Some(tags) = fields["tags"].as_array() else {
        return invalid(format!("tags must be an array, got {}", fields["tags"]));
    };
    if tags.len() > MAX_TAGS_PER_POST {
        return invalid(format!(
            "at most {MAX_TAGS_PER_POST} tags allowed, got {}",
            tags.len()
        ));
    }
    if !tags.iter().all(Value::is_string) {
        return invalid("tags must all be strings".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn lenient_accepts_well_formed_metadata() {
        let metadata = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English", "tags": ["Travel", "Family"]})),
            ValidationMode::Lenient,
        )
        .unwrap();

        assert_eq!(metadata.line_count(), Some(1));
        assert_eq!(metadata.language(), Some(Language::English));
        assert_eq!(
            metadata.tags(),
            BTreeSet::from(["Family".to_string(), "Travel".to_string()])
        );
    }

    #[test]
    fn lenient_passes_unexpected_values_through() {
        let metadata = Metadata::from_object(
            object(json!({"line_count": 3, "language": "Tamil", "tags": ["a", "b", "c"], "mood": "happy"})),
            ValidationMode::Lenient,
        )
        .unwrap();

        assert_eq!(metadata.language(), None);
        assert_eq!(metadata.fields()["language"], "Tamil");
        assert_eq!(metadata.fields()["mood"], "happy");
        assert_eq!(metadata.tags().len(), 3);
    }

    #[test]
    fn lenient_normalizes_missing_or_malformed_tags() {
        let missing =
            Metadata::from_object(object(json!({"line_count": 1})), ValidationMode::Lenient)
                .unwrap();
        assert_eq!(missing.fields()["tags"], json!([]));

        let scalar = Metadata::from_object(object(json!({"tags": "Travel"})), ValidationMode::Lenient)
            .unwrap();
        assert!(scalar.tags().is_empty());

        let mixed = Metadata::from_object(object(json!({"tags": ["Travel", 7, null]})), ValidationMode::Lenient)
            .unwrap();
        assert_eq!(mixed.fields()["tags"], json!(["Travel"]));
    }

    #[test]
    fn duplicate_tags_collapse_into_set() {
        let metadata = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English", "tags": ["Travel", "Travel"]})),
            ValidationMode::Lenient,
        )
        .unwrap();
        assert_eq!(metadata.tags().len(), 1);
    }

    #[test]
    fn strict_accepts_well_formed_metadata() {
        let result = Metadata::from_object(
            object(json!({"line_count": 0, "language": "Hinglish", "tags": []})),
            ValidationMode::Strict,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn strict_rejects_too_many_tags() {
        let result = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English", "tags": ["a", "b", "c"]})),
            ValidationMode::Strict,
        );
        assert!(matches!(result, Err(EnrichError::Validation(msg)) if msg.contains("at most 2")));
    }

    #[test]
    fn strict_rejects_unknown_language() {
        let result = Metadata::from_object(
            object(json!({"line_count": 1, "language": "French", "tags": []})),
            ValidationMode::Strict,
        );
        assert!(matches!(result, Err(EnrichError::Validation(msg)) if msg.contains("French")));
    }

    #[test]
    fn strict_rejects_missing_and_extra_keys() {
        let missing = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English"})),
            ValidationMode::Strict,
        );
        assert!(matches!(missing, Err(EnrichError::Validation(_))));

        let extra = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English", "tags": [], "mood": "x"})),
            ValidationMode::Strict,
        );
        assert!(matches!(extra, Err(EnrichError::Validation(_))));
    }

    #[test]
    fn strict_rejects_negative_or_textual_line_count() {
        for line_count in [json!(-1), json!("2"), json!(1.5)] {
            let result = Metadata::from_object(
                object(json!({"line_count": line_count, "language": "English", "tags": []})),
                ValidationMode::Strict,
            );
            assert!(matches!(result, Err(EnrichError::Validation(_))));
        }
    }

    #[test]
    fn strict_rejects_non_string_tags() {
        let result = Metadata::from_object(
            object(json!({"line_count": 1, "language": "English", "tags": [1]})),
            ValidationMode::Strict,
        );
        assert!(matches!(result, Err(EnrichError::Validation(_))));
    }
}
