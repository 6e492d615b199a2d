use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::Metadata;
use super::metadata::tag_set;
use crate::error::EnrichError;

/// Number of characters shown when a caption is quoted in diagnostics.
pub const PREVIEW_CHARS: usize = 100;

/// One social-media post.
///
/// Posts are open-ended JSON objects. Field order is preserved from the source so
/// that persisted output diffs cleanly against the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Post(Map<String, Value>);

impl Post {
    /// Returns the caption text, if the post has one.
    ///
    /// A `caption` that is not a string is treated as absent.
    pub fn caption(&self) -> Option<&str> {
        self.0.get("caption").and_then(Value::as_str)
    }

    /// Returns the caption text, or `EnrichError::MissingCaption` if the post is
    /// not eligible for enrichment.
    pub fn require_caption(&self) -> Result<&str, EnrichError> {
        self.caption().ok_or(EnrichError::MissingCaption)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Merges metadata fields into the post.
    ///
    /// Extracted metadata wins on collision, so the derived fields always reflect
    /// the oracle's reply. Each overwritten value is logged. Returns the number of
    /// fields whose previous value was replaced.
    pub fn merge_metadata(&mut self, metadata: Metadata) -> usize {
        let mut replaced = 0;
        for (key, value) in metadata.into_fields() {
            if let Some(previous) = self.0.insert(key.clone(), value)
                && self.0.get(&key) != Some(&previous)
            {
                warn!(key = %key, previous = %previous, "overwriting existing post field with extracted metadata");
                replaced += 1;
            }
        }
        replaced
    }

    /// Returns the post's tags as a set (string entries of the `tags` array).
    pub fn tags(&self) -> BTreeSet<String> {
        tag_set(self.0.get("tags"))
    }

    /// Replaces the `tags` field with the given set, in sorted order.
    pub fn set_tags(&mut self, tags: BTreeSet<String>) {
        let values = tags.into_iter().map(Value::String).collect();
        self.0.insert("tags".to_string(), Value::Array(values));
    }

    /// Returns a short, single-line preview of the post for diagnostics.
    pub fn preview(&self) -> String {
        match self.caption() {
            Some(caption) => preview(caption),
            None => preview(&Value::Object(self.0.clone()).to_string()),
        }
    }
}

/// Truncates `text` to its first `PREVIEW_CHARS` characters.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationMode;
    use serde_json::json;

    fn post(value: Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    fn metadata(value: Value) -> Metadata {
        Metadata::from_object(value.as_object().cloned().unwrap(), ValidationMode::Lenient).unwrap()
    }

    #[test]
    fn caption_is_read_only_when_textual() {
        assert_eq!(post(json!({"caption": "hello"})).caption(), Some("hello"));
        assert_eq!(post(json!({"caption": 42})).caption(), None);
        assert_eq!(post(json!({"text": "hello"})).caption(), None);
    }

    #[test]
    fn merge_adds_new_fields_after_existing_ones() {
        let mut p = post(json!({"caption": "Great trip", "likes": 10}));
        let replaced = p.merge_metadata(metadata(
            json!({"line_count": 1, "language": "English", "tags": ["Travel"]}),
        ));

        assert_eq!(replaced, 0);
        let keys: Vec<&str> = p.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, ["caption", "likes", "line_count", "language", "tags"]);
    }

    #[test]
    fn merge_overwrites_existing_values_on_collision() {
        let mut p = post(json!({
            "caption": "hi",
            "line_count": "many",
            "language": "French",
            "tags": ["#a", "#b", "#c"]
        }));
        let replaced = p.merge_metadata(metadata(
            json!({"line_count": 1, "language": "English", "tags": ["Travel"]}),
        ));

        assert_eq!(replaced, 3);
        assert_eq!(p.get("line_count"), Some(&json!(1)));
        assert_eq!(p.get("language"), Some(&json!("English")));
        assert_eq!(p.get("tags"), Some(&json!(["Travel"])));
    }

    #[test]
    fn merge_does_not_count_identical_values_as_replaced() {
        let mut p = post(json!({"caption": "hi", "language": "English"}));
        let replaced = p.merge_metadata(metadata(
            json!({"line_count": 1, "language": "English", "tags": []}),
        ));
        assert_eq!(replaced, 0);
    }

    #[test]
    fn require_caption_reports_missing_caption() {
        assert_eq!(post(json!({"caption": "hello"})).require_caption().unwrap(), "hello");

        let err = post(json!({"text": "hello"})).require_caption().unwrap_err();
        assert!(matches!(err, EnrichError::MissingCaption));
        assert!(err.is_recoverable());
    }

    #[test]
    fn set_tags_writes_sorted_array() {
        let mut p = post(json!({"caption": "hi", "tags": ["b"]}));
        p.set_tags(BTreeSet::from(["Zen".to_string(), "Art".to_string()]));
        assert_eq!(p.get("tags"), Some(&json!(["Art", "Zen"])));
        assert_eq!(p.tags().len(), 2);
    }

    #[test]
    fn preview_truncates_to_one_hundred_characters() {
        let long = "é".repeat(150);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));

        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn post_round_trips_unknown_fields_in_order() {
        let raw = r#"{"caption":"x","engagement":5,"author":{"name":"a"}}"#;
        let p: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), raw);
    }
}
