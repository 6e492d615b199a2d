//! Batch-wide tag unification using an oracle.
//!
//! `TagUnifier` sends the whole tag vocabulary of a batch to the oracle in one call
//! and gets back a mapping from each original tag to a canonical tag. Which tags
//! merge is the oracle's call; this module only frames the request and checks that
//! the reply is a well-formed mapping.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, warn};

use crate::error::EnrichError;
use crate::models::TagMapping;
use crate::oracle::Oracle;
use crate::parser::parse_response;

/// Prompt template for tag unification. `{tags}` is replaced with the vocabulary.
const PROMPT_TEMPLATE: &str = r#"I will give you a list of tags. Unify them according to these rules:
1. Merge related tags into a shorter list.
   Example 1: "Self-Love & Confidence" and "Love" can be merged into "Self-Love & Confidence".
   Example 2: "Travel", "Adventure" and "trip" can be mapped to "Travel & Adventure".
   Example 3: "Friendship", "Family" and "Couples" can be mapped to "Family & Couples".
2. Every unified tag uses title case. Example: "Motivation", "Job Search".
3. Output a JSON object only. No preamble.
4. The object maps each original tag to its unified tag.
   For example: {"Love": "Self-Love & Confidence", "Travel": "Travel & Adventure", "Couple": "Family & Couples"}

Here is the list of tags:
{tags}
"#;

/// Joins tags into the comma-separated listing sent to the oracle.
///
/// `BTreeSet` iteration is sorted, so the prompt is identical across runs.
pub fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Builder for constructing `TagUnifier` instances.
#[derive(Default)]
pub struct TagUnifierBuilder {
    oracle: Option<Arc<dyn Oracle>>,
}

impl TagUnifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the oracle used for unification.
    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Builds the `TagUnifier`.
    ///
    /// # Panics
    ///
    /// Panics if `oracle()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> TagUnifier {
        TagUnifier {
            oracle: self.oracle.expect("oracle must be set via oracle() method"),
        }
    }
}

/// Collapses a batch's tag vocabulary into canonical tags.
pub struct TagUnifier {
    oracle: Arc<dyn Oracle>,
}

impl TagUnifier {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Requests a mapping for `all_tags` with a single oracle call.
    ///
    /// # Errors
    ///
    /// - `EnrichError::EmptyVocabulary` if `all_tags` is empty (the oracle is not called)
    /// - `EnrichError::Oracle` if the oracle request fails
    /// - `EnrichError::Parse` if the reply is not an object of string values
    pub fn unify(&self, all_tags: &BTreeSet<String>) -> Result<TagMapping, EnrichError> {
        if all_tags.is_empty() {
            return Err(EnrichError::EmptyVocabulary);
        }

        let prompt = PROMPT_TEMPLATE.replace("{tags}", &join_tags(all_tags));
        let response = self.oracle.invoke(&prompt)?;

        let mapping = parse_response(&response)
            .and_then(|object| TagMapping::from_object(object, &response))
            .inspect_err(|_| {
                error!(response = %response, "failed to parse unified tags response");
            })?;

        if mapping.is_empty() {
            warn!(
                vocabulary = all_tags.len(),
                "oracle returned an empty mapping; every tag keeps its original text"
            );
        }
        for (canonical, next) in mapping.unstable_canonicals() {
            warn!(canonical, next, "canonical tag is itself remapped; mapping is not idempotent");
        }

        Ok(mapping)
    }
}
