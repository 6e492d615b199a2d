//! Per-post metadata extraction using an oracle.
//!
//! `MetadataExtractor` asks the oracle for the line count, language and up to two
//! topical tags of a single caption, then parses and (optionally) validates the reply.

use std::sync::Arc;

use tracing::warn;

use crate::error::EnrichError;
use crate::models::{Metadata, ValidationMode, preview};
use crate::oracle::Oracle;
use crate::parser::parse_response;

/// Prompt template for metadata extraction. `{post}` is replaced with the caption.
const PROMPT_TEMPLATE: &str = r#"You are given an Instagram post. Extract the number of lines, the language of the post, and its tags.
1. Return a valid JSON object. No preamble.
2. The JSON object must have exactly three keys: line_count, language, and tags.
3. tags is an array of short text tags. Extract at most two tags.
4. language must be English or Hinglish (Hinglish means Hindi + English).

Here is the post:
{post}
"#;

/// Builder for constructing `MetadataExtractor` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use postenrich::extractor::MetadataExtractorBuilder;
/// use postenrich::models::ValidationMode;
/// use postenrich::oracle::OllamaOracleBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let oracle = OllamaOracleBuilder::new().model("llama3.2").build()?;
///
/// let extractor = MetadataExtractorBuilder::new()
///     .oracle(Arc::new(oracle))
///     .validation(ValidationMode::Strict)
///     .build();
///
/// let metadata = extractor.extract("Great trip with family!")?;
/// println!("{:?}", metadata.tags());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MetadataExtractorBuilder {
    oracle: Option<Arc<dyn Oracle>>,
    validation: ValidationMode,
}

impl MetadataExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the oracle used for extraction.
    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Sets how strictly oracle replies are checked (defaults to lenient).
    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Builds the `MetadataExtractor`.
    ///
    /// # Panics
    ///
    /// Panics if `oracle()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> MetadataExtractor {
        MetadataExtractor {
            oracle: self.oracle.expect("oracle must be set via oracle() method"),
            validation: self.validation,
        }
    }
}

/// Derives `Metadata` for a single caption.
pub struct MetadataExtractor {
    oracle: Arc<dyn Oracle>,
    validation: ValidationMode,
}

impl MetadataExtractor {
    /// Creates a lenient extractor. Prefer `MetadataExtractorBuilder` when a
    /// validation mode is needed.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            validation: ValidationMode::default(),
        }
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// Extracts metadata for `caption` with exactly one oracle call.
    ///
    /// # Errors
    ///
    /// - `EnrichError::Oracle` if the oracle request fails
    /// - `EnrichError::Parse` if the reply holds no well-formed object
    /// - `EnrichError::Validation` if strict validation rejects the object
    pub fn extract(&self, caption: &str) -> Result<Metadata, EnrichError> {
        let prompt = PROMPT_TEMPLATE.replace("{post}", caption);
        let response = self.oracle.invoke(&prompt)?;

        let object = parse_response(&response).inspect_err(|_| {
            warn!(
                caption = %preview(caption),
                response = %response,
                "failed to parse metadata response"
            );
        })?;

        Metadata::from_object(object, self.validation).inspect_err(|e| {
            warn!(caption = %preview(caption), error = %e, "metadata rejected");
        })
    }
}
