//! Batch enrichment pipeline.
//!
//! Runs the two stages over a batch of posts: per-post metadata extraction, where a
//! post whose reply cannot be used is skipped, followed by one batch-wide tag
//! unification whose failure aborts the whole run. The mapping is then applied back
//! onto every enriched post.
//!
//! For a batch of N eligible posts the oracle is called exactly N + 1 times, strictly
//! in sequence.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::EnrichError;
use crate::extractor::{MetadataExtractor, MetadataExtractorBuilder};
use crate::models::{Post, ValidationMode, preview};
use crate::oracle::Oracle;
use crate::storage::{load_posts, save_posts};
use crate::unifier::TagUnifier;

/// Counts describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Posts read from the source.
    pub loaded: usize,
    /// Posts dropped because they had no text caption.
    pub skipped_missing_caption: usize,
    /// Posts dropped because extraction failed.
    pub failed_extraction: usize,
    /// Posts in the output.
    pub enriched: usize,
    /// Distinct tags sent to unification.
    pub vocabulary_size: usize,
    /// Distinct tags across the output after unification.
    pub canonical_tags: usize,
}

/// Builder for constructing `EnrichmentPipeline` instances.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use postenrich::oracle::OllamaOracleBuilder;
/// use postenrich::pipeline::EnrichmentPipelineBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let oracle = OllamaOracleBuilder::new().model("llama3.2").build()?;
/// let pipeline = EnrichmentPipelineBuilder::new()
///     .oracle(Arc::new(oracle))
///     .build();
///
/// let report = pipeline.run(Path::new("data/raw_posts.json"), Path::new("data/processed_posts.json"))?;
/// println!("enriched {} of {} posts", report.enriched, report.loaded);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct EnrichmentPipelineBuilder {
    oracle: Option<Arc<dyn Oracle>>,
    validation: ValidationMode,
}

impl EnrichmentPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the oracle shared by extraction and unification.
    pub fn oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Sets how strictly extracted metadata is checked.
    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Builds the `EnrichmentPipeline`.
    ///
    /// # Panics
    ///
    /// Panics if `oracle()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> EnrichmentPipeline {
        let oracle = self.oracle.expect("oracle must be set via oracle() method");
        EnrichmentPipeline {
            extractor: MetadataExtractorBuilder::new()
                .oracle(oracle.clone())
                .validation(self.validation)
                .build(),
            unifier: TagUnifier::new(oracle),
        }
    }
}

/// Enriches a batch of posts and unifies their tags.
pub struct EnrichmentPipeline {
    extractor: MetadataExtractor,
    unifier: TagUnifier,
}

impl EnrichmentPipeline {
    /// Creates a lenient pipeline around `oracle`.
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        EnrichmentPipelineBuilder::new().oracle(oracle).build()
    }

    /// Loads posts from `source`, enriches them and writes the result to `destination`.
    ///
    /// Nothing is written unless every stage succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: `Load`, `NoEnrichedPosts`, `EmptyVocabulary`,
    /// a unification `Parse` error, `Oracle`, or `Write`.
    pub fn run(&self, source: &Path, destination: &Path) -> Result<EnrichmentReport, EnrichError> {
        let posts = load_posts(source).inspect_err(|e| {
            error!(error = %e, "error reading raw posts file");
        })?;
        info!(count = posts.len(), source = %source.display(), "loaded posts");

        let (enriched, report) = self.enrich(posts)?;

        save_posts(destination, &enriched).inspect_err(|e| {
            error!(error = %e, "error writing processed posts file");
        })?;
        info!(count = enriched.len(), destination = %destination.display(), "wrote enriched posts");

        Ok(report)
    }

    /// Runs extraction, unification and tag rewriting over an in-memory batch.
    ///
    /// Returns the enriched posts in input order (minus skipped posts) together with
    /// the run's counts.
    ///
    /// # Errors
    ///
    /// See [`EnrichmentPipeline::run`]; `Load` and `Write` do not occur here.
    pub fn enrich(&self, posts: Vec<Post>) -> Result<(Vec<Post>, EnrichmentReport), EnrichError> {
        let mut report = EnrichmentReport {
            loaded: posts.len(),
            ..EnrichmentReport::default()
        };

        let mut enriched = Vec::with_capacity(posts.len());
        for mut post in posts {
            let caption = match post.require_caption() {
                Ok(caption) => caption,
                Err(e) if e.is_recoverable() => {
                    warn!(post = %post.preview(), error = %e, "skipping post without a 'caption' field");
                    report.skipped_missing_caption += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.extractor.extract(caption) {
                Ok(metadata) => {
                    post.merge_metadata(metadata);
                    enriched.push(post);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(caption = %preview(caption), error = %e, "error extracting metadata, skipping post");
                    report.failed_extraction += 1;
                }
                Err(e) => {
                    error!(caption = %preview(caption), error = %e, "metadata extraction aborted");
                    return Err(e);
                }
            }
        }

        if enriched.is_empty() {
            error!("no enriched posts available for processing");
            return Err(EnrichError::NoEnrichedPosts);
        }

        let vocabulary: BTreeSet<String> = enriched.iter().flat_map(Post::tags).collect();
        report.vocabulary_size = vocabulary.len();

        let mapping = self.unifier.unify(&vocabulary).inspect_err(|e| {
            error!(error = %e, "error unifying tags");
        })?;
        info!(
            vocabulary = vocabulary.len(),
            mapped = mapping.len(),
            canonical = mapping.canonical_tags().len(),
            "unified tag vocabulary"
        );

        let mut final_tags = BTreeSet::new();
        for post in &mut enriched {
            let tags = mapping.apply(&post.tags());
            final_tags.extend(tags.iter().cloned());
            post.set_tags(tags);
        }

        report.enriched = enriched.len();
        report.canonical_tags = final_tags.len();
        Ok((enriched, report))
    }
}
