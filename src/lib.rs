pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod oracle;
pub mod parser;
pub mod pipeline;
pub mod storage;
pub mod unifier;

pub use config::Config;
pub use error::{EnrichError, ParseError};
pub use extractor::{MetadataExtractor, MetadataExtractorBuilder};
pub use models::{Language, Metadata, Post, TagMapping, ValidationMode};
pub use oracle::{OllamaOracle, OllamaOracleBuilder, Oracle, OracleError};
pub use parser::parse_response;
pub use pipeline::{EnrichmentPipeline, EnrichmentPipelineBuilder, EnrichmentReport};
pub use storage::{load_posts, save_posts};
pub use unifier::{TagUnifier, TagUnifierBuilder};
