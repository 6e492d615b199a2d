/// Text-understanding oracle module.
///
/// This module provides the `Oracle` capability trait used by the extractor and
/// the unifier, plus a blocking HTTP implementation backed by the Ollama API with
/// error handling, retry logic, and timeout configuration.
mod client;

pub use client::{OllamaOracle, OllamaOracleBuilder, Oracle, OracleError, retry_with_backoff};
