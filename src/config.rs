//! Command-line and environment configuration for the `postenrich` binary.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use crate::models::ValidationMode;
use crate::oracle::{OllamaOracle, OllamaOracleBuilder};

/// postenrich - enrich social posts with metadata and unify their tags
#[derive(Debug, Parser)]
#[command(name = "postenrich")]
#[command(about = "Enrich social-media posts with line count, language and unified tags")]
#[command(version)]
pub struct Config {
    /// JSON file holding the raw posts
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Where to write the enriched posts
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Model to use (defaults to the largest model installed on the server)
    #[arg(short, long, env = "OLLAMA_MODEL", value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the Ollama server
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub base_url: String,

    /// Reject metadata that does not match the requested shape
    #[arg(long, env = "POSTENRICH_STRICT")]
    pub strict: bool,

    /// Retries per oracle request on transient failures
    #[arg(long, env = "POSTENRICH_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: usize,
}

impl Config {
    pub fn validation_mode(&self) -> ValidationMode {
        if self.strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }

    /// Builds the oracle, asking the server for a model if none was configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, or if no model is configured and the
    /// server cannot be queried or has none installed.
    pub fn build_oracle(&self) -> Result<OllamaOracle> {
        let mut oracle = OllamaOracleBuilder::new()
            .base_url(&self.base_url)
            .model(self.model.clone().unwrap_or_default())
            .max_retries(self.max_retries)
            .build()
            .context("Failed to create Ollama client")?;

        if oracle.model().is_empty() {
            let models = oracle.list_models().with_context(|| {
                format!("No model configured and could not list models at {}", oracle.base_url())
            })?;
            let Some(model) = models.into_iter().next() else {
                bail!("No model configured and none installed at {}", oracle.base_url());
            };
            info!(model = %model, "no model configured, using largest installed model");
            oracle.set_model(model);
        }

        Ok(oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            for key in ["OLLAMA_MODEL", "OLLAMA_HOST", "POSTENRICH_STRICT", "POSTENRICH_MAX_RETRIES"] {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn parses_positional_paths_with_defaults() {
        clear_env();
        let config = Config::try_parse_from(["postenrich", "raw.json", "out.json"]).unwrap();

        assert_eq!(config.source, PathBuf::from("raw.json"));
        assert_eq!(config.destination, PathBuf::from("out.json"));
        assert_eq!(config.model, None);
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.validation_mode(), ValidationMode::Lenient);
    }

    #[test]
    #[serial]
    fn parses_flags() {
        clear_env();
        let config = Config::try_parse_from([
            "postenrich",
            "raw.json",
            "out.json",
            "--model",
            "llama3.2",
            "--base-url",
            "http://gpu-box:11434",
            "--strict",
            "--max-retries",
            "0",
        ])
        .unwrap();

        assert_eq!(config.model.as_deref(), Some("llama3.2"));
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.validation_mode(), ValidationMode::Strict);
    }

    #[test]
    #[serial]
    fn reads_environment() {
        clear_env();
        unsafe {
            std::env::set_var("OLLAMA_MODEL", "mistral");
            std::env::set_var("POSTENRICH_STRICT", "true");
        }

        let config = Config::try_parse_from(["postenrich", "raw.json", "out.json"]).unwrap();
        clear_env();

        assert_eq!(config.model.as_deref(), Some("mistral"));
        assert!(config.strict);
    }

    #[test]
    #[serial]
    fn requires_both_paths() {
        clear_env();
        assert!(Config::try_parse_from(["postenrich", "raw.json"]).is_err());
    }

    #[test]
    #[serial]
    fn build_oracle_uses_configured_model_without_network() {
        clear_env();
        let config = Config::try_parse_from([
            "postenrich",
            "raw.json",
            "out.json",
            "--model",
            "llama3.2",
            "--base-url",
            "http://127.0.0.1:65535",
        ])
        .unwrap();

        let oracle = config.build_oracle().unwrap();
        assert_eq!(oracle.model(), "llama3.2");
        assert_eq!(oracle.base_url(), "http://127.0.0.1:65535");
    }

    #[test]
    #[serial]
    fn build_oracle_rejects_invalid_url() {
        clear_env();
        let config = Config::try_parse_from([
            "postenrich",
            "raw.json",
            "out.json",
            "--model",
            "llama3.2",
            "--base-url",
            "not a url",
        ])
        .unwrap();

        assert!(config.build_oracle().is_err());
    }
}
