/// Oracle trait and Ollama HTTP implementation.
///
/// This module provides `OllamaOracle` for making synchronous HTTP requests to the Ollama API,
/// along with the transport error type and a builder for configuration.
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Default number of retries after the first attempt.
const DEFAULT_MAX_RETRIES: usize = 3;

/// Errors that can occur when talking to the oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Oracle API-specific errors
    #[error("Oracle API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OracleError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OracleError::Timeout(error)
        } else {
            OracleError::Network(error)
        }
    }
}

/// A text-in/text-out capability.
///
/// The pipeline depends only on this contract, so tests can substitute a scripted
/// implementation for the real service.
pub trait Oracle: Send + Sync {
    /// Sends `prompt` to the oracle and returns its raw text response.
    fn invoke(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Builder for constructing `OllamaOracle` instances.
///
/// # Examples
///
/// ```
/// use postenrich::oracle::OllamaOracleBuilder;
///
/// let oracle = OllamaOracleBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("llama3.2")
///     .build()
///     .expect("Failed to create oracle");
/// ```
#[derive(Debug, Default)]
pub struct OllamaOracleBuilder {
    base_url: Option<String>,
    model: Option<String>,
    max_retries: Option<usize>,
}

impl OllamaOracleBuilder {
    /// Creates a new `OllamaOracleBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name used for every generation request.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets how many times a transient failure is retried (0 disables retries).
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Builds the `OllamaOracle` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, this method will check the `OLLAMA_HOST`
    /// environment variable. If not set, it defaults to `http://localhost:11434`.
    ///
    /// If `model()` was not called, this method will check the `OLLAMA_MODEL`
    /// environment variable. If not set, it defaults to an empty string.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::InvalidUrl` if the base URL does not parse, or
    /// `OracleError::Network` if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<OllamaOracle, OracleError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        };

        let model = match self.model {
            Some(m) => m,
            None => std::env::var("OLLAMA_MODEL").unwrap_or_default(),
        };

        reqwest::Url::parse(&base_url)
            .map_err(|e| OracleError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OracleError::Network)?;

        Ok(OllamaOracle {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}

/// Synchronous oracle backed by an Ollama server.
///
/// Should be constructed using `OllamaOracleBuilder`.
pub struct OllamaOracle {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    max_retries: usize,
}

impl OllamaOracle {
    /// Returns the base URL configured for this oracle.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this oracle.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Replaces the configured model.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Lists available models from the Ollama API, sorted by size (largest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the `/api/tags` request fails.
    pub fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(OracleError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(OracleError::Http {
                status: response.status().as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(OracleError::Network)?;

        let mut models: Vec<(String, u64)> = json
            .get("models")
            .and_then(|m| m.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| {
                        let name = model.get("name").and_then(|n| n.as_str())?;
                        let size = model.get("size").and_then(|s| s.as_u64()).unwrap_or(0);
                        Some((name.to_string(), size))
                    })
                    .collect()
            })
            .unwrap_or_default();

        models.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(models.into_iter().map(|(name, _)| name).collect())
    }

    fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        if self.model.is_empty() {
            return Err(OracleError::Api {
                message: "no model configured".to_string(),
            });
        }

        let url = format!("{}/api/generate", self.base_url);
        let request_body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        retry_with_backoff(self.max_retries, || {
            debug!(model = %self.model, prompt_len = prompt.len(), "sending generate request");

            let response = self
                .client
                .post(&url)
                .json(&request_body)
                .send()
                .map_err(OracleError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(OracleError::Http {
                    status: status.as_u16(),
                });
            }

            let json: serde_json::Value = response.json().map_err(OracleError::from_reqwest)?;

            json.get("response")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| OracleError::Api {
                    message: "Missing 'response' field in API response".to_string(),
                })
        })
    }
}

impl Oracle for OllamaOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.generate(prompt)
    }
}

/// Retries an operation with exponential backoff.
///
/// The operation runs once, then up to `max_retries` more times with delays of 1s, 2s,
/// 4s, ... between attempts. Only transient errors (network, timeout, HTTP 5xx) are
/// retried; anything else is returned immediately.
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub fn retry_with_backoff<F, T>(max_retries: usize, mut f: F) -> Result<T, OracleError>
where
    F: FnMut() -> Result<T, OracleError>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && should_retry(&e) => {
                let delay_secs = 1u64 << attempt.min(6);
                warn!(error = %e, attempt = attempt + 1, delay_secs, "transient oracle failure, retrying");
                thread::sleep(Duration::from_secs(delay_secs));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Returns `true` for transient errors (HTTP 5xx, network errors, timeouts).
fn should_retry(error: &OracleError) -> bool {
    match error {
        OracleError::Network(_) => true,
        OracleError::Timeout(_) => true,
        OracleError::Http { status } => (500..600).contains(status),
        OracleError::Api { .. } => false,
        OracleError::InvalidUrl(_) => false,
    }
}
