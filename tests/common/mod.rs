//! Shared test helpers.

use std::io;
use std::sync::{Arc, Mutex};

use postenrich::{Oracle, OracleError};

/// Oracle that answers extraction prompts by caption and unification prompts
/// with a fixed reply.
pub struct ScriptedOracle {
    extractions: Vec<(String, String)>,
    unification: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(extractions: Vec<(&str, &str)>, unification: &str) -> Self {
        Self {
            extractions: extractions
                .into_iter()
                .map(|(caption, reply)| (caption.to_string(), reply.to_string()))
                .collect(),
            unification: unification.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Oracle for ScriptedOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.contains("list of tags") {
            return Ok(self.unification.clone());
        }

        self.extractions
            .iter()
            .find(|(caption, _)| prompt.contains(caption.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| OracleError::Api {
                message: "unexpected prompt".to_string(),
            })
    }
}

/// Runs `f` with a subscriber that records formatted log lines, returning the
/// closure's result and everything that was logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let writer_buffer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || BufferWriter(writer_buffer.clone()))
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.lock().unwrap()).into_owned();
    (result, logs)
}

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
