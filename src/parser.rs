//! Recovery of a structured object embedded in a free-text oracle reply.

use serde_json::{Map, Value};

use crate::error::ParseError;

/// Extracts the JSON object spanning from the first `{` to the last `}` in `response`.
///
/// Models often wrap the object in commentary or a markdown fence despite being told
/// not to; this keeps the object and drops the rest. The span is greedy, so two
/// separate objects with prose between them will not parse.
///
/// # Errors
///
/// Returns `ParseError` carrying the full raw text when there is no `{`, no `}` after
/// it, or the span is not valid JSON.
///
/// # Examples
///
/// ```
/// use postenrich::parser::parse_response;
///
/// let obj = parse_response("Sure!\n{\"language\": \"English\"}\nBye").unwrap();
/// assert_eq!(obj["language"], "English");
/// ```
pub fn parse_response(response: &str) -> Result<Map<String, Value>, ParseError> {
    let span = extract_json(response)?;
    serde_json::from_str(span).map_err(|e| ParseError::new(response, e.to_string()))
}

fn extract_json(response: &str) -> Result<&str, ParseError> {
    let start = response
        .find('{')
        .ok_or_else(|| ParseError::new(response, "no '{' found"))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| ParseError::new(response, "no '}' after the first '{'"))?;

    Ok(&response[start..=end])
}
