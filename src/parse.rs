//! Extraction of JSON objects from free-form model replies.

use serde_json::Value;

use crate::Error;

/// Parse JSON out of a model reply, tolerating a surrounding code fence.
///
/// The text is tried as-is first. If that fails, the content of the first
/// fenced block (opened by "```json" or a bare "```" and closed by "```")
/// is tried instead.
pub fn parse_ai_response(text: &str) -> Result<Value, Error> {
    let text = text.trim();
    let first_error = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(fenced) = fenced_block(text) else {
        return Err(Error::MalformedResponse(first_error));
    };

    serde_json::from_str(fenced.trim()).map_err(Error::MalformedResponse)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = match text.find("```json") {
        Some(pos) => pos + "```json".len(),
        None => text.find("```")? + "```".len(),
    };
    let rest = &text[start..];
    rest.find("```").map(|end| &rest[..end])
}
