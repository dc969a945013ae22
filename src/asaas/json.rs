//! Path-aware JSON decoding for Asaas responses.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;

/// Width of the excerpt shown around a decode failure.
const EXCERPT_WIDTH: usize = 24;

/// Decode `body` into `T`, reporting the JSON path and a short excerpt on failure.
///
/// Asaas occasionally returns `null` for documented string fields; the path
/// (e.g. `data[3].dueDate`) makes those cases easy to pin down from logs.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let mut de = serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        let (line, column) = (inner.line(), inner.column());
        let reason = describe(&inner.to_string());
        let excerpt = excerpt(body, line, column);

        if path.is_empty() || path == "." {
            anyhow!("{reason} (line {line} col {column})\n{excerpt}")
        } else {
            anyhow!("at '{path}': {reason} (line {line} col {column})\n{excerpt}")
        }
    })
}

/// Rewrite serde's "invalid type: X, expected Y at line.." into "expected Y, got X".
fn describe(message: &str) -> String {
    let message = message
        .split(" at line ")
        .next()
        .unwrap_or(message)
        .trim();

    if let Some(rest) = message.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {expected}, got {actual}");
    }
    message.to_string()
}

fn excerpt(body: &str, line: usize, column: usize) -> String {
    let Some(text) = body.lines().nth(line.saturating_sub(1)) else {
        return "(no source line)".to_string();
    };
    if text.is_empty() {
        return "(empty line)".to_string();
    }

    let mut at = column.saturating_sub(1).min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    let mut start = at.saturating_sub(EXCERPT_WIDTH / 2);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (at + EXCERPT_WIDTH / 2).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }

    let marker = " ".repeat(text[start..at.max(start)].chars().count()) + "^";
    format!("...{}...\n   {marker}", &text[start..end])
}
