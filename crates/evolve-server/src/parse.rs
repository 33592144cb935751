//! Extracting the file payload from model output.
//!
//! Models are asked for a bare JSON object of the form
//! `{"files": {"<name>": "<full content>"}}` but routinely wrap it in a
//! fenced code block. Parsing tries the raw text first, then the first
//! fenced block, then gives up with an excerpt of what came back.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of characters of raw output quoted in an error.
pub const EXCERPT_CHARS: usize = 200;

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"```(?i:json)?\s*([\s\S]*?)\s*```")
            .expect("fence pattern is a valid regex")
    })
}

/// Why a model response could not be turned into files.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Neither the raw text nor a fenced block is valid JSON.
    #[error("Failed to parse AI response: {message}. Got: {excerpt}")]
    InvalidJson { message: String, excerpt: String },

    /// Valid JSON without a `files` object.
    #[error("AI response missing \"files\" object. Got: {excerpt}")]
    MissingFiles { excerpt: String },
}

/// Files proposed by the model, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesPayload {
    pub files: BTreeMap<String, String>,
}

/// Parse a model response into a file payload.
pub fn parse_files_payload(raw: &str) -> Result<FilesPayload, ParseError> {
    let value = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value,
        Err(direct) => match fenced_block(raw) {
            Some(inner) => {
                debug!("Parsing fenced block from model response");
                serde_json::from_str::<Value>(inner).map_err(|e| ParseError::InvalidJson {
                    message: e.to_string(),
                    excerpt: excerpt(raw),
                })?
            }
            None => {
                return Err(ParseError::InvalidJson {
                    message: direct.to_string(),
                    excerpt: excerpt(raw),
                })
            }
        },
    };

    let Some(entries) = value.get("files").and_then(Value::as_object) else {
        return Err(ParseError::MissingFiles {
            excerpt: excerpt(&value.to_string()),
        });
    };

    let mut files = BTreeMap::new();
    for (name, content) in entries {
        match content {
            Value::String(text) => {
                files.insert(name.clone(), text.clone());
            }
            other => warn!(file = %name, kind = %kind(other), "Skipping non-text file content"),
        }
    }

    Ok(FilesPayload { files })
}

/// Contents of the first fenced code block, if any.
fn fenced_block(raw: &str) -> Option<&str> {
    fence_regex()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// At most [`EXCERPT_CHARS`] characters of `text`.
fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().nth(EXCERPT_CHARS).is_some() {
        out.push_str("...");
    }
    out
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(payload: &FilesPayload) -> Vec<&str> {
        payload.files.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_bare_json() {
        let payload =
            parse_files_payload(r#"{"files": {"live.html": "<h1>Hi</h1>"}}"#).unwrap();
        assert_eq!(payload.files["live.html"], "<h1>Hi</h1>");
    }

    #[test]
    fn test_surrounding_whitespace() {
        let payload = parse_files_payload("\n\n  {\"files\": {\"main.js\": \"\"}}  \n").unwrap();
        assert_eq!(names(&payload), vec!["main.js"]);
    }

    #[test]
    fn test_json_fence() {
        let raw = "```json\n{\"files\": {\"styles.css\": \"body { margin: 0; }\"}}\n```";
        let payload = parse_files_payload(raw).unwrap();
        assert_eq!(payload.files["styles.css"], "body { margin: 0; }");
    }

    #[test]
    fn test_plain_fence_with_prose() {
        let raw = "Sure! Here are the updated files:\n```\n{\"files\": {\"live.html\": \"x\"}}\n```\nLet me know.";
        let payload = parse_files_payload(raw).unwrap();
        assert_eq!(names(&payload), vec!["live.html"]);
    }

    #[test]
    fn test_uppercase_fence_tag() {
        let raw = "```JSON\n{\"files\": {\"main.js\": \"1\"}}\n```";
        assert!(parse_files_payload(raw).is_ok());
    }

    #[test]
    fn test_only_first_fence_is_used() {
        let raw = "```json\n{\"files\": {\"a.html\": \"1\"}}\n```\n```json\n{\"files\": {\"b.html\": \"2\"}}\n```";
        let payload = parse_files_payload(raw).unwrap();
        assert_eq!(names(&payload), vec!["a.html"]);
    }

    #[test]
    fn test_content_containing_backticks_in_bare_json() {
        let raw = r#"{"files": {"main.js": "const s = `tpl`;"}}"#;
        let payload = parse_files_payload(raw).unwrap();
        assert_eq!(payload.files["main.js"], "const s = `tpl`;");
    }

    #[test]
    fn test_prose_only_is_invalid_json() {
        let err = parse_files_payload("I cannot help with that.").unwrap_err();
        match err {
            ParseError::InvalidJson { excerpt, .. } => {
                assert_eq!(excerpt, "I cannot help with that.")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_broken_json_inside_fence() {
        let err = parse_files_payload("```json\n{\"files\": {\"a\": }\n```").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson { .. }));
    }

    #[test]
    fn test_unterminated_fence() {
        let err = parse_files_payload("```json\n{\"files\": {}}").unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson { .. }));
    }

    #[test]
    fn test_missing_files_key() {
        let err = parse_files_payload(r#"{"changes": {"live.html": "x"}}"#).unwrap_err();
        match err {
            ParseError::MissingFiles { excerpt } => assert!(excerpt.contains("changes")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(err_is_missing(r#"{"files": ["live.html"]}"#));
        assert!(err_is_missing(r#"{"files": "live.html"}"#));
        assert!(err_is_missing(r#"["files"]"#));
    }

    fn err_is_missing(raw: &str) -> bool {
        matches!(parse_files_payload(raw), Err(ParseError::MissingFiles { .. }))
    }

    #[test]
    fn test_non_string_contents_skipped() {
        let raw = r#"{"files": {"live.html": "ok", "main.js": 42, "styles.css": null}}"#;
        let payload = parse_files_payload(raw).unwrap();
        assert_eq!(names(&payload), vec!["live.html"]);
    }

    #[test]
    fn test_empty_files_object() {
        let payload = parse_files_payload(r#"{"files": {}}"#).unwrap();
        assert!(payload.files.is_empty());
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let raw = "x".repeat(500);
        let err = parse_files_payload(&raw).unwrap_err();
        let ParseError::InvalidJson { excerpt, .. } = err else {
            panic!("expected invalid json");
        };
        assert_eq!(excerpt.len(), EXCERPT_CHARS + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let raw = "é".repeat(300);
        let err = parse_files_payload(&raw).unwrap_err();
        let ParseError::InvalidJson { excerpt, .. } = err else {
            panic!("expected invalid json");
        };
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
    }
}
