//! Decoding of the TOC JSON returned by an external LLM analyzer.
//!
//! Accepted shapes: `{"sections": [...]}` (also `toc`/`entries`) or a bare
//! array, optionally wrapped in a Markdown code fence. Elements that fail to
//! decode are skipped; validation of the survivors happens in the builder.

use regex::Regex;
use section_model::TocEntry;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?\s*```$").expect("valid code fence regex"));

#[derive(Debug, Error)]
pub enum TocParseError {
    #[error("toc response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toc response has no section list")]
    MissingSections,
}

/// Body of a fenced block, or the trimmed input when there is no fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => trimmed.trim_matches('`').trim(),
    }
}

/// Narrow a chatty response to the outermost JSON object or array.
fn json_slice(body: &str) -> &str {
    let start = body.find(['{', '[']);
    let end = body.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => &body[s..=e],
        _ => body,
    }
}

pub fn parse_toc_response(raw: &str) -> Result<Vec<TocEntry>, TocParseError> {
    let body = strip_code_fence(raw);
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => serde_json::from_str(json_slice(body))?,
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let list = ["sections", "toc", "entries"].iter().find_map(|k| map.remove(*k));
            match list {
                Some(Value::Array(items)) => items,
                _ => return Err(TocParseError::MissingSections),
            }
        }
        _ => return Err(TocParseError::MissingSections),
    };

    let mut entries = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<TocEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(index = i, error = %e, "skipping undecodable toc element"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use section_model::SemanticType;

    #[test]
    fn fenced_object_with_sections() {
        let raw = "```json\n{\"sections\": [{\"title\": \"1. HARDVER\", \"level\": 1, \"pageStart\": 15, \"pageEnd\": 22, \"semanticType\": \"chapter\"}]}\n```";
        let entries = parse_toc_response(raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "1. HARDVER");
        assert_eq!(entries[0].semantic_type, Some(SemanticType::Chapter));
    }

    #[test]
    fn bare_array_with_snake_case_and_bad_element() {
        let raw = r#"[{"title": "Uvod", "level": 1, "page_start": 3}, {"title": 7}]"#;
        let entries = parse_toc_response(raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].page_start, 3);
    }

    #[test]
    fn prose_around_json_is_ignored() {
        let raw = "Evo sadržaja:\n{\"sections\": [{\"title\": \"Mreže\", \"level\": 2, \"pageStart\": 9}]}\nNadam se da pomaže.";
        assert_eq!(parse_toc_response(raw).unwrap()[0].title, "Mreže");
    }

    #[test]
    fn object_without_list_is_an_error() {
        assert!(matches!(parse_toc_response(r#"{"title": "x"}"#), Err(TocParseError::MissingSections)));
        assert!(matches!(parse_toc_response("nije json"), Err(TocParseError::Json(_))));
    }
}
