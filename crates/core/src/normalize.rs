//! Coerce a chat-completion reply into an [`AnnotationResult`].
//!
//! The gateway is asked for a strict JSON object, but models wrap it in
//! code fences, return numbers as strings, or invent categories. This
//! module repairs what can be repaired and rejects the rest with
//! [`MalformedResponse`], which the caller treats like any other failed
//! attempt.

use serde_json::Value;

use crate::annotation::{
    truncate_chars, AnnotationRequest, AnnotationResult, MAX_CATEGORIES, MAX_SUMMARY_CHARS,
    MAX_TAGS,
};
use crate::types::Metadata;

/// Value of `metadata.source` on results produced from a gateway reply.
pub const GATEWAY_SOURCE: &str = "emergent-llm";

/// Reasons a gateway reply could not be turned into an annotation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedResponse {
    /// Neither `choices[0].message.content` nor `output` held any text.
    #[error("No content returned from LLM service")]
    EmptyContent,

    /// The content was not valid JSON, even after stripping code fences.
    #[error("Content is not valid JSON: {0}")]
    InvalidJson(String),

    /// The content parsed, but not to a JSON object.
    #[error("Content is not a JSON object")]
    NotAnObject,

    /// A field had a type that cannot be coerced.
    #[error("Field '{field}' has an unusable value: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Extract the assistant message text from a chat-completion envelope.
///
/// Uses `choices[0].message.content`, or the top-level `output` field when
/// `choices` is absent or empty. Blank content is an error.
pub fn extract_content(envelope: &Value) -> Result<&str, MalformedResponse> {
    let choice_content = envelope
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());

    let content = match choice_content {
        Some(choice) => choice.pointer("/message/content").and_then(Value::as_str),
        None => envelope.get("output").and_then(Value::as_str),
    };

    match content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(MalformedResponse::EmptyContent),
    }
}

/// Parse `content` as JSON, retrying once with a surrounding code fence removed.
pub fn parse_content(content: &str) -> Result<Value, MalformedResponse> {
    let first_err = match serde_json::from_str::<Value>(content) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let trimmed = content.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            let inner = lines[1..lines.len() - 1].join("\n");
            return serde_json::from_str::<Value>(inner.trim())
                .map_err(|e| MalformedResponse::InvalidJson(e.to_string()));
        }
    }

    Err(MalformedResponse::InvalidJson(first_err.to_string()))
}

/// Build an [`AnnotationResult`] from a full chat-completion envelope.
///
/// `model` is recorded in the result metadata. Processing time is left at
/// zero for the caller to stamp.
pub fn normalize(
    envelope: &Value,
    request: &AnnotationRequest,
    model: &str,
) -> Result<AnnotationResult, MalformedResponse> {
    let content = extract_content(envelope)?;
    let parsed = parse_content(content)?;
    let object = parsed.as_object().ok_or(MalformedResponse::NotAnObject)?;

    let raw_categories = string_list(object.get("categories"), "categories")?;
    let categories = match request.custom_categories() {
        Some(custom) => restrict_to(raw_categories, custom),
        None => raw_categories,
    }
    .into_iter()
    .take(MAX_CATEGORIES)
    .collect();

    let tags = string_list(object.get("tags"), "tags")?
        .into_iter()
        .map(|tag| tag.to_lowercase())
        .take(MAX_TAGS)
        .collect();

    let summary = match object.get("summary") {
        None | Some(Value::Null) => String::new(),
        Some(value) => truncate_chars(&stringify(value), MAX_SUMMARY_CHARS),
    };

    let confidence = if request.include_confidence {
        Some(coerce_confidence(object.get("confidence"))?)
    } else {
        None
    };

    let mut metadata = Metadata::new();
    metadata.insert("source".into(), GATEWAY_SOURCE.into());
    metadata.insert("model".into(), model.into());

    Ok(AnnotationResult {
        categories,
        tags,
        summary,
        confidence,
        processing_time: 0.0,
        metadata,
    })
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Render a JSON scalar as plain text (strings without quotes).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a list of strings. A bare string counts as a one-element list,
/// missing or `null` as empty. Blank entries are dropped.
fn string_list(value: Option<&Value>, field: &'static str) -> Result<Vec<String>, MalformedResponse> {
    let items: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        Some(other) => {
            return Err(MalformedResponse::InvalidField {
                field,
                reason: format!("expected a list, got {other}"),
            })
        }
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// Keep only categories the caller allowed, in the caller's spelling, once each.
fn restrict_to(categories: Vec<String>, allowed: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for category in categories {
        let wanted = category.to_lowercase();
        let matched = allowed
            .iter()
            .find(|candidate| candidate.trim().to_lowercase() == wanted);
        if let Some(canonical) = matched {
            if !kept.contains(canonical) {
                kept.push(canonical.clone());
            }
        }
    }
    kept
}

/// Read the confidence as a float in `[0, 1]`, defaulting to `0.0`.
fn coerce_confidence(value: Option<&Value>) -> Result<f64, MalformedResponse> {
    let raw = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            MalformedResponse::InvalidField {
                field: "confidence",
                reason: format!("'{s}' is not a number"),
            }
        })?,
        Some(other) => {
            return Err(MalformedResponse::InvalidField {
                field: "confidence",
                reason: format!("expected a number, got {other}"),
            })
        }
    };

    if raw.is_nan() {
        return Err(MalformedResponse::InvalidField {
            field: "confidence",
            reason: "NaN".into(),
        });
    }
    Ok(raw.clamp(0.0, 1.0))
}
