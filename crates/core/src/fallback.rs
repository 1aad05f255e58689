//! Local, network-free annotation heuristic.
//!
//! Used whenever the gateway path is unavailable: no credential, every
//! attempt failed, or the replies could not be normalized. [`fallback`] is
//! total and deterministic for a given request.

use crate::annotation::{
    truncate_chars, AnnotationRequest, AnnotationResult, MAX_METADATA_ERROR_CHARS,
};
use crate::types::Metadata;

/// Value of `metadata.note` on fallback results.
pub const FALLBACK_NOTE: &str = "fallback-no-external-llm";

/// Number of tags the heuristic extracts.
pub const FALLBACK_MAX_TAGS: usize = 5;

/// Number of caller-supplied categories echoed back.
pub const FALLBACK_MAX_CATEGORIES: usize = 2;

/// Tokens must be longer than this many characters to become tags.
const MIN_TAG_CHARS: usize = 3;

/// Texts longer than this are shortened for the summary.
const SUMMARY_LIMIT_CHARS: usize = 200;

/// Characters kept from a long text before the ellipsis.
const SUMMARY_PREFIX_CHARS: usize = 180;

/// Compute a best-effort annotation from the request alone.
///
/// `last_error` is the rendering of the failure that caused the fallback,
/// if any; it is copied (truncated) into `metadata.error`.
pub fn fallback(request: &AnnotationRequest, last_error: Option<&str>) -> AnnotationResult {
    let text = request.text.trim();

    let categories = request
        .custom_categories()
        .map(|custom| {
            custom
                .iter()
                .take(FALLBACK_MAX_CATEGORIES)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let summary = if text.chars().count() > SUMMARY_LIMIT_CHARS {
        format!("{}...", truncate_chars(text, SUMMARY_PREFIX_CHARS))
    } else {
        text.to_string()
    };

    let mut metadata = Metadata::new();
    metadata.insert("note".into(), FALLBACK_NOTE.into());
    if let Some(err) = last_error {
        metadata.insert(
            "error".into(),
            truncate_chars(err, MAX_METADATA_ERROR_CHARS).into(),
        );
    }

    AnnotationResult {
        categories,
        tags: extract_tags(text),
        summary,
        confidence: request.confidence(0.0),
        processing_time: 0.0,
        metadata,
    }
}

/// Distinct lower-cased words longer than [`MIN_TAG_CHARS`], first-seen order.
fn extract_tags(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut tags: Vec<String> = Vec::with_capacity(FALLBACK_MAX_TAGS);
    for word in cleaned.to_lowercase().split_whitespace() {
        if tags.len() == FALLBACK_MAX_TAGS {
            break;
        }
        if word.chars().count() > MIN_TAG_CHARS && !tags.iter().any(|t| t == word) {
            tags.push(word.to_string());
        }
    }
    tags
}
