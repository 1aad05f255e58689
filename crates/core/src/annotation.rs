//! Annotation request/result types and their limits.
//!
//! [`AnnotationRequest`] is the body of `POST /api/ai/annotate`;
//! [`AnnotationResult`] is what every path of the pipeline (gateway or
//! fallback) hands back to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::Metadata;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of the input text, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Maximum number of categories in a result.
pub const MAX_CATEGORIES: usize = 3;

/// Maximum number of tags in a result.
pub const MAX_TAGS: usize = 8;

/// Maximum summary length produced from a gateway reply, in characters.
pub const MAX_SUMMARY_CHARS: usize = 2000;

/// Maximum length of error text copied into result metadata.
pub const MAX_METADATA_ERROR_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Request body for the annotation endpoint.
///
/// Field names are snake_case on the wire; the camelCase spellings are
/// accepted as aliases.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnnotationRequest {
    /// Free-form text to annotate.
    #[validate(length(min = 1, max = 50000, message = "must be between 1 and 50000 characters"))]
    pub text: String,
    /// Remote model override. Falls back to the configured default.
    #[serde(default)]
    pub model: Option<String>,
    /// Categories the result must be drawn from, in caller order.
    #[serde(default, alias = "customCategories")]
    pub custom_categories: Option<Vec<String>>,
    /// Whether the result should carry a confidence score.
    #[serde(default = "default_include_confidence", alias = "includeConfidence")]
    pub include_confidence: bool,
}

fn default_include_confidence() -> bool {
    true
}

impl AnnotationRequest {
    /// Build a request for `text` with all optional fields at their defaults.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            custom_categories: None,
            include_confidence: true,
        }
    }

    /// Caller-supplied categories, treating an empty list as absent.
    pub fn custom_categories(&self) -> Option<&[String]> {
        self.custom_categories
            .as_deref()
            .filter(|categories| !categories.is_empty())
    }

    /// The confidence value to report, or `None` when not requested.
    pub fn confidence(&self, value: f64) -> Option<f64> {
        self.include_confidence.then_some(value)
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Structured annotation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub summary: String,
    /// `None` (serialized as `null`) unless the request asked for it.
    pub confidence: Option<f64>,
    /// Wall-clock seconds spent producing the result, millisecond precision.
    pub processing_time: f64,
    /// Diagnostics: which path produced the result, model, error text.
    pub metadata: Metadata,
}

impl AnnotationResult {
    /// Stamp the elapsed processing time, rounded to milliseconds.
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = (elapsed.as_secs_f64() * 1000.0).round() / 1000.0;
        self
    }

    /// Insert a metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return at most the first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
