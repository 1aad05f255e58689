//! Prompt and payload construction for the chat-completions call.

use offnotes_core::annotation::AnnotationRequest;
use serde_json::{json, Value};

/// System message sent with every annotation request.
pub const SYSTEM_PROMPT: &str = "Return structured JSON as requested.";

/// Category rule used when the caller supplies no categories.
pub const DEFAULT_CATEGORY_RULE: &str =
    "Choose 1-3 suitable categories (e.g., Business, Private, Health, Travel, Finance)";

/// Sampling temperature for annotation calls.
pub const TEMPERATURE: f64 = 0.2;

/// Completion token cap for annotation calls.
pub const MAX_TOKENS: u32 = 400;

/// The category rule line for `request`.
pub fn category_rule(request: &AnnotationRequest) -> String {
    match request.custom_categories() {
        Some(custom) => format!("Use these categories strictly: {}", custom.join(", ")),
        None => DEFAULT_CATEGORY_RULE.to_string(),
    }
}

/// Build the user message instructing the model to emit strict JSON.
pub fn user_prompt(request: &AnnotationRequest) -> String {
    format!(
        "You are an expert annotation service. Analyze the text and return ONLY valid JSON with:\n\
         {{\n  \"categories\": [\"..\"],\n  \"tags\": [\"..\"],\n  \"summary\": \"..\",\n  \"confidence\": 0.0\n}}\n\
         Rules:\n\
         - {rule}\n\
         - 3-8 tags, lowercase, hyphenated if multi-word\n\
         - 1-2 sentence summary\n\
         - confidence in [0.0, 1.0]\n\
         Text:\n{text}\n",
        rule = category_rule(request),
        text = request.text,
    )
}

/// Build the full chat-completions request body.
pub fn chat_payload(request: &AnnotationRequest, model: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user_prompt(request) },
        ],
        "temperature": TEMPERATURE,
        "response_format": { "type": "json_object" },
        "max_tokens": MAX_TOKENS,
    })
}
