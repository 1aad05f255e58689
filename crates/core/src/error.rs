use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: invalid value ({})", e.code),
                })
            })
            .collect();
        messages.sort();
        CoreError::Validation(messages.join("; "))
    }
}
