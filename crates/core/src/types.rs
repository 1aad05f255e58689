/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// JSON object used for free-form diagnostic metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
