//! Status-check models and DTOs.
//!
//! A status check records that a named client pinged the backend.

use offnotes_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `status_checks` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusCheck {
    pub id: Uuid,
    pub client_name: String,
    #[sqlx(rename = "created_at")]
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for recording a new status check.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStatusCheck {
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub client_name: String,
}
