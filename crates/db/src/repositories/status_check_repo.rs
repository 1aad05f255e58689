//! Repository for the `status_checks` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status_check::{CreateStatusCheck, StatusCheck};

/// Column list for `status_checks` queries.
const COLUMNS: &str = "id, client_name, created_at";

/// Upper bound on rows returned by [`StatusCheckRepo::list`].
pub const LIST_LIMIT: i64 = 1000;

/// Provides data access for status checks.
pub struct StatusCheckRepo;

impl StatusCheckRepo {
    /// Insert a status check with a fresh id and the current timestamp.
    pub async fn create(
        pool: &PgPool,
        dto: &CreateStatusCheck,
    ) -> Result<StatusCheck, sqlx::Error> {
        let query = format!(
            "INSERT INTO status_checks (id, client_name) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StatusCheck>(&query)
            .bind(Uuid::new_v4())
            .bind(dto.client_name.trim())
            .fetch_one(pool)
            .await
    }

    /// List status checks, oldest first, capped at [`LIST_LIMIT`] rows.
    pub async fn list(pool: &PgPool) -> Result<Vec<StatusCheck>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_checks \
             ORDER BY created_at ASC, id ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, StatusCheck>(&query)
            .bind(LIST_LIMIT)
            .fetch_all(pool)
            .await
    }
}
