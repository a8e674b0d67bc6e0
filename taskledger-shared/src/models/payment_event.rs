/// Processed payment provider events
///
/// The primary key on `event_id` is what makes settlement idempotent: a
/// second delivery of the same event finds the row already present and
/// credits nothing.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE processed_payment_events (
///     event_id TEXT PRIMARY KEY,
///     account_id UUID NOT NULL,
///     credits INTEGER NOT NULL CHECK (credits > 0),
///     processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessedPaymentEvent {
    /// Provider event id (e.g. `evt_...`)
    pub event_id: String,
    pub account_id: Uuid,
    pub credits: i32,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedPaymentEvent {
    /// Claims an event id on the caller's connection
    ///
    /// Returns `false` if the id was already recorded. A concurrent claim of
    /// the same id blocks on the primary key until the other transaction
    /// finishes, so at most one claimant ever sees `true`.
    pub(crate) async fn claim(
        conn: &mut PgConnection,
        event_id: &str,
        account_id: Uuid,
        credits: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_payment_events (event_id, account_id, credits)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(account_id)
        .bind(credits)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
