/// Credit ledger records
///
/// Every balance change produces exactly one row here. Rows are immutable:
/// the table carries a trigger that rejects `UPDATE` and `DELETE`, and this
/// module exposes no way to modify or remove a record.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE credit_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL REFERENCES accounts(id),
///     amount INTEGER NOT NULL CHECK (amount <> 0),
///     kind TEXT NOT NULL,          -- purchase | usage | admin_adjustment | bonus
///     description TEXT NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;
use uuid::Uuid;

/// Why the balance changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits bought through the payment provider
    Purchase,

    /// Credits spent creating a task
    Usage,

    /// Manual grant by an administrator
    AdminAdjustment,

    /// Sign-up bonus
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Usage => "usage",
            TransactionKind::AdminAdjustment => "admin_adjustment",
            TransactionKind::Bonus => "bonus",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditTransaction {
    pub id: Uuid,

    pub account_id: Uuid,

    /// Signed amount: positive credits the account, negative debits it
    pub amount: i32,

    pub kind: TransactionKind,

    pub description: String,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a ledger entry
#[derive(Debug, Clone)]
pub struct NewCreditTransaction {
    pub account_id: Uuid,
    pub amount: i32,
    pub kind: TransactionKind,
    pub description: String,
}

impl CreditTransaction {
    /// Appends a record on the caller's connection
    ///
    /// Only the credit engine calls this, inside the transaction that also
    /// updates the balance.
    pub(crate) async fn append(
        conn: &mut PgConnection,
        data: NewCreditTransaction,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (account_id, amount, kind, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, amount, kind, description, created_at
            "#,
        )
        .bind(data.account_id)
        .bind(data.amount)
        .bind(data.kind)
        .bind(data.description)
        .fetch_one(conn)
        .await
    }

    /// Lists every record across all accounts, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, account_id, amount, kind, description, created_at
            FROM credit_transactions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Lists one account's records, newest first
    pub async fn list_by_account(pool: &PgPool, account_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, account_id, amount, kind, description, created_at
            FROM credit_transactions
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(pool)
        .await
    }

    /// Sum and count of an account's records
    pub async fn totals_for_account(
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT, COUNT(*)
            FROM credit_transactions
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(TransactionKind::AdminAdjustment.as_str(), "admin_adjustment");
        assert_eq!(TransactionKind::Usage.to_string(), "usage");

        let json = serde_json::to_string(&TransactionKind::AdminAdjustment).unwrap();
        assert_eq!(json, "\"admin_adjustment\"");

        let kind: TransactionKind = serde_json::from_str("\"bonus\"").unwrap();
        assert_eq!(kind, TransactionKind::Bonus);
    }
}
