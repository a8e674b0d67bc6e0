/// Account model and database operations
///
/// An account is both the login identity and the owner of a credit balance.
/// The `credits` column is written only by [`crate::credits::CreditEngine`];
/// nothing in this module touches it except the initial zero on insert.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,           -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     role TEXT NOT NULL DEFAULT 'user',
///     verified BOOLEAN NOT NULL DEFAULT FALSE,
///     subscription_plan TEXT NOT NULL DEFAULT 'free',
///     subscription_status TEXT NOT NULL DEFAULT 'active',
///     stripe_customer_id TEXT,
///     subscription_expires_at TIMESTAMPTZ,
///     credits INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskledger_shared::models::account::Account;
/// use taskledger_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// if let Some(account) = Account::find_by_email(&pool, "user@example.com").await? {
///     println!("{} has {} credits", account.email, account.credits);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Regular account, scoped to its own tasks
    User,

    /// Administrator, sees every account and task
    Admin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Admin => "admin",
        }
    }

    /// Parses a role name as sent by admin clients
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(AccountRole::User),
            "admin" => Some(AccountRole::Admin),
            _ => None,
        }
    }
}

/// Account row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,

    pub name: String,

    /// Unique, compared case-insensitively
    pub email: String,

    /// Argon2id hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: AccountRole,

    pub verified: bool,

    /// Plan name (`free`, `pro`, `enterprise`, ...)
    pub subscription_plan: String,

    /// Subscription status (`active`, `inactive`, `cancelled`, ...)
    pub subscription_status: String,

    pub stripe_customer_id: Option<String>,

    pub subscription_expires_at: Option<DateTime<Utc>>,

    /// Current credit balance
    pub credits: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}

/// Input for creating an account
///
/// The balance is not part of the input: new accounts start at zero and
/// receive their sign-up bonus through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub name: String,

    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub role: AccountRole,

    pub verified: bool,

    pub subscription_plan: String,
}

impl CreateAccount {
    /// Regular unverified account on the free plan
    pub fn user(name: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: AccountRole::User,
            verified: false,
            subscription_plan: "free".to_string(),
        }
    }
}

/// Administrative update of account metadata
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccountStatus {
    pub verified: Option<bool>,
    pub role: Option<AccountRole>,
    pub subscription_status: Option<String>,
    pub subscription_plan: Option<String>,
}

impl UpdateAccountStatus {
    pub fn is_empty(&self) -> bool {
        self.verified.is_none()
            && self.role.is_none()
            && self.subscription_status.is_none()
            && self.subscription_plan.is_none()
    }
}

impl Account {
    /// Inserts an account with a zero balance
    ///
    /// Runs on the caller's connection so registration can grant the
    /// sign-up bonus inside the same transaction.
    ///
    /// # Errors
    ///
    /// Returns a database error on duplicate email (`accounts_email_key`).
    pub async fn insert(conn: &mut PgConnection, data: CreateAccount) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (name, email, password_hash, role, verified, subscription_plan, credits)
            VALUES ($1, $2, $3, $4, $5, $6, 0)
            RETURNING id, name, email, password_hash, role, verified, subscription_plan,
                      subscription_status, stripe_customer_id, subscription_expires_at,
                      credits, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .bind(data.verified)
        .bind(data.subscription_plan)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password_hash, role, verified, subscription_plan,
                   subscription_status, stripe_customer_id, subscription_expires_at,
                   credits, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an account by email, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password_hash, role, verified, subscription_plan,
                   subscription_status, stripe_customer_id, subscription_expires_at,
                   credits, created_at, updated_at
            FROM accounts
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Lists every account, oldest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, email, password_hash, role, verified, subscription_plan,
                   subscription_status, stripe_customer_id, subscription_expires_at,
                   credits, created_at, updated_at
            FROM accounts
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Updates the display name and/or password hash
    ///
    /// Returns `None` if the account does not exist.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<String>,
        password_hash: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, verified, subscription_plan,
                      subscription_status, stripe_customer_id, subscription_expires_at,
                      credits, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(pool)
        .await
    }

    /// Applies an administrative status update
    ///
    /// Returns `None` if the account does not exist.
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAccountStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET verified = COALESCE($2, verified),
                role = COALESCE($3, role),
                subscription_status = COALESCE($4, subscription_status),
                subscription_plan = COALESCE($5, subscription_plan),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, verified, subscription_plan,
                      subscription_status, stripe_customer_id, subscription_expires_at,
                      credits, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.verified)
        .bind(data.role.map(|r| r.as_str()))
        .bind(data.subscription_status)
        .bind(data.subscription_plan)
        .fetch_optional(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(pool)
            .await
    }

    pub async fn count_active_subscriptions(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE subscription_status = 'active'")
            .fetch_one(pool)
            .await
    }
}
