/// Task model and database operations
///
/// Tasks belong to exactly one account. Deletion is soft: `deleted_at` is set
/// and every read in this module filters on `deleted_at IS NULL`.
///
/// Inserting a task is not exposed on the pool. Creation goes through
/// [`crate::tasks::TaskManager::create_task`], which charges a credit in the
/// same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES accounts(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status TEXT NOT NULL DEFAULT 'pending',     -- pending | in-progress | completed
///     priority TEXT NOT NULL DEFAULT 'medium',    -- low | medium | high
///     due_date TIMESTAMPTZ,
///     assignee TEXT NOT NULL DEFAULT '',
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Task progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in-progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning account
    pub owner_id: Uuid,

    pub title: String,

    pub description: String,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    /// Free-text assignee
    pub assignee: String,

    /// Soft-delete marker; always `None` for rows returned by reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Validated mutable fields of a task
///
/// Used for both creation and full-overwrite updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee: String,
}

/// Which tasks a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Only tasks owned by this account
    Owner(Uuid),

    /// Every task (administrators)
    All,
}

impl TaskScope {
    fn owner(&self) -> Option<Uuid> {
        match self {
            TaskScope::Owner(id) => Some(*id),
            TaskScope::All => None,
        }
    }
}

impl Task {
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        owner_id: Uuid,
        fields: TaskFields,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (owner_id, title, description, status, priority, due_date, assignee)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, title, description, status, priority, due_date,
                      assignee, deleted_at, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.status)
        .bind(fields.priority)
        .bind(fields.due_date)
        .bind(fields.assignee)
        .fetch_one(conn)
        .await
    }

    /// Finds a live task within the given scope
    pub async fn find(pool: &PgPool, scope: TaskScope, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, priority, due_date,
                   assignee, deleted_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR owner_id = $2)
            "#,
        )
        .bind(id)
        .bind(scope.owner())
        .fetch_optional(pool)
        .await
    }

    /// Lists live tasks within the given scope, newest first
    pub async fn list(pool: &PgPool, scope: TaskScope) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, owner_id, title, description, status, priority, due_date,
                   assignee, deleted_at, created_at, updated_at
            FROM tasks
            WHERE deleted_at IS NULL
              AND ($1::UUID IS NULL OR owner_id = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(scope.owner())
        .fetch_all(pool)
        .await
    }

    /// Overwrites every mutable field of a live task
    ///
    /// Returns `None` if the task is absent, deleted, or outside the scope.
    pub async fn overwrite(
        pool: &PgPool,
        scope: TaskScope,
        id: Uuid,
        fields: TaskFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $3,
                description = $4,
                status = $5,
                priority = $6,
                due_date = $7,
                assignee = $8,
                updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR owner_id = $2)
            RETURNING id, owner_id, title, description, status, priority, due_date,
                      assignee, deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(scope.owner())
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.status)
        .bind(fields.priority)
        .bind(fields.due_date)
        .bind(fields.assignee)
        .fetch_optional(pool)
        .await
    }

    /// Marks a live task as deleted
    ///
    /// Returns `false` if nothing matched.
    pub async fn soft_delete(pool: &PgPool, scope: TaskScope, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR owner_id = $2)
            "#,
        )
        .bind(id)
        .bind(scope.owner())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts live tasks across all accounts
    pub async fn count_live(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE deleted_at IS NULL")
            .fetch_one(pool)
            .await
    }
}
