/// Task lifecycle manager
///
/// Task CRUD bound to the credit ledger. Creating a task costs
/// [`TASK_CREATION_COST`](crate::credits::TASK_CREATION_COST) credit; the
/// debit and the insert share one transaction, so either both land or
/// neither does. Reads, updates and deletes are free.
///
/// All operations take a [`TaskScope`]: regular callers pass
/// `TaskScope::Owner(account_id)`, administrators pass `TaskScope::All`.
/// A task outside the scope is indistinguishable from a missing one.
///
/// # Example
///
/// ```no_run
/// use taskledger_shared::tasks::{TaskInput, TaskManager};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = TaskManager::new(pool);
/// let task = manager
///     .create_task(owner, TaskInput::titled("Write quarterly report"))
///     .await?;
/// println!("created {}", task.id);
/// # Ok(())
/// # }
/// ```

use crate::credits::{apply_in, Adjustment, LedgerError};
use crate::models::task::{Task, TaskFields, TaskPriority, TaskScope, TaskStatus};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Task manager errors
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Malformed field (bad date, unknown status, empty title)
    #[error("{0}")]
    InvalidInput(String),

    /// The owner cannot pay for a new task
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// Absent, deleted, or outside the caller's scope
    #[error("Task not found")]
    NotFound,

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for TaskError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredits { .. } => TaskError::InsufficientCredits,
            LedgerError::Database(e) => TaskError::Database(e),
            other => TaskError::Ledger(other),
        }
    }
}

/// Unvalidated task fields as received from a client
///
/// Optional fields fall back to their defaults: empty description and
/// assignee, `pending` status, `medium` priority, no due date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assignee: Option<String>,
}

impl TaskInput {
    /// Input with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Validates and normalizes the input
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty title, an unknown status or priority,
    /// or a due date that is neither `YYYY-MM-DD` nor RFC 3339.
    pub fn into_fields(self) -> Result<TaskFields, TaskError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(TaskError::InvalidInput("Title is required".to_string()));
        }

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => TaskStatus::default(),
            Some(value) => TaskStatus::parse(value)
                .ok_or_else(|| TaskError::InvalidInput(format!("Invalid status: {}", value)))?,
        };

        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => TaskPriority::default(),
            Some(value) => TaskPriority::parse(value)
                .ok_or_else(|| TaskError::InvalidInput(format!("Invalid priority: {}", value)))?,
        };

        let due_date = parse_due_date(self.due_date.as_deref().unwrap_or(""))?;

        Ok(TaskFields {
            title,
            description: self.description.unwrap_or_default(),
            status,
            priority,
            due_date,
            assignee: self.assignee.unwrap_or_default(),
        })
    }
}

/// Parses a due date
///
/// Accepts a calendar date (`2024-06-30`, read as midnight UTC) or an
/// RFC 3339 timestamp (`2024-06-30T17:00:00+02:00`). Empty input means no
/// due date.
pub fn parse_due_date(input: &str) -> Result<Option<DateTime<Utc>>, TaskError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&midnight)));
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }

    Err(TaskError::InvalidInput(
        "Invalid date format. Expected YYYY-MM-DD or RFC3339".to_string(),
    ))
}

/// Task CRUD with credit metering
#[derive(Debug, Clone)]
pub struct TaskManager {
    db: PgPool,
}

impl TaskManager {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates a task, charging its owner one credit
    ///
    /// Input is validated before any database work. The debit runs first
    /// under the account row lock; if it fails no task is written, and if
    /// the insert fails the debit is rolled back with it.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for malformed fields
    /// - `InsufficientCredits` if the balance is zero
    /// - `Database` if the insert fails
    pub async fn create_task(&self, owner_id: Uuid, input: TaskInput) -> Result<Task, TaskError> {
        let fields = input.into_fields()?;

        let mut tx = self.db.begin().await?;

        let debit = apply_in(&mut tx, Adjustment::task_usage(owner_id, &fields.title)).await?;
        let task = Task::insert(&mut tx, owner_id, fields).await?;

        tx.commit().await?;

        info!(
            task_id = %task.id,
            owner_id = %owner_id,
            remaining_credits = debit.new_balance,
            "Task created"
        );

        Ok(task)
    }

    pub async fn get_task(&self, scope: TaskScope, id: Uuid) -> Result<Task, TaskError> {
        Task::find(&self.db, scope, id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    pub async fn list_tasks(&self, scope: TaskScope) -> Result<Vec<Task>, TaskError> {
        Ok(Task::list(&self.db, scope).await?)
    }

    /// Overwrites all mutable fields of a task
    ///
    /// Omitted optional fields are reset to their defaults, not preserved.
    /// Validation failures leave the stored task untouched.
    pub async fn update_task(
        &self,
        scope: TaskScope,
        id: Uuid,
        input: TaskInput,
    ) -> Result<Task, TaskError> {
        let fields = input.into_fields()?;

        let task = Task::overwrite(&self.db, scope, id, fields)
            .await?
            .ok_or(TaskError::NotFound)?;

        info!(task_id = %task.id, "Task updated");
        Ok(task)
    }

    /// Soft-deletes a task
    pub async fn delete_task(&self, scope: TaskScope, id: Uuid) -> Result<(), TaskError> {
        if !Task::soft_delete(&self.db, scope, id).await? {
            return Err(TaskError::NotFound);
        }

        info!(task_id = %id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_calendar_date() {
        let date = parse_due_date("2024-06-30").unwrap().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 6, 30));
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_parse_rfc3339() {
        let date = parse_due_date("2024-06-30T17:00:00+02:00").unwrap().unwrap();
        assert_eq!(date.hour(), 15);
    }

    #[test]
    fn test_parse_empty_means_none() {
        assert!(parse_due_date("").unwrap().is_none());
        assert!(parse_due_date("   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_invalid_month() {
        match parse_due_date("2024-13-01") {
            Err(TaskError::InvalidInput(msg)) => assert!(msg.contains("YYYY-MM-DD")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_due_date("next tuesday"),
            Err(TaskError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_into_fields_defaults() {
        let fields = TaskInput::titled("  Ship it  ").into_fields().unwrap();
        assert_eq!(fields.title, "Ship it");
        assert_eq!(fields.status, TaskStatus::Pending);
        assert_eq!(fields.priority, TaskPriority::Medium);
        assert_eq!(fields.description, "");
        assert_eq!(fields.assignee, "");
        assert!(fields.due_date.is_none());
    }

    #[test]
    fn test_into_fields_explicit_values() {
        let input = TaskInput {
            title: "Review".to_string(),
            description: Some("Quarterly numbers".to_string()),
            status: Some("in-progress".to_string()),
            priority: Some("high".to_string()),
            due_date: Some("2025-01-15".to_string()),
            assignee: Some("Finance".to_string()),
        };

        let fields = input.into_fields().unwrap();
        assert_eq!(fields.status, TaskStatus::InProgress);
        assert_eq!(fields.priority, TaskPriority::High);
        assert_eq!(fields.assignee, "Finance");
        assert!(fields.due_date.is_some());
    }

    #[test]
    fn test_into_fields_rejects_empty_title() {
        assert!(matches!(
            TaskInput::titled("   ").into_fields(),
            Err(TaskError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_into_fields_rejects_unknown_status() {
        let input = TaskInput {
            status: Some("done".to_string()),
            ..TaskInput::titled("x")
        };
        assert!(matches!(input.into_fields(), Err(TaskError::InvalidInput(_))));
    }

    #[test]
    fn test_insufficient_credits_maps_to_task_error() {
        let err: TaskError = LedgerError::InsufficientCredits {
            balance: 0,
            amount: -1,
        }
        .into();
        assert!(matches!(err, TaskError::InsufficientCredits));
    }
}
