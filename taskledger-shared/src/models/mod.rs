/// Database models for TaskLedger
///
/// Row types and their queries. Anything that changes a credit balance lives
/// in [`crate::credits`], not here.
///
/// # Models
///
/// - `account`: login identity and credit balance holder
/// - `transaction`: append-only credit ledger
/// - `task`: tasks with soft delete
/// - `payment_event`: settled payment provider events
///
/// # Example
///
/// ```no_run
/// use taskledger_shared::models::task::{Task, TaskScope};
/// use taskledger_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(owner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let tasks = Task::list(&pool, TaskScope::Owner(owner)).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod payment_event;
pub mod task;
pub mod transaction;
