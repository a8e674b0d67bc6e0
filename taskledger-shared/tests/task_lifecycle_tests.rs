/// Task manager integration tests
///
/// Require PostgreSQL in `DATABASE_URL`; skipped otherwise.

mod common;

use common::{
    balance_of, open_account, record_count, record_count_of_kind, task_row_count, test_pool,
};
use taskledger_shared::credits::{Adjustment, CreditEngine};
use taskledger_shared::models::task::{TaskPriority, TaskScope, TaskStatus};
use taskledger_shared::models::transaction::{CreditTransaction, TransactionKind};
use taskledger_shared::tasks::{TaskError, TaskInput, TaskManager};

#[tokio::test]
async fn test_five_credits_buy_five_tasks() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;

    for i in 0..5 {
        manager
            .create_task(account.id, TaskInput::titled(format!("Task {}", i)))
            .await
            .expect("paid task should be created");
    }

    let sixth = manager
        .create_task(account.id, TaskInput::titled("One too many"))
        .await;
    assert!(matches!(sixth, Err(TaskError::InsufficientCredits)));

    assert_eq!(balance_of(&pool, account.id).await, 0);
    assert_eq!(
        record_count_of_kind(&pool, account.id, TransactionKind::Usage).await,
        5
    );
    assert_eq!(
        manager.list_tasks(TaskScope::Owner(account.id)).await.unwrap().len(),
        5
    );
}

#[tokio::test]
async fn test_created_task_has_defaults_and_usage_record() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;

    let task = manager
        .create_task(account.id, TaskInput::titled("Plan sprint"))
        .await
        .unwrap();

    assert_eq!(task.owner_id, account.id);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert!(task.due_date.is_none());

    let records = CreditTransaction::list_by_account(&pool, account.id).await.unwrap();
    let usage = records
        .iter()
        .find(|r| r.kind == TransactionKind::Usage)
        .expect("usage record");
    assert_eq!(usage.amount, -1);
    assert_eq!(usage.description, "Created task: Plan sprint");
}

#[tokio::test]
async fn test_failed_insert_rolls_back_debit() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;

    // Longer than the title column allows, so the insert fails after the debit
    let result = manager
        .create_task(account.id, TaskInput::titled("x".repeat(300)))
        .await;
    assert!(matches!(result, Err(TaskError::Database(_))));

    assert_eq!(balance_of(&pool, account.id).await, 5);
    assert_eq!(record_count(&pool, account.id).await, 1);
    assert_eq!(task_row_count(&pool, account.id).await, 0);
}

#[tokio::test]
async fn test_invalid_input_costs_nothing() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;

    let input = TaskInput {
        due_date: Some("31/12/2024".to_string()),
        ..TaskInput::titled("Bad date")
    };
    assert!(matches!(
        manager.create_task(account.id, input).await,
        Err(TaskError::InvalidInput(_))
    ));

    assert_eq!(balance_of(&pool, account.id).await, 5);
    assert_eq!(record_count(&pool, account.id).await, 1);
}

#[tokio::test]
async fn test_soft_deleted_task_disappears_for_everyone() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;

    let task = manager
        .create_task(account.id, TaskInput::titled("Temporary"))
        .await
        .unwrap();

    manager
        .delete_task(TaskScope::Owner(account.id), task.id)
        .await
        .unwrap();

    for scope in [TaskScope::Owner(account.id), TaskScope::All] {
        assert!(matches!(
            manager.get_task(scope, task.id).await,
            Err(TaskError::NotFound)
        ));
        assert!(manager
            .list_tasks(scope)
            .await
            .unwrap()
            .iter()
            .all(|t| t.id != task.id));
    }

    assert!(matches!(
        manager.delete_task(TaskScope::All, task.id).await,
        Err(TaskError::NotFound)
    ));
    assert!(matches!(
        manager
            .update_task(TaskScope::All, task.id, TaskInput::titled("Revived"))
            .await,
        Err(TaskError::NotFound)
    ));

    // The row is still there, only hidden
    assert_eq!(task_row_count(&pool, account.id).await, 1);
}

#[tokio::test]
async fn test_scope_isolates_owners() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let alice = open_account(&pool).await;
    let bob = open_account(&pool).await;

    let task = manager
        .create_task(alice.id, TaskInput::titled("Alice's task"))
        .await
        .unwrap();

    let bob_scope = TaskScope::Owner(bob.id);
    assert!(matches!(manager.get_task(bob_scope, task.id).await, Err(TaskError::NotFound)));
    assert!(matches!(
        manager.update_task(bob_scope, task.id, TaskInput::titled("Mine now")).await,
        Err(TaskError::NotFound)
    ));
    assert!(matches!(manager.delete_task(bob_scope, task.id).await, Err(TaskError::NotFound)));
    assert!(manager.list_tasks(bob_scope).await.unwrap().is_empty());

    let admin_view = manager.get_task(TaskScope::All, task.id).await.unwrap();
    assert_eq!(admin_view.title, "Alice's task");
}

#[tokio::test]
async fn test_update_overwrites_all_fields() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;
    let scope = TaskScope::Owner(account.id);

    let task = manager
        .create_task(
            account.id,
            TaskInput {
                description: Some("first draft".to_string()),
                priority: Some("high".to_string()),
                due_date: Some("2025-03-01".to_string()),
                assignee: Some("Ops".to_string()),
                ..TaskInput::titled("Draft")
            },
        )
        .await
        .unwrap();

    let updated = manager
        .update_task(
            scope,
            task.id,
            TaskInput {
                status: Some("completed".to_string()),
                ..TaskInput::titled("Final")
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Final");
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.priority, TaskPriority::Medium);
    assert_eq!(updated.description, "");
    assert_eq!(updated.assignee, "");
    assert!(updated.due_date.is_none());

    // Updates are free
    assert_eq!(balance_of(&pool, account.id).await, 4);
}

#[tokio::test]
async fn test_invalid_due_date_leaves_task_unchanged() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let account = open_account(&pool).await;
    let scope = TaskScope::Owner(account.id);

    let task = manager
        .create_task(account.id, TaskInput::titled("Keep me"))
        .await
        .unwrap();

    let result = manager
        .update_task(
            scope,
            task.id,
            TaskInput {
                due_date: Some("2024-13-01".to_string()),
                ..TaskInput::titled("Changed")
            },
        )
        .await;
    assert!(matches!(result, Err(TaskError::InvalidInput(_))));

    let stored = manager.get_task(scope, task.id).await.unwrap();
    assert_eq!(stored.title, "Keep me");
    assert_eq!(stored.updated_at, task.updated_at);
}

#[tokio::test]
async fn test_purchased_credits_unlock_more_tasks() {
    let Some(pool) = test_pool().await else { return };
    let manager = TaskManager::new(pool.clone());
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    for i in 0..5 {
        manager
            .create_task(account.id, TaskInput::titled(format!("T{}", i)))
            .await
            .unwrap();
    }

    engine
        .apply_adjustment(Adjustment::purchase(account.id, 2))
        .await
        .unwrap();

    manager
        .create_task(account.id, TaskInput::titled("Paid with purchase"))
        .await
        .unwrap();
    assert_eq!(balance_of(&pool, account.id).await, 1);
    assert!(engine.reconcile(account.id).await.unwrap().consistent);
}
