/// Credit engine integration tests
///
/// Require PostgreSQL in `DATABASE_URL`; skipped otherwise.

mod common;

use common::{balance_of, open_account, record_count, record_count_of_kind, test_pool};
use futures::future::join_all;
use taskledger_shared::credits::{Adjustment, CreditEngine, LedgerError, SIGNUP_BONUS};
use taskledger_shared::models::account::CreateAccount;
use taskledger_shared::models::transaction::{CreditTransaction, TransactionKind};
use uuid::Uuid;

#[tokio::test]
async fn test_open_account_grants_bonus_atomically() {
    let Some(pool) = test_pool().await else { return };

    let account = open_account(&pool).await;
    assert_eq!(account.credits, SIGNUP_BONUS);
    assert_eq!(balance_of(&pool, account.id).await, SIGNUP_BONUS);

    let records = CreditTransaction::list_by_account(&pool, account.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, SIGNUP_BONUS);
    assert_eq!(records[0].kind, TransactionKind::Bonus);
    assert_eq!(records[0].description, "Initial sign-up credits");
}

#[tokio::test]
async fn test_duplicate_email_leaves_no_orphan() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());

    let email = format!("dup-{}@example.com", Uuid::new_v4());
    engine
        .open_account(CreateAccount::user("First", email.clone(), "hash"))
        .await
        .unwrap();

    let result = engine
        .open_account(CreateAccount::user("Second", email.to_uppercase(), "hash"))
        .await;
    assert!(matches!(result, Err(LedgerError::Database(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE LOWER(email) = LOWER($1)")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_overdraft_rejected_without_side_effects() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    let result = engine
        .apply_adjustment(Adjustment::new(
            account.id,
            -6,
            TransactionKind::Usage,
            "too much",
        ))
        .await;

    match result {
        Err(LedgerError::InsufficientCredits { balance, amount }) => {
            assert_eq!(balance, 5);
            assert_eq!(amount, -6);
        }
        other => panic!("expected InsufficientCredits, got {:?}", other),
    }

    assert_eq!(balance_of(&pool, account.id).await, 5);
    assert_eq!(record_count(&pool, account.id).await, 1);
}

#[tokio::test]
async fn test_admin_grant_appends_one_record() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    let outcome = engine
        .apply_adjustment(Adjustment::admin_grant(account.id, 100))
        .await
        .unwrap();

    assert_eq!(outcome.new_balance, 105);
    assert_eq!(outcome.transaction.kind, TransactionKind::AdminAdjustment);
    assert_eq!(outcome.transaction.amount, 100);
    assert_eq!(balance_of(&pool, account.id).await, 105);

    let admin_records =
        record_count_of_kind(&pool, account.id, TransactionKind::AdminAdjustment).await;
    assert_eq!(admin_records, 1);
}

#[tokio::test]
async fn test_negative_admin_adjustment_respects_floor() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    let result = engine
        .apply_adjustment(Adjustment::admin_grant(account.id, -50))
        .await;

    assert!(matches!(result, Err(LedgerError::InsufficientCredits { .. })));
    assert_eq!(balance_of(&pool, account.id).await, 5);
}

#[tokio::test]
async fn test_unknown_account_and_zero_amount() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());

    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.apply_adjustment(Adjustment::admin_grant(missing, 10)).await,
        Err(LedgerError::AccountNotFound(id)) if id == missing
    ));

    let account = open_account(&pool).await;
    assert!(matches!(
        engine.apply_adjustment(Adjustment::admin_grant(account.id, 0)).await,
        Err(LedgerError::InvalidAmount)
    ));
    assert_eq!(record_count(&pool, account.id).await, 1);
}

#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    let handles = (0..12).map(|i| {
        let engine = engine.clone();
        let account_id = account.id;
        tokio::spawn(async move {
            engine
                .apply_adjustment(Adjustment::new(
                    account_id,
                    -1,
                    TransactionKind::Usage,
                    format!("debit {}", i),
                ))
                .await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientCredits { .. })))
        .count();

    assert_eq!(succeeded, 5);
    assert_eq!(rejected, 7);
    assert_eq!(balance_of(&pool, account.id).await, 0);
    assert_eq!(record_count(&pool, account.id).await, 6);
}

#[tokio::test]
async fn test_concurrent_mixed_adjustments_balance_matches_ledger() {
    let Some(pool) = test_pool().await else { return };
    let engine = CreditEngine::new(pool.clone());
    let account = open_account(&pool).await;

    let amounts: Vec<i32> = vec![3, -2, -4, 10, -1, -7, 2, -3, 5, -6, -1, 1, -8, 4, -2];

    let handles = amounts.iter().copied().map(|amount| {
        let engine = engine.clone();
        let account_id = account.id;
        tokio::spawn(async move {
            let result = engine
                .apply_adjustment(Adjustment::new(
                    account_id,
                    amount,
                    TransactionKind::AdminAdjustment,
                    "concurrency",
                ))
                .await;
            (amount, result)
        })
    });

    let mut applied_sum = 0;
    let mut applied_count = 0;
    for joined in join_all(handles).await {
        let (amount, result) = joined.expect("task should not panic");
        match result {
            Ok(_) => {
                applied_sum += amount;
                applied_count += 1;
            }
            Err(LedgerError::InsufficientCredits { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let balance = balance_of(&pool, account.id).await;
    assert_eq!(balance, SIGNUP_BONUS + applied_sum);
    assert!(balance >= 0);
    assert_eq!(record_count(&pool, account.id).await, 1 + applied_count);

    let report = engine.reconcile(account.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.ledger_total, i64::from(balance));
}

#[tokio::test]
async fn test_ledger_rows_are_immutable() {
    let Some(pool) = test_pool().await else { return };
    let account = open_account(&pool).await;

    let update = sqlx::query("UPDATE credit_transactions SET amount = 500 WHERE account_id = $1")
        .bind(account.id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM credit_transactions WHERE account_id = $1")
        .bind(account.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());

    assert_eq!(record_count(&pool, account.id).await, 1);
}
