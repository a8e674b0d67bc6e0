/// Payment settlement integration tests
///
/// Require PostgreSQL in `DATABASE_URL`; skipped otherwise.

mod common;

use common::{
    balance_of, event_claimed, open_account, record_count, record_count_of_kind, test_pool,
};
use futures::future::join_all;
use serde_json::json;
use taskledger_shared::models::transaction::{CreditTransaction, TransactionKind};
use taskledger_shared::payments::settlement::{
    PaymentEvent, SettlementAdapter, SettlementOutcome, PAYMENT_SUCCEEDED,
};
use uuid::Uuid;

fn succeeded_event(event_id: &str, account_id: Uuid, credits: i32) -> PaymentEvent {
    serde_json::from_value(json!({
        "id": event_id,
        "type": PAYMENT_SUCCEEDED,
        "data": {
            "object": {
                "id": format!("pi_{}", Uuid::new_v4().simple()),
                "metadata": {
                    "user_id": account_id.to_string(),
                    "credits": credits.to_string()
                }
            }
        }
    }))
    .unwrap()
}

fn event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_same_event_credits_once() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let account = open_account(&pool).await;
    let event = succeeded_event(&event_id(), account.id, 20);

    let first = adapter.handle_event(&event).await;
    assert_eq!(
        first,
        SettlementOutcome::Applied {
            account_id: account.id,
            credits: 20,
            new_balance: 25
        }
    );

    let second = adapter.handle_event(&event).await;
    assert_eq!(second, SettlementOutcome::Duplicate);

    assert_eq!(balance_of(&pool, account.id).await, 25);
    assert_eq!(
        record_count_of_kind(&pool, account.id, TransactionKind::Purchase).await,
        1
    );

    let records = CreditTransaction::list_by_account(&pool, account.id).await.unwrap();
    assert_eq!(records[0].description, "Purchased 20 credits via Stripe");
}

#[tokio::test]
async fn test_concurrent_redeliveries_credit_once() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let account = open_account(&pool).await;
    let id = event_id();

    let handles = (0..8).map(|_| {
        let adapter = adapter.clone();
        let id = id.clone();
        let account_id = account.id;
        tokio::spawn(async move { adapter.settle(&id, account_id, 20).await })
    });

    let outcomes: Vec<SettlementOutcome> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("no panic").expect("settle should not error"))
        .collect();

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, SettlementOutcome::Applied { .. }))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(outcomes.len() - applied, 8 - 1);
    assert_eq!(balance_of(&pool, account.id).await, 25);
}

#[tokio::test]
async fn test_distinct_events_each_credit() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let account = open_account(&pool).await;

    adapter.handle_event(&succeeded_event(&event_id(), account.id, 10)).await;
    adapter.handle_event(&succeeded_event(&event_id(), account.id, 3)).await;

    assert_eq!(balance_of(&pool, account.id).await, 18);
}

#[tokio::test]
async fn test_unknown_account_fails_and_releases_claim() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let id = event_id();

    let outcome = adapter
        .handle_event(&succeeded_event(&id, Uuid::new_v4(), 20))
        .await;
    assert!(matches!(outcome, SettlementOutcome::Failed { .. }));

    assert!(!event_claimed(&pool, &id).await);
}

#[tokio::test]
async fn test_missing_metadata_is_ignored() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let account = open_account(&pool).await;

    let event: PaymentEvent = serde_json::from_value(json!({
        "id": event_id(),
        "type": PAYMENT_SUCCEEDED,
        "data": { "object": { "metadata": { "credits": "20" } } }
    }))
    .unwrap();

    assert!(matches!(
        adapter.handle_event(&event).await,
        SettlementOutcome::Ignored { .. }
    ));
    assert_eq!(record_count(&pool, account.id).await, 1);
}

#[tokio::test]
async fn test_other_event_types_are_ignored() {
    let Some(pool) = test_pool().await else { return };
    let adapter = SettlementAdapter::new(pool.clone());
    let account = open_account(&pool).await;

    let mut event = succeeded_event(&event_id(), account.id, 20);
    event.event_type = "payment_intent.payment_failed".to_string();

    assert!(matches!(
        adapter.handle_event(&event).await,
        SettlementOutcome::Ignored { .. }
    ));
    assert_eq!(balance_of(&pool, account.id).await, 5);
}
