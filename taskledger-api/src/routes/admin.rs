/// Admin endpoints
///
/// Mounted under `/api/admin` behind the admin layer. Credit grants go
/// through the same ledger engine as every other balance change.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskledger_shared::{
    credits::{Adjustment, Reconciliation},
    models::{
        account::{Account, AccountRole, UpdateAccountStatus},
        task::{Task, TaskScope},
        transaction::CreditTransaction,
    },
};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_tasks: i64,
    pub active_subscriptions: i64,
}

/// Partial account update; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub verified: Option<bool>,
    pub role: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_plan: Option<String>,
}

impl UpdateUserRequest {
    fn into_update(self) -> ApiResult<UpdateAccountStatus> {
        let role = match self.role.as_deref() {
            Some(value) => Some(
                AccountRole::parse(value.trim())
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid role: {}", value)))?,
            ),
            None => None,
        };

        Ok(UpdateAccountStatus {
            verified: self.verified,
            role,
            subscription_status: self.subscription_status,
            subscription_plan: self.subscription_plan,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddCreditsRequest {
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub reconciliation: Reconciliation,
    pub transactions: Vec<CreditTransaction>,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(Account::list_all(&state.db).await?))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    Ok(Json(StatsResponse {
        total_users: Account::count(&state.db).await?,
        total_tasks: Task::count_live(&state.db).await?,
        active_subscriptions: Account::count_active_subscriptions(&state.db).await?,
    }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<Account>> {
    let update = req.into_update()?;

    let account = if update.is_empty() {
        Account::find_by_id(&state.db, id).await?
    } else {
        Account::update_status(&state.db, id, update).await?
    };

    let account = account.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    tracing::info!(account_id = %account.id, "Account status updated by admin");

    Ok(Json(account))
}

/// Grants credits to an account
///
/// # Errors
///
/// - `400 Bad Request`: amount is not positive
/// - `404 Not Found`: unknown account
pub async fn add_credits(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCreditsRequest>,
) -> ApiResult<Json<Value>> {
    if req.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".to_string()));
    }

    let outcome = state
        .credits
        .apply_adjustment(Adjustment::admin_grant(id, req.amount))
        .await?;

    Ok(Json(json!({
        "message": "Credits added successfully",
        "new_balance": outcome.new_balance,
    })))
}

pub async fn list_transactions(State(state): State<AppState>) -> ApiResult<Json<Vec<CreditTransaction>>> {
    Ok(Json(CreditTransaction::list_all(&state.db).await?))
}

/// Balance check plus the account's full ledger
pub async fn user_ledger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LedgerResponse>> {
    let reconciliation = state.credits.reconcile(id).await?;
    if !reconciliation.consistent {
        tracing::error!(
            account_id = %id,
            balance = reconciliation.balance,
            ledger_total = reconciliation.ledger_total,
            "Balance does not match ledger"
        );
    }

    let transactions = CreditTransaction::list_by_account(&state.db, id).await?;

    Ok(Json(LedgerResponse {
        reconciliation,
        transactions,
    }))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list_tasks(TaskScope::All).await?))
}
