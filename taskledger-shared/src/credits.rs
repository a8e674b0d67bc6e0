/// Credit transaction engine
///
/// Every change to an account's credit balance goes through [`apply_in`]:
///
/// 1. lock the account row (`SELECT ... FOR UPDATE`)
/// 2. compute the new balance with checked arithmetic
/// 3. reject debits that would take the balance below zero
/// 4. write the balance and append exactly one ledger record
///
/// Steps 1-4 run on a single Postgres transaction owned by the caller, so a
/// caller can bundle its own writes (a task insert, a processed-event claim,
/// a new account row) into the same atomic unit. Dropping the transaction
/// without committing rolls everything back, which covers request
/// cancellation.
///
/// Adjustments to the same account serialize on the row lock. Different
/// accounts never contend.
///
/// # Example
///
/// ```no_run
/// use taskledger_shared::credits::{Adjustment, CreditEngine};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, account_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CreditEngine::new(pool);
/// let outcome = engine
///     .apply_adjustment(Adjustment::admin_grant(account_id, 100))
///     .await?;
/// println!("new balance: {}", outcome.new_balance);
/// # Ok(())
/// # }
/// ```

use crate::models::{
    account::{Account, CreateAccount},
    transaction::{CreditTransaction, NewCreditTransaction, TransactionKind},
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

/// Credits granted to every new account
pub const SIGNUP_BONUS: i32 = 5;

/// Credits charged for creating one task
pub const TASK_CREATION_COST: i32 = 1;

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The debit would take the balance below zero
    #[error("Insufficient credits: balance is {balance}, adjustment is {amount}")]
    InsufficientCredits { balance: i32, amount: i32 },

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Zero adjustments are rejected; they would log a record that changes nothing
    #[error("Adjustment amount must be non-zero")]
    InvalidAmount,

    #[error("Balance overflow")]
    Overflow,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A requested balance change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjustment {
    pub account_id: Uuid,
    pub amount: i32,
    pub kind: TransactionKind,
    pub description: String,
}

impl Adjustment {
    pub fn new(
        account_id: Uuid,
        amount: i32,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind,
            description: description.into(),
        }
    }

    /// Debit for creating a task
    pub fn task_usage(account_id: Uuid, title: &str) -> Self {
        Self::new(
            account_id,
            -TASK_CREATION_COST,
            TransactionKind::Usage,
            format!("Created task: {}", title),
        )
    }

    /// Credit for a settled payment
    pub fn purchase(account_id: Uuid, credits: i32) -> Self {
        Self::new(
            account_id,
            credits,
            TransactionKind::Purchase,
            format!("Purchased {} credits via Stripe", credits),
        )
    }

    /// Manual grant by an administrator
    pub fn admin_grant(account_id: Uuid, amount: i32) -> Self {
        Self::new(
            account_id,
            amount,
            TransactionKind::AdminAdjustment,
            "Admin added credits",
        )
    }

    pub fn signup_bonus(account_id: Uuid) -> Self {
        Self::new(
            account_id,
            SIGNUP_BONUS,
            TransactionKind::Bonus,
            "Initial sign-up credits",
        )
    }
}

/// Result of a successful adjustment
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentOutcome {
    pub new_balance: i32,
    pub transaction: CreditTransaction,
}

/// Balance vs. ledger comparison for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub account_id: Uuid,
    pub balance: i64,
    pub ledger_total: i64,
    pub record_count: i64,
    pub consistent: bool,
}

/// Computes `balance + amount`, enforcing the non-negative floor for debits
///
/// Credits are always accepted (barring overflow). A debit is accepted only
/// if the result stays at or above zero.
pub fn compute_new_balance(balance: i32, amount: i32) -> Result<i32, LedgerError> {
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let new_balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;

    if amount < 0 && new_balance < 0 {
        return Err(LedgerError::InsufficientCredits { balance, amount });
    }

    Ok(new_balance)
}

/// Applies an adjustment on the caller's transaction
///
/// On error nothing has been written by this function, but the caller must
/// still drop or roll back its transaction: Postgres marks a transaction as
/// aborted after a failed statement.
///
/// # Errors
///
/// - `InvalidAmount` for a zero amount
/// - `AccountNotFound` if the account row does not exist
/// - `InsufficientCredits` if a debit would go below zero
/// - `Overflow` if the balance would not fit
/// - `Database` for persistence failures
pub async fn apply_in(
    conn: &mut PgConnection,
    adjustment: Adjustment,
) -> Result<AdjustmentOutcome, LedgerError> {
    if adjustment.amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }

    let balance: Option<i32> =
        sqlx::query_scalar("SELECT credits FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(adjustment.account_id)
            .fetch_optional(&mut *conn)
            .await?;

    let balance = balance.ok_or(LedgerError::AccountNotFound(adjustment.account_id))?;

    let new_balance = match compute_new_balance(balance, adjustment.amount) {
        Ok(value) => value,
        Err(e) => {
            debug!(
                account_id = %adjustment.account_id,
                balance,
                amount = adjustment.amount,
                kind = %adjustment.kind,
                "Credit adjustment rejected"
            );
            return Err(e);
        }
    };

    sqlx::query("UPDATE accounts SET credits = $2, updated_at = NOW() WHERE id = $1")
        .bind(adjustment.account_id)
        .bind(new_balance)
        .execute(&mut *conn)
        .await?;

    let transaction = CreditTransaction::append(
        &mut *conn,
        NewCreditTransaction {
            account_id: adjustment.account_id,
            amount: adjustment.amount,
            kind: adjustment.kind,
            description: adjustment.description,
        },
    )
    .await?;

    Ok(AdjustmentOutcome {
        new_balance,
        transaction,
    })
}

/// Pool-owning front end for the ledger
///
/// Cheap to clone; holds only the connection pool.
#[derive(Debug, Clone)]
pub struct CreditEngine {
    db: PgPool,
}

impl CreditEngine {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Applies one adjustment in its own transaction
    pub async fn apply_adjustment(
        &self,
        adjustment: Adjustment,
    ) -> Result<AdjustmentOutcome, LedgerError> {
        let account_id = adjustment.account_id;
        let kind = adjustment.kind;
        let amount = adjustment.amount;

        let mut tx = self.db.begin().await?;
        let outcome = apply_in(&mut tx, adjustment).await?;
        tx.commit().await?;

        info!(
            account_id = %account_id,
            amount,
            kind = %kind,
            new_balance = outcome.new_balance,
            "Credit adjustment applied"
        );

        Ok(outcome)
    }

    /// Creates an account and grants the sign-up bonus atomically
    ///
    /// The account row is inserted with a zero balance and the bonus goes
    /// through the ledger, so balance and records agree from the start.
    ///
    /// # Errors
    ///
    /// `Database` wraps the unique violation on `accounts_email_key` for a
    /// duplicate email.
    pub async fn open_account(&self, data: CreateAccount) -> Result<Account, LedgerError> {
        let mut tx = self.db.begin().await?;

        let mut account = Account::insert(&mut tx, data).await?;
        let bonus = apply_in(&mut tx, Adjustment::signup_bonus(account.id)).await?;

        tx.commit().await?;

        account.credits = bonus.new_balance;
        info!(
            account_id = %account.id,
            credits = account.credits,
            "Account opened with sign-up bonus"
        );

        Ok(account)
    }

    /// Compares an account's balance with the sum of its ledger records
    ///
    /// Takes a share lock on the account row so no adjustment can land
    /// between reading the balance and summing the records.
    pub async fn reconcile(&self, account_id: Uuid) -> Result<Reconciliation, LedgerError> {
        let mut tx = self.db.begin().await?;

        let balance: Option<i32> =
            sqlx::query_scalar("SELECT credits FROM accounts WHERE id = $1 FOR SHARE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        let balance = i64::from(balance.ok_or(LedgerError::AccountNotFound(account_id))?);

        let (ledger_total, record_count) =
            CreditTransaction::totals_for_account(&mut tx, account_id).await?;

        tx.commit().await?;

        Ok(Reconciliation {
            account_id,
            balance,
            ledger_total,
            record_count,
            consistent: balance == ledger_total,
        })
    }
}
