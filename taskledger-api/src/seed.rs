/// Admin account seeding
///
/// Run with `taskledger-api seed-admin`. Reads `ADMIN_EMAIL` and
/// `ADMIN_PASSWORD`, and creates a verified enterprise admin unless an
/// account with that email already exists. The admin receives the usual
/// sign-up bonus through the ledger.

use taskledger_shared::{
    auth::password::hash_password,
    credits::CreditEngine,
    models::account::{Account, AccountRole, CreateAccount},
};

pub const ADMIN_NAME: &str = "Admin User";

#[derive(Debug)]
pub enum SeedOutcome {
    Created(Account),
    AlreadyExists(Account),
}

/// Admin account input for the given credentials
pub fn admin_account(email: &str, password_hash: String) -> CreateAccount {
    CreateAccount {
        role: AccountRole::Admin,
        verified: true,
        subscription_plan: "enterprise".to_string(),
        ..CreateAccount::user(ADMIN_NAME, email.trim(), password_hash)
    }
}

pub async fn seed_admin(
    engine: &CreditEngine,
    email: &str,
    password: &str,
) -> anyhow::Result<SeedOutcome> {
    if email.trim().is_empty() || password.is_empty() {
        anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must not be empty");
    }

    if let Some(existing) = Account::find_by_email(engine.pool(), email.trim()).await? {
        return Ok(SeedOutcome::AlreadyExists(existing));
    }

    let hash = hash_password(password)?;
    let account = engine.open_account(admin_account(email, hash)).await?;

    Ok(SeedOutcome::Created(account))
}

/// Entry point for the `seed-admin` subcommand
pub async fn run_from_env(engine: &CreditEngine) -> anyhow::Result<()> {
    let email = std::env::var("ADMIN_EMAIL")
        .map_err(|_| anyhow::anyhow!("ADMIN_EMAIL environment variable is required"))?;
    let password = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD environment variable is required"))?;

    match seed_admin(engine, &email, &password).await? {
        SeedOutcome::Created(account) => {
            tracing::info!(account_id = %account.id, email = %account.email, "Admin user created");
        }
        SeedOutcome::AlreadyExists(account) => {
            tracing::info!(account_id = %account.id, "Admin user already exists");
        }
    }

    Ok(())
}
