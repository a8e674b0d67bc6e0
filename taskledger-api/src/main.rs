//! # TaskLedger API Server
//!
//! ```bash
//! cargo run -p taskledger-api              # serve
//! cargo run -p taskledger-api -- seed-admin  # create the admin account
//! ```

use std::net::SocketAddr;
use taskledger_api::{
    app::{build_router, AppState},
    config::Config,
    init_tracing, seed,
};
use taskledger_shared::{
    credits::CreditEngine,
    db::{
        migrations::{ensure_database_exists, get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    if std::env::args().nth(1).as_deref() == Some("seed-admin") {
        return seed_admin().await;
    }

    tracing::info!(
        "TaskLedger API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    ensure_database_exists(&config.database.url).await?;
    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;
    let status = get_migration_status(&pool).await?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        up_to_date = status.is_up_to_date,
        "Schema ready"
    );

    if config.stripe.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, credit purchases are disabled");
    }

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    let cleanup = state.rate_limiter.spawn_cleanup();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup.abort();
    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn seed_admin() -> anyhow::Result<()> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    ensure_database_exists(&url).await?;
    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let result = seed::run_from_env(&CreditEngine::new(pool.clone())).await;
    close_pool(pool).await;
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
