//! # TaskLedger API Server Library
//!
//! HTTP surface of TaskLedger: accounts, credit-metered tasks, credit
//! purchases and the admin console.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `billing`: Payment provider client
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and rate limiting
//! - `routes`: API route handlers
//! - `seed`: Admin account seeding

pub mod app;
pub mod billing;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod seed;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "taskledger_api=debug,taskledger_shared=info,tower_http=debug";

/// Installs the global tracing subscriber
///
/// `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
