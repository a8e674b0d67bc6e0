//! # TaskLedger Shared Library
//!
//! Domain logic shared by the TaskLedger API server and its admin tooling.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and migrations
//! - `models`: database rows and queries
//! - `credits`: the credit transaction engine (every balance change)
//! - `tasks`: task CRUD, charging one credit per created task
//! - `payments`: webhook signatures and idempotent payment settlement
//! - `auth`: passwords, JWTs and the request auth context

pub mod auth;
pub mod credits;
pub mod db;
pub mod models;
pub mod payments;
pub mod tasks;

/// Current version of the TaskLedger shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
