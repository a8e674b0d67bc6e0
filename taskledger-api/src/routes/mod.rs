/// API route handlers, by resource
///
/// - `health`: liveness and database check
/// - `auth`: signup, login, current account, profile
/// - `tasks`: task CRUD for the caller
/// - `payments`: credit purchase and provider webhook
/// - `admin`: account management, ledger and stats

pub mod admin;
pub mod auth;
pub mod health;
pub mod payments;
pub mod tasks;
