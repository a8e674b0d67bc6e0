/// Database layer
///
/// - `pool`: connection pool with health check
/// - `migrations`: embedded migration runner
///
/// Row types and queries are in [`crate::models`].

pub mod migrations;
pub mod pool;
