/// Middleware for the API server
///
/// - `security`: security response headers
/// - `rate_limit`: per-IP token bucket

pub mod rate_limit;
pub mod security;
