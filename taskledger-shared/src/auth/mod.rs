/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 bearer tokens
/// - [`middleware`]: bearer token parsing and the `AuthContext` extractor

pub mod jwt;
pub mod middleware;
pub mod password;
