/// Payment provider integration
///
/// - [`signature`]: webhook signature verification
/// - [`settlement`]: idempotent crediting of successful payments

pub mod settlement;
pub mod signature;
