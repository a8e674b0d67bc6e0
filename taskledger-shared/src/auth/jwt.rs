/// JWT token generation and validation
///
/// Bearer tokens are HS256-signed and identify an account by its id in
/// `sub`. There is a single token type; lifetime is configured in hours
/// (`TOKEN_HOUR_LIFESPAN`, 24 by default).
///
/// # Example
///
/// ```
/// use taskledger_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let account_id = Uuid::new_v4();
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
///
/// let token = create_token(&Claims::new(account_id, 24), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, account_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written to and required in every token
pub const ISSUER: &str = "taskledger";

/// Default token lifetime in hours
pub const DEFAULT_LIFESPAN_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,

    /// Always [`ISSUER`]
    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,
}

impl Claims {
    /// Claims valid from now for `lifespan_hours`
    pub fn new(account_id: Uuid, lifespan_hours: i64) -> Self {
        Self::with_expiration(account_id, Duration::hours(lifespan_hours))
    }

    pub fn with_expiration(account_id: Uuid, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: account_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Verifies signature, expiry, not-before and issuer
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            _ => JwtError::ValidationError(e.to_string()),
        })
}
