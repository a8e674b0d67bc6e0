/// Configuration management for the API server
///
/// Loaded from environment variables (and a `.env` file in development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to (default: 8080)
/// - `API_SECRET`: Token signing secret, at least 32 characters (required)
/// - `TOKEN_HOUR_LIFESPAN`: Token lifetime in hours (default: 24)
/// - `STRIPE_SECRET_KEY`: Payment provider API key (optional)
/// - `STRIPE_WEBHOOK_SECRET`: Webhook signing secret (required)
/// - `STRIPE_API_BASE`: Payment provider base URL (default: https://api.stripe.com)
/// - `ALLOWED_ORIGINS`: Comma separated CORS origins, `*` for any
/// - `PRODUCTION`: Enables HSTS when `true`
/// - `RATE_LIMIT_PER_SECOND` / `RATE_LIMIT_BURST`: Per-IP limits (default: 5 / 10)
///
/// # Example
///
/// ```no_run
/// use taskledger_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Production mode turns on HSTS
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret
    ///
    /// Must be at least 32 bytes. Generate with `openssl rand -hex 32`.
    pub secret: String,

    /// Token lifetime in hours
    pub lifespan_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Secret API key; purchases are unavailable without it
    pub secret_key: Option<String>,

    /// Shared secret for webhook signatures
    pub webhook_secret: String,

    pub api_base: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 5.0,
            burst: 10,
        }
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", name, e)),
        _ => Ok(default),
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
}

/// Splits a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let jwt_secret = required("API_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("API_SECRET must be at least 32 characters long");
        }

        let lifespan_hours: i64 = var_or("TOKEN_HOUR_LIFESPAN", 24)?;
        if lifespan_hours <= 0 {
            anyhow::bail!("TOKEN_HOUR_LIFESPAN must be positive");
        }

        let webhook_secret = required("STRIPE_WEBHOOK_SECRET")?;
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
        let mut cors_origins = parse_origins(&origins);
        if cors_origins.is_empty() {
            cors_origins = parse_origins(DEFAULT_ORIGINS);
        }

        let rate_limit = RateLimitConfig {
            per_second: var_or("RATE_LIMIT_PER_SECOND", 5.0)?,
            burst: var_or("RATE_LIMIT_BURST", 10)?,
        };
        if rate_limit.per_second <= 0.0 || rate_limit.burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("PORT", 8080)?,
                cors_origins,
                production: var_or("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                lifespan_hours,
            },
            stripe: StripeConfig {
                secret_key,
                webhook_secret,
                api_base: env::var("STRIPE_API_BASE")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            },
            rate_limit,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should accept any origin
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}
