/// Per-IP rate limiting
///
/// Token bucket per client address, kept in memory:
/// - Tokens refill at `RATE_LIMIT_PER_SECOND`
/// - Bucket holds at most `RATE_LIMIT_BURST` tokens
/// - Each request consumes 1 token; an empty bucket answers 429 with
///   `Retry-After`
///
/// The client address is the first `X-Forwarded-For` entry when present,
/// otherwise the peer address. A background sweep drops buckets that have
/// been idle for a while so the map stays bounded.

use crate::app::AppState;
use crate::config::RateLimitConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// How often idle buckets are swept
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Buckets unused for longer than this are dropped
pub const MAX_IDLE: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a new full bucket
    fn new(capacity: u32, now: Instant) -> Self {
        TokenBucket {
            tokens: f64::from(capacity),
            last_refill: now,
        }
    }

    /// Refills tokens based on elapsed time
    fn refill(&mut self, rate: f64, capacity: u32, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;
    }

    /// Attempts to consume N tokens
    fn try_consume(&mut self, count: f64) -> bool {
        if self.tokens >= count {
            self.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Calculates seconds until N tokens available
    fn seconds_until_available(&self, count: f64, rate: f64) -> u64 {
        let deficit = count - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            ((deficit / rate).ceil() as u64).max(1)
        }
    }
}

/// Shared limiter state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    rate: f64,
    burst: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate: config.per_second,
            burst: config.burst,
        }
    }

    /// Takes one token for `key`, or returns the seconds to wait
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.refill(self.rate, self.burst, now);

        if bucket.try_consume(1.0) {
            Ok(())
        } else {
            Err(bucket.seconds_until_available(1.0, self.rate))
        }
    }

    /// Drops buckets idle longer than `max_idle`, returning how many went
    pub fn cleanup(&self, max_idle: Duration) -> usize {
        self.cleanup_at(max_idle, Instant::now())
    }

    fn cleanup_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) <= max_idle);
        before - buckets.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Runs the idle sweep forever on the current runtime
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = limiter.cleanup(MAX_IDLE);
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked_clients(), "Swept idle rate limit buckets");
                }
            }
        })
    }
}

/// Client key for a request
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware layer
///
/// # Errors
///
/// - 429 Too Many Requests: bucket empty for this client
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    if let Err(retry_after) = state.rate_limiter.check(&key) {
        tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after,
            message: "Too many requests".to_string(),
        });
    }

    Ok(next.run(request).await)
}
