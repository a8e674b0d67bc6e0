/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskledger_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskledger_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    billing::{PaymentProvider, StripeClient},
    config::Config,
    error::ApiError,
    middleware::{rate_limit::RateLimiter, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use taskledger_shared::{
    auth::middleware::{authenticate, AuthContext},
    credits::CreditEngine,
    models::account::Account,
    payments::settlement::SettlementAdapter,
    tasks::TaskManager,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted webhook body
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Shared application state
///
/// Cloned into every handler. Everything inside is a pool handle or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub credits: CreditEngine,
    pub tasks: TaskManager,
    pub settlement: SettlementAdapter,
    pub payments: Arc<dyn PaymentProvider>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// State backed by the configured payment provider
    pub fn new(db: PgPool, config: Config) -> Self {
        let provider = StripeClient::new(
            config.stripe.api_base.clone(),
            config.stripe.secret_key.clone(),
        );
        Self::with_provider(db, config, Arc::new(provider))
    }

    pub fn with_provider(db: PgPool, config: Config, payments: Arc<dyn PaymentProvider>) -> Self {
        Self {
            credits: CreditEngine::new(db.clone()),
            tasks: TaskManager::new(db.clone()),
            settlement: SettlementAdapter::new(db.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit),
            payments,
            config: Arc::new(config),
            db,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                              public
/// /api/auth/signup, /api/auth/login    public
/// /api/webhook                         provider signature
/// /api/auth/me, /api/auth/profile      bearer
/// /api/subscriptions/purchase          bearer
/// /api/tasks, /api/tasks/:id           bearer
/// /api/admin/*                         bearer + admin role
/// ```
///
/// Every request passes rate limiting, tracing, CORS, compression and the
/// security headers layer.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route(
            "/webhook",
            post(routes::payments::webhook).layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        );

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/profile", put(routes::auth::update_profile))
        .route("/subscriptions/purchase", post(routes::payments::purchase))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/stats", get(routes::admin::stats))
        .route("/users/:id", put(routes::admin::update_user))
        .route("/users/:id/credits", post(routes::admin::add_credits))
        .route("/users/:id/ledger", get(routes::admin::user_ledger))
        .route("/transactions", get(routes::admin::list_transactions))
        .route("/tasks", get(routes::admin::list_tasks))
        .route_layer(from_fn_with_state(state.clone(), admin_layer))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::rate_limit_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and stores the [`AuthContext`] in the request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Admin gate, layered inside [`jwt_auth_layer`]
///
/// Re-reads the account so a demoted admin loses access immediately.
async fn admin_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("API token required".to_string()))?;

    let account = Account::find_by_id(&state.db, auth.account_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    if !account.is_admin() {
        tracing::warn!(account_id = %account.id, "Non-admin attempted admin access");
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}
