/// Account endpoints
///
/// - `POST /api/auth/signup` - Register; the new account starts with 5 credits
/// - `POST /api/auth/login` - Exchange credentials for a bearer token
/// - `GET /api/auth/me` - Current account
/// - `PUT /api/auth/profile` - Change name and/or password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskledger_shared::{
    auth::{
        jwt::{create_token, Claims},
        middleware::AuthContext,
        password,
    },
    models::account::{Account, AccountRole, CreateAccount},
};
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name is required (at most 100 characters)"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public view of the logged-in account
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AccountRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    pub current_password: Option<String>,
}

/// Registers an account
///
/// The account row and its sign-up bonus are written in one transaction.
///
/// # Errors
///
/// - `409 Conflict`: Email already exists (case-insensitive)
/// - `422 Unprocessable Entity`: Validation failed
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;
    let account = state
        .credits
        .open_account(CreateAccount::user(req.name.trim(), req.email.trim(), password_hash))
        .await?;

    tracing::info!(account_id = %account.id, "Account registered");

    Ok(Json(json!({ "message": "Registration success" })))
}

/// Issues a bearer token
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let account = Account::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &account.password_hash)? {
        tracing::debug!(account_id = %account.id, "Login with wrong password");
        return Err(invalid());
    }

    let claims = Claims::new(account.id, state.config.jwt.lifespan_hours);
    let token = create_token(&claims, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        token,
        user: LoginUser {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
        },
    }))
}

async fn current_account(state: &AppState, auth: AuthContext) -> ApiResult<Account> {
    Account::find_by_id(&state.db, auth.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Value>> {
    let account = current_account(&state, auth).await?;
    Ok(Json(json!({ "data": account })))
}

/// Updates name and/or password
///
/// A new password must be accompanied by the current one.
///
/// # Errors
///
/// - `400 Bad Request`: Current password missing or wrong
/// - `404 Not Found`: Account no longer exists
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;

    let account = current_account(&state, auth).await?;

    let password_hash = match req.password.as_deref() {
        Some(new_password) => {
            let current = req
                .current_password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "Current password is required to set a new password".to_string(),
                    )
                })?;

            if !password::verify_password(current, &account.password_hash)? {
                return Err(ApiError::BadRequest("Incorrect current password".to_string()));
            }

            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

    let updated = Account::update_profile(&state.db, account.id, name, password_hash)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "data": updated,
    })))
}
