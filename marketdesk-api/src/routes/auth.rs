/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Self-register a seeking organization or user
/// - `POST /v1/auth/login` - Login and get a session token
/// - `POST /v1/auth/logout` - End the current session
/// - `GET /v1/auth/session` - Describe the current session

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::session::SessionToken,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use marketdesk_shared::{
    auth::{
        middleware::AuthContext,
        provider::{IssuedSession, NewAccount},
    },
    models::account::{Account, AccountClass},
};
use serde::Deserialize;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Portal the caller logs in to
    pub class: AccountClass,

    #[validate(length(min = 1, message = "Login ID is required"))]
    pub login_id: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "class": "seeking_organization",
///   "login_id": "acme",
///   "password": "Welcome#2024",
///   "display_name": "Jane Doe",
///   "organization_name": "Acme Ltd",
///   "organization_type": "Start-up",
///   "country": "India"
/// }
/// ```
///
/// Users are active immediately; seeking organizations wait for approval.
///
/// # Errors
///
/// - `403 Forbidden`: the class cannot self-register
/// - `409 Conflict`: login ID already taken in this class
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = state.auth.register(req).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "class": "user",
///   "login_id": "jane",
///   "password": "Welcome#2024"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ...",
///   "session": { "id": "uuid", "account_class": "user", "expires_at": "..." }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown login ID or wrong password
/// - `403 Forbidden`: account pending, inactive or rejected
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<IssuedSession>> {
    req.validate()?;

    let issued = state
        .auth
        .authenticate(req.class, &req.login_id, &req.password)
        .await?;

    Ok(Json(issued))
}

/// Ends the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<StatusCode> {
    state.auth.logout(&token).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Current session, as shown in the dashboard header
pub async fn current_session(Extension(auth): Extension<AuthContext>) -> Json<AuthContext> {
    Json(auth)
}
