/// Session authentication middleware
///
/// Resolves the `Authorization: Bearer <token>` header through the
/// application's [`AuthProvider`](marketdesk_shared::auth::provider::AuthProvider)
/// and stores the caller in the request extensions:
///
/// - [`AuthContext`] for authorization decisions
/// - [`SessionToken`] for handlers that act on the token itself (logout)

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use marketdesk_shared::auth::middleware::{bearer_token, AuthContext};

/// Raw bearer token of the current request
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = bearer_token(auth_header)
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?
        .to_string();

    let session = state.auth.resolve(&token).await.map_err(|e| {
        tracing::debug!(reason = e.code(), "Session rejected");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext::from_session(&session));
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}
