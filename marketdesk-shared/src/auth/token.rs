/// Session tokens
///
/// A session token is an HS256 JWT naming a session row. The signature
/// proves the token was issued by this service; whether the session is still
/// alive is decided by the row (see [`crate::auth::provider`]).
///
/// Expiry is checked separately from signature validation: [`decode_token`]
/// accepts expired tokens and callers compare `exp` themselves, so an expired
/// session can still be identified and cleaned up.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use marketdesk_shared::auth::token::{create_token, decode_token, SessionClaims};
/// use marketdesk_shared::models::account::AccountClass;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-very-long-secret-used-for-signing-tokens";
/// let claims = SessionClaims::new(
///     Uuid::new_v4(),
///     Uuid::new_v4(),
///     AccountClass::User,
///     Utc::now() + Duration::hours(24),
/// );
///
/// let token = create_token(&claims, secret)?;
/// let decoded = decode_token(&token, secret)?;
/// assert_eq!(decoded.sid, claims.sid);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::AccountClass;

/// Issuer written into every token
pub const TOKEN_ISSUER: &str = "marketdesk";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(String),

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token was not issued by this service")]
    WrongIssuer,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Claims of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session ID
    pub sid: Uuid,

    /// Account ID
    pub sub: Uuid,

    /// Account class
    pub class: AccountClass,

    /// Issuer, always [`TOKEN_ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Session expiry (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Builds claims for a session expiring at `expires_at`
    pub fn new(sid: Uuid, account_id: Uuid, class: AccountClass, expires_at: DateTime<Utc>) -> Self {
        Self {
            sid,
            sub: account_id,
            class,
            iss: TOKEN_ISSUER.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Whether the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs claims into a token
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key).map_err(|e| TokenError::Sign(e.to_string()))
}

/// Verifies signature and issuer and returns the claims
///
/// Expired tokens are accepted; see [`SessionClaims::is_expired_at`].
pub fn decode_token(token: &str, secret: &str) -> Result<SessionClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.validate_exp = false;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
            _ => TokenError::Malformed(e.to_string()),
        })
}
