/// Request authentication context
///
/// The API's session layer resolves the bearer token of each protected
/// request and stores an [`AuthContext`] in the request extensions. Handlers
/// read it with `Extension<AuthContext>` and use [`AuthContext::require_admin`]
/// for administrator-only operations.
///
/// # Example
///
/// ```
/// use marketdesk_shared::auth::middleware::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::AccountClass;
use crate::models::membership::MembershipStatus;
use crate::models::session::Session;

/// Authenticated caller of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub session_id: Uuid,
    pub account_id: Uuid,
    pub class: AccountClass,
    pub display_name: String,
    pub organization_name: Option<String>,
    pub organization_type: Option<String>,
    pub country: Option<String>,
    pub membership_status: MembershipStatus,
    pub expires_at: DateTime<Utc>,
}

/// Caller lacks the account class an operation needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation requires a {required} account")]
pub struct AccessDenied {
    pub required: &'static str,
}

impl AuthContext {
    /// Builds the context of a resolved session
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id,
            account_id: session.account_id,
            class: session.account_class,
            display_name: session.display_name.clone(),
            organization_name: session.organization_name.clone(),
            organization_type: session.organization_type.clone(),
            country: session.country.clone(),
            membership_status: session.membership_status,
            expires_at: session.expires_at,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.class == AccountClass::Administrator
    }

    /// Fails unless the caller belongs to `class`
    pub fn require_class(&self, class: AccountClass) -> Result<(), AccessDenied> {
        if self.class == class {
            Ok(())
        } else {
            Err(AccessDenied {
                required: class.as_str(),
            })
        }
    }

    /// Fails unless the caller is an administrator
    pub fn require_admin(&self) -> Result<(), AccessDenied> {
        self.require_class(AccountClass::Administrator)
    }
}

/// Extracts the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; blank tokens are rejected.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
