/// Authentication and session service
///
/// Administrators, seeking organizations and users all log in through the
/// same [`AuthProvider`]. What differs per account class is captured by a
/// [`SessionPolicy`]: how long a session lives and whether the class may
/// self-register (and if so, whether new accounts wait for approval).
///
/// # Lifecycle
///
/// ```text
/// Unauthenticated
///     | authenticate: lookup -> password -> status == active
///     v
/// Authenticated(session)  -- logout / expiry -->  Unauthenticated
/// ```
///
/// Expiry is absolute from login; sessions are never extended. The session
/// row is authoritative: a token whose row was deleted (logout, account
/// deactivation, sweeper) no longer resolves.
///
/// # Example
///
/// ```no_run
/// use marketdesk_shared::auth::provider::{AuthProvider, SessionAuthenticator, SessionPolicies};
/// use marketdesk_shared::db::pool::{create_pool, DatabaseConfig};
/// use marketdesk_shared::models::account::AccountClass;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let auth = SessionAuthenticator::new(pool, "secret-of-at-least-32-characters!!", SessionPolicies::default());
///
/// let issued = auth.authenticate(AccountClass::User, "jane", "Welcome#2024").await?;
/// let session = auth.resolve(&issued.token).await?;
/// auth.logout(&issued.token).await?;
/// # Ok(())
/// # }
/// ```

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use super::password::{
    check_password_strength, hash_password, verify_dummy, verify_password, PasswordError,
};
use super::token::{create_token, decode_token, SessionClaims, TokenError};
use crate::models::account::{Account, AccountClass, AccountStatus, CreateAccount};
use crate::models::session::{CreateSession, Session};

/// Name of the unique constraint on (class, login_id)
pub const LOGIN_ID_CONSTRAINT: &str = "accounts_class_login_id_key";

/// Authentication errors
///
/// Every variant has a stable machine-readable [`code`](AuthError::code).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("account not found")]
    AccountNotFound,

    #[error("invalid password")]
    InvalidPassword,

    #[error("account is waiting for approval")]
    AccountPending,

    #[error("account is inactive")]
    AccountInactive,

    #[error("account registration was rejected")]
    AccountRejected,

    #[error("login ID is already taken")]
    LoginIdTaken,

    #[error("{0} accounts cannot self-register")]
    RegistrationClosed(AccountClass),

    #[error("invalid account data")]
    InvalidAccount(#[from] ValidationErrors),

    #[error("session not found")]
    SessionNotFound,

    #[error("session expired")]
    SessionExpired,

    #[error("invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AccountNotFound => "account_not_found",
            AuthError::InvalidPassword => "invalid_password",
            AuthError::AccountPending => "account_pending",
            AuthError::AccountInactive => "account_inactive",
            AuthError::AccountRejected => "account_rejected",
            AuthError::LoginIdTaken => "login_id_taken",
            AuthError::RegistrationClosed(_) => "registration_closed",
            AuthError::InvalidAccount(_) => "validation_error",
            AuthError::SessionNotFound => "session_not_found",
            AuthError::SessionExpired => "session_expired",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Password(_) => "password_error",
            AuthError::Database(_) => "database_error",
        }
    }

    /// Whether the error means "bad credentials"
    ///
    /// Both cases are reported identically to clients.
    pub fn is_bad_credentials(&self) -> bool {
        matches!(self, AuthError::AccountNotFound | AuthError::InvalidPassword)
    }
}

/// What happens when an account of a class registers itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// Self-registration is not allowed
    Closed,

    /// Accounts start pending until an administrator approves them
    RequiresApproval,

    /// Accounts are active immediately
    Open,
}

/// Per-class session rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Absolute session lifetime
    pub lifetime: Duration,

    /// Self-registration rule
    pub registration: Registration,
}

impl SessionPolicy {
    /// Policy with a lifetime in hours
    pub fn hours(hours: i64, registration: Registration) -> Self {
        Self {
            lifetime: Duration::hours(hours),
            registration,
        }
    }
}

/// Session rules for every account class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicies {
    pub administrator: SessionPolicy,
    pub seeking_organization: SessionPolicy,
    pub user: SessionPolicy,
}

impl Default for SessionPolicies {
    fn default() -> Self {
        Self {
            administrator: SessionPolicy::hours(8, Registration::Closed),
            seeking_organization: SessionPolicy::hours(24, Registration::RequiresApproval),
            user: SessionPolicy::hours(24, Registration::Open),
        }
    }
}

impl SessionPolicies {
    /// Policy of a class
    pub fn for_class(&self, class: AccountClass) -> &SessionPolicy {
        match class {
            AccountClass::Administrator => &self.administrator,
            AccountClass::SeekingOrganization => &self.seeking_organization,
            AccountClass::User => &self.user,
        }
    }

    /// Overrides the session lifetime of a class
    pub fn with_lifetime_hours(mut self, class: AccountClass, hours: i64) -> Self {
        let policy = match class {
            AccountClass::Administrator => &mut self.administrator,
            AccountClass::SeekingOrganization => &mut self.seeking_organization,
            AccountClass::User => &mut self.user,
        };
        policy.lifetime = Duration::hours(hours);
        self
    }
}

/// Registration or provisioning input
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_organization_fields", skip_on_field_errors = false))]
pub struct NewAccount {
    pub class: AccountClass,

    #[validate(length(min = 3, max = 255, message = "Login ID must be 3-255 characters"))]
    pub login_id: String,

    #[serde(skip_serializing)]
    #[validate(custom(function = "validate_password"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Display name must be 1-255 characters"))]
    pub display_name: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Organization name must be at most 255 characters"))]
    pub organization_name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "Organization type must be at most 100 characters"))]
    pub organization_type: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,

    #[serde(default)]
    #[validate(email(message = "Invalid contact e-mail address"))]
    pub contact_email: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50, message = "Phone number must be at most 50 characters"))]
    pub contact_phone: Option<String>,
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_password_strength(password).map_err(|e| {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(Cow::Owned(e.to_string()));
        error
    })
}

fn validate_organization_fields(account: &NewAccount) -> Result<(), ValidationError> {
    let has_organization = account
        .organization_name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());

    if account.class == AccountClass::SeekingOrganization && !has_organization {
        let mut error = ValidationError::new("organization_name_required");
        error.message = Some(Cow::Borrowed(
            "Seeking organizations must provide an organization name",
        ));
        return Err(error);
    }

    Ok(())
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    /// Bearer token for subsequent requests
    pub token: String,

    /// Session the token names
    pub session: Session,
}

/// Authentication service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Self-registers an account according to the class policy
    async fn register(&self, account: NewAccount) -> Result<Account, AuthError>;

    /// Checks credentials and opens a session
    async fn authenticate(
        &self,
        class: AccountClass,
        login_id: &str,
        secret: &str,
    ) -> Result<IssuedSession, AuthError>;

    /// Resolves a bearer token to its live session
    async fn resolve(&self, token: &str) -> Result<Session, AuthError>;

    /// Ends the session named by a token
    ///
    /// Logging out twice is not an error.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// Credential checks in order: lookup, password, status
///
/// Pure so that the ordering can be tested without a database. A missing
/// account still runs one password verification, keeping unknown logins and
/// wrong passwords equally slow.
pub fn check_credentials<'a>(
    account: Option<&'a Account>,
    secret: &str,
) -> Result<&'a Account, AuthError> {
    let Some(account) = account else {
        verify_dummy(secret);
        return Err(AuthError::AccountNotFound);
    };

    if !verify_password(secret, &account.password_hash)? {
        return Err(AuthError::InvalidPassword);
    }

    match account.status {
        AccountStatus::Active => Ok(account),
        AccountStatus::Pending => Err(AuthError::AccountPending),
        AccountStatus::Inactive => Err(AuthError::AccountInactive),
        AccountStatus::Rejected => Err(AuthError::AccountRejected),
    }
}

/// Validates, hashes and stores a new account with the given status
///
/// Shared by self-registration, administrator provisioning and the
/// bootstrap administrator.
pub async fn provision_account(
    pool: &PgPool,
    account: NewAccount,
    status: AccountStatus,
) -> Result<Account, AuthError> {
    account.validate()?;

    let password_hash = hash_password(&account.password)?;

    let created = Account::create(
        pool,
        CreateAccount {
            class: account.class,
            login_id: account.login_id,
            password_hash,
            status,
            display_name: account.display_name.trim().to_string(),
            organization_name: trimmed(account.organization_name),
            organization_type: trimmed(account.organization_type),
            country: trimmed(account.country),
            contact_email: trimmed(account.contact_email),
            contact_phone: trimmed(account.contact_phone),
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(LOGIN_ID_CONSTRAINT) => {
            AuthError::LoginIdTaken
        }
        _ => AuthError::Database(e),
    })?;

    info!(
        account_id = %created.id,
        class = created.class.as_str(),
        status = created.status.as_str(),
        "Account created"
    );

    Ok(created)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Creates the bootstrap administrator unless it already exists
///
/// # Returns
///
/// True if the administrator was created
pub async fn ensure_administrator(
    pool: &PgPool,
    login_id: &str,
    password: &str,
) -> Result<bool, AuthError> {
    if Account::find_by_login(pool, AccountClass::Administrator, login_id)
        .await?
        .is_some()
    {
        debug!(login_id, "Bootstrap administrator already exists");
        return Ok(false);
    }

    provision_account(
        pool,
        NewAccount {
            class: AccountClass::Administrator,
            login_id: login_id.to_string(),
            password: password.to_string(),
            display_name: "Administrator".to_string(),
            organization_name: None,
            organization_type: None,
            country: None,
            contact_email: None,
            contact_phone: None,
        },
        AccountStatus::Active,
    )
    .await?;

    Ok(true)
}

/// PostgreSQL-backed [`AuthProvider`]
#[derive(Clone)]
pub struct SessionAuthenticator {
    pool: PgPool,
    secret: String,
    policies: SessionPolicies,
}

impl SessionAuthenticator {
    /// Creates an authenticator signing tokens with `secret`
    pub fn new(pool: PgPool, secret: impl Into<String>, policies: SessionPolicies) -> Self {
        Self {
            pool,
            secret: secret.into(),
            policies,
        }
    }

    /// Session rules in effect
    pub fn policies(&self) -> &SessionPolicies {
        &self.policies
    }
}

#[async_trait]
impl AuthProvider for SessionAuthenticator {
    async fn register(&self, account: NewAccount) -> Result<Account, AuthError> {
        let status = match self.policies.for_class(account.class).registration {
            Registration::Closed => return Err(AuthError::RegistrationClosed(account.class)),
            Registration::RequiresApproval => AccountStatus::Pending,
            Registration::Open => AccountStatus::Active,
        };

        provision_account(&self.pool, account, status).await
    }

    async fn authenticate(
        &self,
        class: AccountClass,
        login_id: &str,
        secret: &str,
    ) -> Result<IssuedSession, AuthError> {
        let found = Account::find_by_login(&self.pool, class, login_id).await?;

        let account = match check_credentials(found.as_ref(), secret) {
            Ok(account) => account,
            Err(e) => {
                warn!(class = class.as_str(), login_id, reason = e.code(), "Login rejected");
                return Err(e);
            }
        };

        // Open session
        let now = Utc::now();
        let lifetime = self.policies.for_class(class).lifetime;
        let session =
            Session::create(&self.pool, CreateSession::for_account(account, now, lifetime)).await?;

        let claims = SessionClaims::new(session.id, account.id, class, session.expires_at);
        let token = create_token(&claims, &self.secret)?;

        Account::update_last_login(&self.pool, account.id).await?;

        info!(
            account_id = %account.id,
            session_id = %session.id,
            class = class.as_str(),
            expires_at = %session.expires_at,
            "Login succeeded"
        );

        Ok(IssuedSession { token, session })
    }

    async fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        let claims = decode_token(token, &self.secret)?;

        let session = Session::find_by_id(&self.pool, claims.sid)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.account_id != claims.sub {
            warn!(session_id = %session.id, "Token subject does not match session");
            return Err(AuthError::SessionNotFound);
        }

        if session.is_expired_at(Utc::now()) {
            Session::delete(&self.pool, session.id).await?;
            debug!(session_id = %session.id, "Deleted expired session");
            return Err(AuthError::SessionExpired);
        }

        Ok(session)
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let claims = decode_token(token, &self.secret)?;

        if Session::delete(&self.pool, claims.sid).await? {
            info!(session_id = %claims.sid, account_id = %claims.sub, "Logged out");
        } else {
            debug!(session_id = %claims.sid, "Logout for unknown session");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membership::MembershipStatus;
    use uuid::Uuid;

    fn account_with(password: &str, status: AccountStatus) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            class: AccountClass::SeekingOrganization,
            login_id: "acme".to_string(),
            password_hash: hash_password(password).unwrap(),
            status,
            display_name: "Acme".to_string(),
            organization_name: Some("Acme Labs".to_string()),
            organization_type: Some("Start-up".to_string()),
            country: Some("India".to_string()),
            contact_email: None,
            contact_phone: None,
            membership_status: MembershipStatus::NotAMember,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn new_account(class: AccountClass) -> NewAccount {
        NewAccount {
            class,
            login_id: "acme".to_string(),
            password: "Welcome#2024".to_string(),
            display_name: "Acme".to_string(),
            organization_name: Some("Acme Labs".to_string()),
            organization_type: None,
            country: None,
            contact_email: Some("ops@acme.example".to_string()),
            contact_phone: None,
        }
    }

    #[test]
    fn test_check_credentials_order() {
        assert!(matches!(
            check_credentials(None, "anything"),
            Err(AuthError::AccountNotFound)
        ));

        // Wrong password is reported before the status
        let pending = account_with("Welcome#2024", AccountStatus::Pending);
        assert!(matches!(
            check_credentials(Some(&pending), "wrong"),
            Err(AuthError::InvalidPassword)
        ));
        assert!(matches!(
            check_credentials(Some(&pending), "Welcome#2024"),
            Err(AuthError::AccountPending)
        ));
    }

    #[test]
    fn test_check_credentials_status() {
        let inactive = account_with("pw", AccountStatus::Inactive);
        assert!(matches!(
            check_credentials(Some(&inactive), "pw"),
            Err(AuthError::AccountInactive)
        ));

        let rejected = account_with("pw", AccountStatus::Rejected);
        assert!(matches!(
            check_credentials(Some(&rejected), "pw"),
            Err(AuthError::AccountRejected)
        ));

        let active = account_with("pw", AccountStatus::Active);
        let checked = check_credentials(Some(&active), "pw").unwrap();
        assert_eq!(checked.id, active.id);
    }

    #[test]
    fn test_unknown_login_costs_a_password_verification() {
        let account = account_with("Welcome#2024", AccountStatus::Active);

        // Warm the dummy hash so only verification is timed
        let _ = check_credentials(None, "warm-up");

        let started = std::time::Instant::now();
        assert!(check_credentials(Some(&account), "wrong").is_err());
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        assert!(check_credentials(None, "wrong").is_err());
        let unknown_login = started.elapsed();

        assert!(
            unknown_login * 4 >= wrong_password,
            "unknown login took {:?}, wrong password {:?}",
            unknown_login,
            wrong_password
        );
    }

    #[test]
    fn test_default_policies() {
        let policies = SessionPolicies::default();

        let admin = policies.for_class(AccountClass::Administrator);
        assert_eq!(admin.lifetime, Duration::hours(8));
        assert_eq!(admin.registration, Registration::Closed);

        let org = policies.for_class(AccountClass::SeekingOrganization);
        assert_eq!(org.lifetime, Duration::hours(24));
        assert_eq!(org.registration, Registration::RequiresApproval);

        assert_eq!(
            policies.for_class(AccountClass::User).registration,
            Registration::Open
        );
    }

    #[test]
    fn test_policy_lifetime_override() {
        let policies = SessionPolicies::default().with_lifetime_hours(AccountClass::User, 2);

        assert_eq!(policies.for_class(AccountClass::User).lifetime, Duration::hours(2));
        assert_eq!(
            policies.for_class(AccountClass::SeekingOrganization).lifetime,
            Duration::hours(24)
        );
    }

    #[test]
    fn test_new_account_validation() {
        assert!(new_account(AccountClass::SeekingOrganization).validate().is_ok());

        let mut weak = new_account(AccountClass::User);
        weak.password = "password".to_string();
        let errors = weak.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let mut no_org = new_account(AccountClass::SeekingOrganization);
        no_org.organization_name = Some("  ".to_string());
        assert!(no_org.validate().is_err());

        // Field and organization errors are reported together
        let mut both = new_account(AccountClass::SeekingOrganization);
        both.password = "password".to_string();
        both.organization_name = None;
        let errors = both.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert!(errors.errors().contains_key("__all__"));

        // Users don't need an organization
        let mut user = new_account(AccountClass::User);
        user.organization_name = None;
        assert!(user.validate().is_ok());

        let mut bad_email = new_account(AccountClass::User);
        bad_email.contact_email = Some("not-an-email".to_string());
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::AccountNotFound.code(), "account_not_found");
        assert_eq!(AuthError::SessionExpired.code(), "session_expired");
        assert_eq!(
            AuthError::RegistrationClosed(AccountClass::Administrator).code(),
            "registration_closed"
        );
        assert!(AuthError::InvalidPassword.is_bad_credentials());
        assert!(!AuthError::AccountPending.is_bad_credentials());
    }

    #[test]
    fn test_new_account_password_not_serialized() {
        let json = serde_json::to_value(new_account(AccountClass::User)).unwrap();
        assert!(json.get("password").is_none());
    }
}
