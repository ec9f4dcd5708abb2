/// Account model and database operations
///
/// An account is anybody who can log in: platform administrators,
/// solution-seeking organizations and generic users. All three classes share
/// one table and one authentication path; the class decides session lifetime
/// and registration rules (see [`crate::auth::provider::SessionPolicies`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     class account_class NOT NULL,
///     login_id VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     status account_status NOT NULL DEFAULT 'active',
///     display_name VARCHAR(255) NOT NULL,
///     organization_name VARCHAR(255),
///     organization_type VARCHAR(100),
///     country VARCHAR(100),
///     contact_email VARCHAR(255),
///     contact_phone VARCHAR(50),
///     membership_status membership_status NOT NULL DEFAULT 'not-a-member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CONSTRAINT accounts_class_login_id_key UNIQUE (class, login_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use marketdesk_shared::models::account::{Account, AccountClass, AccountStatus, CreateAccount};
/// use marketdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let account = Account::create(&pool, CreateAccount {
///     class: AccountClass::SeekingOrganization,
///     login_id: "acme-innovation".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     status: AccountStatus::Pending,
///     display_name: "Priya Raman".to_string(),
///     organization_name: Some("Acme Innovation Labs".to_string()),
///     organization_type: Some("Start-up".to_string()),
///     country: Some("India".to_string()),
///     contact_email: Some("priya@acme.example".to_string()),
///     contact_phone: None,
/// }).await?;
///
/// let found = Account::find_by_login(&pool, AccountClass::SeekingOrganization, "ACME-Innovation").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::MembershipStatus;

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_class", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    /// Platform administrator (manages master data, pricing and accounts)
    Administrator,

    /// Organization looking for solutions to its innovation challenges
    SeekingOrganization,

    /// Generic platform user
    User,
}

impl AccountClass {
    /// All account classes
    pub const ALL: [AccountClass; 3] = [
        AccountClass::Administrator,
        AccountClass::SeekingOrganization,
        AccountClass::User,
    ];

    /// Converts class to string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Administrator => "administrator",
            AccountClass::SeekingOrganization => "seeking_organization",
            AccountClass::User => "user",
        }
    }

    /// Parses class from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "administrator" => Some(AccountClass::Administrator),
            "seeking_organization" => Some(AccountClass::SeekingOrganization),
            "user" => Some(AccountClass::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an account
///
/// Only `Active` accounts may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account can log in
    Active,

    /// Waiting for administrator approval
    Pending,

    /// Disabled by an administrator
    Inactive,

    /// Registration was rejected
    Rejected,
}

impl AccountStatus {
    /// Converts status to string
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Pending => "pending",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Rejected => "rejected",
        }
    }
}

/// Account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Account class
    pub class: AccountClass,

    /// Login identifier, trimmed and lowercased
    ///
    /// Unique within a class
    pub login_id: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Lifecycle status
    pub status: AccountStatus,

    /// Name shown on dashboards
    pub display_name: String,

    /// Organization name (required for seeking organizations)
    pub organization_name: Option<String>,

    /// Organization type, e.g. "Start-up"
    pub organization_type: Option<String>,

    /// Country of the organization
    pub country: Option<String>,

    /// Contact e-mail address
    pub contact_email: Option<String>,

    /// Contact phone number
    pub contact_phone: Option<String>,

    /// Paid membership status
    pub membership_status: MembershipStatus,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the account last logged in
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating an account
///
/// `password_hash` must already be an Argon2id hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub class: AccountClass,
    pub login_id: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub display_name: String,
    pub organization_name: Option<String>,
    pub organization_type: Option<String>,
    pub country: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

/// Number of accounts per class
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountClassCount {
    pub class: AccountClass,
    pub count: i64,
}

/// Normalizes a login identifier for storage and lookup
///
/// # Example
///
/// ```
/// use marketdesk_shared::models::account::normalize_login_id;
///
/// assert_eq!(normalize_login_id("  Admin@Example.COM "), "admin@example.com");
/// ```
pub fn normalize_login_id(login_id: &str) -> String {
    login_id.trim().to_lowercase()
}

const ACCOUNT_COLUMNS: &str = "id, class, login_id, password_hash, status, display_name, \
     organization_name, organization_type, country, contact_email, contact_phone, \
     membership_status, created_at, updated_at, last_login_at";

impl Account {
    /// Creates a new account
    ///
    /// The login identifier is normalized before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The login ID is already taken within the class (`accounts_class_login_id_key`)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO accounts (class, login_id, password_hash, status, display_name,
                                  organization_name, organization_type, country,
                                  contact_email, contact_phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(data.class)
            .bind(normalize_login_id(&data.login_id))
            .bind(data.password_hash)
            .bind(data.status)
            .bind(data.display_name)
            .bind(data.organization_name)
            .bind(data.organization_type)
            .bind(data.country)
            .bind(data.contact_email)
            .bind(data.contact_phone)
            .fetch_one(pool)
            .await?;

        Ok(account)
    }

    /// Finds an account by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an account by class and login identifier
    ///
    /// Lookup is case-insensitive and ignores surrounding whitespace.
    pub async fn find_by_login(
        pool: &PgPool,
        class: AccountClass,
        login_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM accounts WHERE class = $1 AND login_id = $2",
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(class)
            .bind(normalize_login_id(login_id))
            .fetch_optional(pool)
            .await
    }

    /// Lists accounts, optionally restricted to one class
    ///
    /// Ordered by creation date (newest first).
    pub async fn list(
        pool: &PgPool,
        class: Option<AccountClass>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM accounts
            WHERE ($1::account_class IS NULL OR class = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(class)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Sets the lifecycle status of an account
    ///
    /// # Returns
    ///
    /// The updated account, or None if it doesn't exist
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE accounts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Sets the paid membership status of an account
    pub async fn update_membership_status(
        pool: &PgPool,
        id: Uuid,
        membership_status: MembershipStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE accounts SET membership_status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(membership_status)
            .fetch_optional(pool)
            .await
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts accounts grouped by class
    ///
    /// Classes without accounts are omitted.
    pub async fn count_by_class(pool: &PgPool) -> Result<Vec<AccountClassCount>, sqlx::Error> {
        sqlx::query_as::<_, AccountClassCount>(
            "SELECT class, COUNT(*) AS count FROM accounts GROUP BY class ORDER BY class",
        )
        .fetch_all(pool)
        .await
    }

    /// Counts accounts of one class in one status
    pub async fn count_with_status(
        pool: &PgPool,
        class: AccountClass,
        status: AccountStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE class = $1 AND status = $2")
                .bind(class)
                .bind(status)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
