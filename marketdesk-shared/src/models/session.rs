/// Login session model and database operations
///
/// A session is minted from an account at login time and carries a
/// denormalized copy of the organization fields so that request handling
/// (dashboards, pricing defaults) does not need to reload the account.
///
/// Expiry is absolute: `expires_at` is fixed at login and never extended.
/// Sessions are deleted on logout, on the first request after expiry, and by
/// the periodic sweeper in `marketdesk-worker`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     account_class account_class NOT NULL,
///     display_name VARCHAR(255) NOT NULL,
///     organization_name VARCHAR(255),
///     organization_type VARCHAR(100),
///     country VARCHAR(100),
///     membership_status membership_status NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::account::{Account, AccountClass};
use super::membership::MembershipStatus;

/// Session record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Session ID (also embedded in the session token)
    pub id: Uuid,

    /// Account this session belongs to
    pub account_id: Uuid,

    /// Class of the account at login time
    pub account_class: AccountClass,

    /// Denormalized account display name
    pub display_name: String,

    /// Denormalized organization name
    pub organization_name: Option<String>,

    /// Denormalized organization type
    pub organization_type: Option<String>,

    /// Denormalized country
    pub country: Option<String>,

    /// Membership status at login time
    pub membership_status: MembershipStatus,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// Input for creating a session
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub account_id: Uuid,
    pub account_class: AccountClass,
    pub display_name: String,
    pub organization_name: Option<String>,
    pub organization_type: Option<String>,
    pub country: Option<String>,
    pub membership_status: MembershipStatus,
    pub expires_at: DateTime<Utc>,
}

impl CreateSession {
    /// Builds session input from an account, expiring `lifetime` after `now`
    pub fn for_account(account: &Account, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            account_id: account.id,
            account_class: account.class,
            display_name: account.display_name.clone(),
            organization_name: account.organization_name.clone(),
            organization_type: account.organization_type.clone(),
            country: account.country.clone(),
            membership_status: account.membership_status,
            expires_at: now + lifetime,
        }
    }
}

const SESSION_COLUMNS: &str = "id, account_id, account_class, display_name, organization_name, \
     organization_type, country, membership_status, created_at, expires_at";

impl Session {
    /// Whether the session has expired at `now`
    ///
    /// A session is expired from the instant `expires_at` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, None once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_expired_at(now) {
            None
        } else {
            Some(self.expires_at - now)
        }
    }

    /// Creates a session row
    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO sessions (account_id, account_class, display_name, organization_name,
                                  organization_type, country, membership_status, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        sqlx::query_as::<_, Session>(&query)
            .bind(data.account_id)
            .bind(data.account_class)
            .bind(data.display_name)
            .bind(data.organization_name)
            .bind(data.organization_type)
            .bind(data.country)
            .bind(data.membership_status)
            .bind(data.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Finds a session by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);

        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a session
    ///
    /// # Returns
    ///
    /// True if a session was deleted
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every session of an account
    ///
    /// Used when an account stops being active.
    ///
    /// # Returns
    ///
    /// Number of sessions deleted
    pub async fn delete_for_account(pool: &PgPool, account_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = $1")
            .bind(account_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes all sessions that expired at or before `now`
    ///
    /// # Returns
    ///
    /// Number of sessions deleted
    pub async fn delete_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
