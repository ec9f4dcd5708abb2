/// Master data model and database operations
///
/// Master data are the lookup tables administrators maintain: countries,
/// currencies, categories, departments, reward types, organization types,
/// engagement models, communication types, membership fees and pricing
/// tiers. All kinds share one table; kind-specific extras (a currency
/// symbol, a membership fee amount) live in the `attributes` JSON object.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE master_data (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind master_data_kind NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     code VARCHAR(50),
///     description TEXT,
///     parent_id UUID REFERENCES master_data(id) ON DELETE SET NULL,
///     attributes JSONB NOT NULL DEFAULT '{}',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX master_data_kind_name_key ON master_data (kind, LOWER(name));
/// CREATE UNIQUE INDEX master_data_kind_code_key ON master_data (kind, LOWER(code))
///     WHERE code IS NOT NULL;
/// ```
///
/// # Example
///
/// ```no_run
/// use marketdesk_shared::models::master_data::{CreateMasterRecord, MasterDataKind, MasterRecord};
/// use marketdesk_shared::db::pool::{create_pool, DatabaseConfig};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let rupee = MasterRecord::create(&pool, MasterDataKind::Currency, CreateMasterRecord {
///     name: "Indian Rupee".to_string(),
///     code: Some("INR".to_string()),
///     description: None,
///     parent_id: None,
///     attributes: json!({ "symbol": "₹" }),
///     is_active: true,
/// }).await?;
///
/// let currencies = MasterRecord::list(&pool, MasterDataKind::Currency, false).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::legacy::{ImportReport, RepairedPayload};

/// Kind of master data record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "master_data_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MasterDataKind {
    Country,
    Currency,
    Category,
    Department,
    RewardType,
    OrganizationType,
    EngagementModel,
    CommunicationType,
    MembershipFee,
    PricingTier,
}

impl MasterDataKind {
    /// All kinds, in dashboard order
    pub const ALL: [MasterDataKind; 10] = [
        MasterDataKind::Country,
        MasterDataKind::Currency,
        MasterDataKind::Category,
        MasterDataKind::Department,
        MasterDataKind::RewardType,
        MasterDataKind::OrganizationType,
        MasterDataKind::EngagementModel,
        MasterDataKind::CommunicationType,
        MasterDataKind::MembershipFee,
        MasterDataKind::PricingTier,
    ];

    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MasterDataKind::Country => "country",
            MasterDataKind::Currency => "currency",
            MasterDataKind::Category => "category",
            MasterDataKind::Department => "department",
            MasterDataKind::RewardType => "reward_type",
            MasterDataKind::OrganizationType => "organization_type",
            MasterDataKind::EngagementModel => "engagement_model",
            MasterDataKind::CommunicationType => "communication_type",
            MasterDataKind::MembershipFee => "membership_fee",
            MasterDataKind::PricingTier => "pricing_tier",
        }
    }

    /// URL path segment, e.g. `reward-types`
    pub fn slug(&self) -> &'static str {
        match self {
            MasterDataKind::Country => "countries",
            MasterDataKind::Currency => "currencies",
            MasterDataKind::Category => "categories",
            MasterDataKind::Department => "departments",
            MasterDataKind::RewardType => "reward-types",
            MasterDataKind::OrganizationType => "organization-types",
            MasterDataKind::EngagementModel => "engagement-models",
            MasterDataKind::CommunicationType => "communication-types",
            MasterDataKind::MembershipFee => "membership-fees",
            MasterDataKind::PricingTier => "pricing-tiers",
        }
    }

    /// Parses a URL path segment
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Whether records of this kind must carry a code (ISO country or currency code)
    pub fn requires_code(&self) -> bool {
        matches!(self, MasterDataKind::Country | MasterDataKind::Currency)
    }
}

impl std::fmt::Display for MasterDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Master data errors
#[derive(Error, Debug)]
pub enum MasterDataError {
    #[error("{0} records require a code")]
    MissingCode(MasterDataKind),

    #[error("attributes must be a JSON object")]
    AttributesNotObject,

    #[error("invalid attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("parent record {0} does not exist")]
    ParentNotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Master data record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MasterRecord {
    pub id: Uuid,
    pub kind: MasterDataKind,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,

    /// Related record, e.g. the country of a currency
    pub parent_id: Option<Uuid>,

    /// Kind-specific extras (always a JSON object)
    pub attributes: JsonValue,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a master data record
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMasterRecord {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[serde(default = "empty_attributes")]
    pub attributes: JsonValue,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn empty_attributes() -> JsonValue {
    JsonValue::Object(Map::new())
}

fn default_active() -> bool {
    true
}

impl CreateMasterRecord {
    /// Checks rules that depend on the kind
    ///
    /// Blank codes are normalized to None first.
    pub fn check_for_kind(&mut self, kind: MasterDataKind) -> Result<(), MasterDataError> {
        self.name = self.name.trim().to_string();
        self.code = non_blank(self.code.take());

        if kind.requires_code() && self.code.is_none() {
            return Err(MasterDataError::MissingCode(kind));
        }

        check_attributes(kind, &self.attributes)
    }
}

/// Input for updating a master data record
///
/// Only non-None fields are updated. `code`, `description` and `parent_id`
/// use `Some(None)` (an explicit `null`) to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateMasterRecord {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, with = "super::double_option")]
    #[validate(length(max = 50, message = "Code must be at most 50 characters"))]
    pub code: Option<Option<String>>,

    #[serde(default, with = "super::double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, with = "super::double_option")]
    pub parent_id: Option<Option<Uuid>>,

    pub attributes: Option<JsonValue>,

    pub is_active: Option<bool>,
}

impl UpdateMasterRecord {
    /// Checks rules that depend on the kind
    ///
    /// A blank code clears it, which kinds that require a code reject.
    pub fn check_for_kind(&mut self, kind: MasterDataKind) -> Result<(), MasterDataError> {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }

        if let Some(code) = self.code.take() {
            let code = non_blank(code);
            if code.is_none() && kind.requires_code() {
                return Err(MasterDataError::MissingCode(kind));
            }
            self.code = Some(code);
        }

        if let Some(description) = self.description.take() {
            self.description = Some(non_blank(description));
        }

        match &self.attributes {
            Some(attributes) => check_attributes(kind, attributes),
            None => Ok(()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_attributes(kind: MasterDataKind, attributes: &JsonValue) -> Result<(), MasterDataError> {
    let map = attributes
        .as_object()
        .ok_or(MasterDataError::AttributesNotObject)?;

    if kind == MasterDataKind::MembershipFee {
        if let Some(amount) = map.get("amount") {
            match amount.as_f64() {
                Some(value) if value >= 0.0 => {}
                _ => {
                    return Err(MasterDataError::InvalidAttribute {
                        name: "amount".to_string(),
                        reason: "must be a non-negative number".to_string(),
                    })
                }
            }
        }
    }

    Ok(())
}

/// Record shape of legacy exports
///
/// Unknown fields are kept as attributes; bookkeeping fields of the old
/// client are dropped.
#[derive(Debug, Deserialize)]
struct LegacyMasterRecord {
    name: String,

    #[serde(default, alias = "isoCode", alias = "currencyCode", alias = "countryCode")]
    code: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default = "default_active", alias = "isActive")]
    is_active: bool,

    #[serde(flatten)]
    extra: Map<String, JsonValue>,
}

const LEGACY_BOOKKEEPING_FIELDS: [&str; 5] = ["id", "createdAt", "updatedAt", "created_at", "updated_at"];

impl From<LegacyMasterRecord> for CreateMasterRecord {
    fn from(legacy: LegacyMasterRecord) -> Self {
        let mut extra = legacy.extra;
        for field in LEGACY_BOOKKEEPING_FIELDS {
            extra.remove(field);
        }

        Self {
            name: legacy.name,
            code: legacy.code,
            description: legacy.description,
            parent_id: None,
            attributes: JsonValue::Object(extra),
            is_active: legacy.is_active,
        }
    }
}

impl CreateMasterRecord {
    /// Converts one item of a legacy export, applying the kind's rules
    /// before validation
    fn from_import_item(kind: MasterDataKind, item: JsonValue) -> Result<Self, &'static str> {
        let legacy =
            serde_json::from_value::<LegacyMasterRecord>(item).map_err(|_| "unparsable")?;

        let mut data = CreateMasterRecord::from(legacy);
        data.check_for_kind(kind).map_err(|_| "violates kind rules")?;
        data.validate().map_err(|_| "invalid")?;

        Ok(data)
    }
}

/// Number of records per kind
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MasterDataKindCount {
    pub kind: MasterDataKind,
    pub count: i64,
}

const MASTER_COLUMNS: &str =
    "id, kind, name, code, description, parent_id, attributes, is_active, created_at, updated_at";

impl MasterRecord {
    /// Creates a record
    ///
    /// Call [`CreateMasterRecord::check_for_kind`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name or code is taken within the kind (`master_data_kind_name_key`,
    ///   `master_data_kind_code_key`)
    /// - The parent does not exist
    /// - Database connection fails
    pub async fn create(
        pool: &PgPool,
        kind: MasterDataKind,
        data: CreateMasterRecord,
    ) -> Result<Self, MasterDataError> {
        if let Some(parent_id) = data.parent_id {
            ensure_parent_exists(pool, parent_id).await?;
        }

        let query = format!(
            r#"
            INSERT INTO master_data (kind, name, code, description, parent_id, attributes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            MASTER_COLUMNS
        );

        let record = sqlx::query_as::<_, MasterRecord>(&query)
            .bind(kind)
            .bind(data.name)
            .bind(data.code)
            .bind(data.description)
            .bind(data.parent_id)
            .bind(data.attributes)
            .bind(data.is_active)
            .fetch_one(pool)
            .await?;

        Ok(record)
    }

    /// Finds a record of a kind by ID
    pub async fn find_by_id(
        pool: &PgPool,
        kind: MasterDataKind,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM master_data WHERE kind = $1 AND id = $2",
            MASTER_COLUMNS
        );

        sqlx::query_as::<_, MasterRecord>(&query)
            .bind(kind)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists records of a kind ordered by name
    pub async fn list(
        pool: &PgPool,
        kind: MasterDataKind,
        include_inactive: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM master_data
            WHERE kind = $1 AND ($2 OR is_active)
            ORDER BY LOWER(name), id
            "#,
            MASTER_COLUMNS
        );

        sqlx::query_as::<_, MasterRecord>(&query)
            .bind(kind)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Whether a record with this name exists in the kind (case-insensitive)
    pub async fn name_exists(
        pool: &PgPool,
        kind: MasterDataKind,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM master_data WHERE kind = $1 AND LOWER(name) = LOWER($2))",
        )
        .bind(kind)
        .bind(name.trim())
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Updates a record
    ///
    /// Only non-None fields in `data` are updated. Call
    /// [`UpdateMasterRecord::check_for_kind`] first.
    ///
    /// # Returns
    ///
    /// The updated record, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        kind: MasterDataKind,
        id: Uuid,
        data: UpdateMasterRecord,
    ) -> Result<Option<Self>, MasterDataError> {
        if let Some(Some(parent_id)) = data.parent_id {
            if parent_id == id {
                return Err(MasterDataError::InvalidAttribute {
                    name: "parent_id".to_string(),
                    reason: "a record cannot be its own parent".to_string(),
                });
            }
            ensure_parent_exists(pool, parent_id).await?;
        }

        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE master_data SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.code.is_some() {
            bind_count += 1;
            query.push_str(&format!(", code = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.parent_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", parent_id = ${}", bind_count));
        }
        if data.attributes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", attributes = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE kind = $1 AND id = $2 RETURNING {}",
            MASTER_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, MasterRecord>(&query).bind(kind).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(code) = data.code {
            q = q.bind(code);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(parent_id) = data.parent_id {
            q = q.bind(parent_id);
        }
        if let Some(attributes) = data.attributes {
            q = q.bind(attributes);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        Ok(q.fetch_optional(pool).await?)
    }

    /// Deletes a record
    ///
    /// Children referencing it keep existing with their parent cleared.
    pub async fn delete(pool: &PgPool, kind: MasterDataKind, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM master_data WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts records grouped by kind
    ///
    /// Kinds without records are omitted.
    pub async fn count_by_kind(pool: &PgPool) -> Result<Vec<MasterDataKindCount>, sqlx::Error> {
        sqlx::query_as::<_, MasterDataKindCount>(
            "SELECT kind, COUNT(*) AS count FROM master_data GROUP BY kind ORDER BY kind",
        )
        .fetch_all(pool)
        .await
    }

    /// Imports records of a kind from a repaired legacy payload
    ///
    /// Items that fail to parse, violate the kind's rules or collide with an
    /// existing name or code are skipped.
    pub async fn import(
        pool: &PgPool,
        kind: MasterDataKind,
        payload: RepairedPayload,
    ) -> Result<ImportReport, sqlx::Error> {
        let mut report = ImportReport::for_payload(&payload);

        for (index, item) in payload.items.into_iter().enumerate() {
            let data = match CreateMasterRecord::from_import_item(kind, item) {
                Ok(data) => data,
                Err(reason) => {
                    debug!(%kind, index, reason, "Skipping master record");
                    report.skipped += 1;
                    continue;
                }
            };

            if Self::name_exists(pool, kind, &data.name).await? {
                debug!(%kind, index, name = %data.name, "Skipping duplicate master record");
                report.skipped += 1;
                continue;
            }

            match Self::create(pool, kind, data).await {
                Ok(_) => report.imported += 1,
                Err(MasterDataError::Database(sqlx::Error::Database(db_err)))
                    if db_err.is_unique_violation() =>
                {
                    debug!(%kind, index, "Skipping master record with duplicate code");
                    report.skipped += 1;
                }
                Err(MasterDataError::Database(e)) => return Err(e),
                Err(_) => report.skipped += 1,
            }
        }

        info!(
            %kind,
            received = report.received,
            imported = report.imported,
            skipped = report.skipped,
            "Imported master data"
        );

        Ok(report)
    }
}

async fn ensure_parent_exists(pool: &PgPool, parent_id: Uuid) -> Result<(), MasterDataError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM master_data WHERE id = $1)")
        .bind(parent_id)
        .fetch_one(pool)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(MasterDataError::ParentNotFound(parent_id))
    }
}
