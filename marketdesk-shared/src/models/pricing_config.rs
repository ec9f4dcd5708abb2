/// Pricing configuration model and database operations
///
/// A pricing configuration maps (engagement model, country, organization
/// type, membership tier) to fees per billing frequency plus a member
/// discount. The table is a read-mostly lookup list consumed by
/// [`crate::pricing::resolve_pricing`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE pricing_configs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     engagement_model VARCHAR(100) NOT NULL,
///     country VARCHAR(100) NOT NULL DEFAULT '',
///     organization_type VARCHAR(100) NOT NULL,
///     membership_status membership_status NOT NULL DEFAULT 'not-a-member',
///     currency_code VARCHAR(10) NOT NULL DEFAULT 'USD',
///     monthly_fee DOUBLE PRECISION,
///     quarterly_fee DOUBLE PRECISION,
///     half_yearly_fee DOUBLE PRECISION,
///     annual_fee DOUBLE PRECISION,
///     discount_percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The (model, country, organization type, tier) tuple is expected to be
/// unique but is not constrained. Listings are ordered by
/// `(created_at, id)` so that the resolver's first-match rule picks the
/// oldest configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::membership::MembershipStatus;
use crate::legacy::{ImportReport, RepairedPayload};

/// Billing frequency of a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFrequency {
    Monthly,
    Quarterly,
    HalfYearly,
    Annual,
}

impl BillingFrequency {
    /// All billing frequencies, shortest first
    pub const ALL: [BillingFrequency; 4] = [
        BillingFrequency::Monthly,
        BillingFrequency::Quarterly,
        BillingFrequency::HalfYearly,
        BillingFrequency::Annual,
    ];
}

/// Pricing configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricingConfig {
    /// Unique ID
    pub id: Uuid,

    /// Canonical engagement model name, e.g. "Market Place"
    pub engagement_model: String,

    /// Country, or blank/"Global"/"All" for every country
    pub country: String,

    /// Organization type, or "All"
    pub organization_type: String,

    /// Membership tier this configuration prices
    pub membership_status: MembershipStatus,

    /// ISO currency code of the fees
    pub currency_code: String,

    pub monthly_fee: Option<f64>,
    pub quarterly_fee: Option<f64>,
    pub half_yearly_fee: Option<f64>,
    pub annual_fee: Option<f64>,

    /// Member discount in percent (0..=100)
    pub discount_percentage: f64,

    /// Inactive configurations are never offered to the resolver
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingConfig {
    /// Fee for a billing frequency, if configured
    pub fn fee(&self, frequency: BillingFrequency) -> Option<f64> {
        match frequency {
            BillingFrequency::Monthly => self.monthly_fee,
            BillingFrequency::Quarterly => self.quarterly_fee,
            BillingFrequency::HalfYearly => self.half_yearly_fee,
            BillingFrequency::Annual => self.annual_fee,
        }
    }
}

/// Input for creating a pricing configuration
///
/// Also accepts the camelCase field names used by legacy exports.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePricingConfig {
    #[serde(alias = "engagementModel")]
    #[validate(length(min = 1, max = 100, message = "Engagement model must be 1-100 characters"))]
    pub engagement_model: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: String,

    #[serde(alias = "organizationType")]
    #[validate(length(min = 1, max = 100, message = "Organization type must be 1-100 characters"))]
    pub organization_type: String,

    #[serde(default, alias = "membershipStatus")]
    pub membership_status: MembershipStatus,

    #[serde(default = "default_currency", alias = "currencyCode", alias = "currency")]
    #[validate(length(min = 1, max = 10, message = "Currency code must be 1-10 characters"))]
    pub currency_code: String,

    #[serde(default, alias = "monthlyFee")]
    #[validate(range(min = 0.0, message = "Fees cannot be negative"))]
    pub monthly_fee: Option<f64>,

    #[serde(default, alias = "quarterlyFee")]
    #[validate(range(min = 0.0, message = "Fees cannot be negative"))]
    pub quarterly_fee: Option<f64>,

    #[serde(default, alias = "halfYearlyFee")]
    #[validate(range(min = 0.0, message = "Fees cannot be negative"))]
    pub half_yearly_fee: Option<f64>,

    #[serde(default, alias = "annualFee")]
    #[validate(range(min = 0.0, message = "Fees cannot be negative"))]
    pub annual_fee: Option<f64>,

    #[serde(default, alias = "discountPercentage")]
    #[validate(range(min = 0.0, max = 100.0, message = "Discount must be between 0 and 100"))]
    pub discount_percentage: f64,

    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
}

impl CreatePricingConfig {
    /// Trims the lookup keys and uppercases the currency code
    ///
    /// Run before validation so that whitespace-only values are rejected.
    pub fn normalize(&mut self) {
        self.engagement_model = self.engagement_model.trim().to_string();
        self.country = self.country.trim().to_string();
        self.organization_type = self.organization_type.trim().to_string();
        self.currency_code = self.currency_code.trim().to_uppercase();
    }

    /// Parses, normalizes and validates one item of a legacy export
    fn from_import_item(item: serde_json::Value) -> Option<Self> {
        let mut data = serde_json::from_value::<Self>(item).ok()?;
        data.normalize();
        data.validate().ok()?;
        Some(data)
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_active() -> bool {
    true
}

/// Input for updating a pricing configuration
///
/// Only non-None fields are updated. Fee fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePricingConfig {
    #[validate(length(min = 1, max = 100, message = "Engagement model must be 1-100 characters"))]
    pub engagement_model: Option<String>,

    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Organization type must be 1-100 characters"))]
    pub organization_type: Option<String>,

    pub membership_status: Option<MembershipStatus>,

    #[validate(length(min = 1, max = 10, message = "Currency code must be 1-10 characters"))]
    pub currency_code: Option<String>,

    #[serde(default, with = "super::double_option")]
    pub monthly_fee: Option<Option<f64>>,

    #[serde(default, with = "super::double_option")]
    pub quarterly_fee: Option<Option<f64>>,

    #[serde(default, with = "super::double_option")]
    pub half_yearly_fee: Option<Option<f64>>,

    #[serde(default, with = "super::double_option")]
    pub annual_fee: Option<Option<f64>>,

    #[validate(range(min = 0.0, max = 100.0, message = "Discount must be between 0 and 100"))]
    pub discount_percentage: Option<f64>,

    pub is_active: Option<bool>,
}

impl UpdatePricingConfig {
    /// Trims the lookup keys and uppercases the currency code
    pub fn normalize(&mut self) {
        for value in [
            &mut self.engagement_model,
            &mut self.country,
            &mut self.organization_type,
        ]
        .into_iter()
        .flatten()
        {
            *value = value.trim().to_string();
        }

        if let Some(currency) = self.currency_code.as_mut() {
            *currency = currency.trim().to_uppercase();
        }
    }

    /// Whether any fee update is negative
    pub fn has_negative_fee(&self) -> bool {
        [
            self.monthly_fee,
            self.quarterly_fee,
            self.half_yearly_fee,
            self.annual_fee,
        ]
        .iter()
        .any(|fee| matches!(fee, Some(Some(v)) if *v < 0.0))
    }
}

const PRICING_COLUMNS: &str = "id, engagement_model, country, organization_type, membership_status, \
     currency_code, monthly_fee, quarterly_fee, half_yearly_fee, annual_fee, \
     discount_percentage, is_active, created_at, updated_at";

impl PricingConfig {
    /// Creates a pricing configuration
    pub async fn create(pool: &PgPool, mut data: CreatePricingConfig) -> Result<Self, sqlx::Error> {
        data.normalize();

        let query = format!(
            r#"
            INSERT INTO pricing_configs (engagement_model, country, organization_type,
                                         membership_status, currency_code, monthly_fee,
                                         quarterly_fee, half_yearly_fee, annual_fee,
                                         discount_percentage, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PRICING_COLUMNS
        );

        sqlx::query_as::<_, PricingConfig>(&query)
            .bind(data.engagement_model)
            .bind(data.country)
            .bind(data.organization_type)
            .bind(data.membership_status)
            .bind(data.currency_code)
            .bind(data.monthly_fee)
            .bind(data.quarterly_fee)
            .bind(data.half_yearly_fee)
            .bind(data.annual_fee)
            .bind(data.discount_percentage)
            .bind(data.is_active)
            .fetch_one(pool)
            .await
    }

    /// Finds a pricing configuration by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM pricing_configs WHERE id = $1", PRICING_COLUMNS);

        sqlx::query_as::<_, PricingConfig>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all pricing configurations, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM pricing_configs ORDER BY created_at, id",
            PRICING_COLUMNS
        );

        sqlx::query_as::<_, PricingConfig>(&query)
            .fetch_all(pool)
            .await
    }

    /// Lists active pricing configurations, oldest first
    ///
    /// This is the input of the pricing resolver.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM pricing_configs WHERE is_active ORDER BY created_at, id",
            PRICING_COLUMNS
        );

        sqlx::query_as::<_, PricingConfig>(&query)
            .fetch_all(pool)
            .await
    }

    /// Updates a pricing configuration
    ///
    /// Only non-None fields in `data` are updated.
    ///
    /// # Returns
    ///
    /// The updated configuration, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        mut data: UpdatePricingConfig,
    ) -> Result<Option<Self>, sqlx::Error> {
        data.normalize();

        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE pricing_configs SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |query: &mut String, column: &str| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.engagement_model.is_some() {
            push(&mut query, "engagement_model");
        }
        if data.country.is_some() {
            push(&mut query, "country");
        }
        if data.organization_type.is_some() {
            push(&mut query, "organization_type");
        }
        if data.membership_status.is_some() {
            push(&mut query, "membership_status");
        }
        if data.currency_code.is_some() {
            push(&mut query, "currency_code");
        }
        if data.monthly_fee.is_some() {
            push(&mut query, "monthly_fee");
        }
        if data.quarterly_fee.is_some() {
            push(&mut query, "quarterly_fee");
        }
        if data.half_yearly_fee.is_some() {
            push(&mut query, "half_yearly_fee");
        }
        if data.annual_fee.is_some() {
            push(&mut query, "annual_fee");
        }
        if data.discount_percentage.is_some() {
            push(&mut query, "discount_percentage");
        }
        if data.is_active.is_some() {
            push(&mut query, "is_active");
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", PRICING_COLUMNS));

        let mut q = sqlx::query_as::<_, PricingConfig>(&query).bind(id);

        if let Some(model) = data.engagement_model {
            q = q.bind(model);
        }
        if let Some(country) = data.country {
            q = q.bind(country);
        }
        if let Some(org_type) = data.organization_type {
            q = q.bind(org_type);
        }
        if let Some(status) = data.membership_status {
            q = q.bind(status);
        }
        if let Some(currency) = data.currency_code {
            q = q.bind(currency);
        }
        if let Some(fee) = data.monthly_fee {
            q = q.bind(fee);
        }
        if let Some(fee) = data.quarterly_fee {
            q = q.bind(fee);
        }
        if let Some(fee) = data.half_yearly_fee {
            q = q.bind(fee);
        }
        if let Some(fee) = data.annual_fee {
            q = q.bind(fee);
        }
        if let Some(discount) = data.discount_percentage {
            q = q.bind(discount);
        }
        if let Some(active) = data.is_active {
            q = q.bind(active);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a pricing configuration
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pricing_configs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Imports pricing configurations from a repaired legacy payload
    ///
    /// Items that don't deserialize or fail validation are skipped.
    pub async fn import(
        pool: &PgPool,
        payload: RepairedPayload,
    ) -> Result<ImportReport, sqlx::Error> {
        let mut report = ImportReport::for_payload(&payload);

        for (index, item) in payload.items.into_iter().enumerate() {
            let Some(data) = CreatePricingConfig::from_import_item(item) else {
                debug!(index, "Skipping invalid pricing configuration");
                report.skipped += 1;
                continue;
            };

            Self::create(pool, data).await?;
            report.imported += 1;
        }

        info!(
            received = report.received,
            imported = report.imported,
            skipped = report.skipped,
            "Imported pricing configurations"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_accepts_legacy_field_names() {
        let data: CreatePricingConfig = serde_json::from_value(json!({
            "engagementModel": "Market Place",
            "country": "India",
            "organizationType": "Start-up",
            "membershipStatus": "member_paid",
            "monthlyFee": 100.0,
            "discountPercentage": 20
        }))
        .unwrap();

        assert_eq!(data.engagement_model, "Market Place");
        assert_eq!(data.membership_status, MembershipStatus::MemberPaid);
        assert_eq!(data.monthly_fee, Some(100.0));
        assert_eq!(data.discount_percentage, 20.0);
        assert_eq!(data.currency_code, "USD");
        assert!(data.is_active);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_import_item_rejects_blank_keys() {
        let item = json!({
            "engagementModel": "  Market Place ",
            "organizationType": "Start-up",
            "currency": " inr "
        });
        let data = CreatePricingConfig::from_import_item(item).expect("item should import");
        assert_eq!(data.engagement_model, "Market Place");
        assert_eq!(data.currency_code, "INR");

        let blank_model = json!({ "engagementModel": "   ", "organizationType": "Start-up" });
        assert!(CreatePricingConfig::from_import_item(blank_model).is_none());

        let blank_type = json!({ "engagementModel": "Aggregator", "organizationType": " " });
        assert!(CreatePricingConfig::from_import_item(blank_type).is_none());

        assert!(CreatePricingConfig::from_import_item(json!("not an object")).is_none());
    }

    #[test]
    fn test_create_defaults() {
        let data: CreatePricingConfig = serde_json::from_value(json!({
            "engagement_model": "Aggregator",
            "organization_type": "All"
        }))
        .unwrap();

        assert_eq!(data.country, "");
        assert_eq!(data.membership_status, MembershipStatus::NotAMember);
        assert_eq!(data.discount_percentage, 0.0);
    }

    #[test]
    fn test_create_validation() {
        let data: CreatePricingConfig = serde_json::from_value(json!({
            "engagement_model": "",
            "organization_type": "Start-up",
            "discount_percentage": 120.0,
            "annual_fee": -5.0
        }))
        .unwrap();

        let errors = data.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("engagement_model"));
        assert!(fields.contains_key("discount_percentage"));
        assert!(fields.contains_key("annual_fee"));
    }

    #[test]
    fn test_update_normalize_exposes_blank_keys() {
        let mut update: UpdatePricingConfig = serde_json::from_value(json!({
            "engagement_model": "  ",
            "country": " India ",
            "currency_code": "eur"
        }))
        .unwrap();

        update.normalize();
        assert_eq!(update.country.as_deref(), Some("India"));
        assert_eq!(update.currency_code.as_deref(), Some("EUR"));
        assert!(update.validate().unwrap_err().field_errors().contains_key("engagement_model"));
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: UpdatePricingConfig =
            serde_json::from_value(json!({ "monthly_fee": null, "annual_fee": 900.0 })).unwrap();

        assert_eq!(update.monthly_fee, Some(None));
        assert_eq!(update.annual_fee, Some(Some(900.0)));
        assert_eq!(update.quarterly_fee, None);
        assert!(!update.has_negative_fee());

        let negative: UpdatePricingConfig =
            serde_json::from_value(json!({ "quarterly_fee": -1.0 })).unwrap();
        assert!(negative.has_negative_fee());
    }

    #[test]
    fn test_fee_by_frequency() {
        let now = Utc::now();
        let config = PricingConfig {
            id: Uuid::new_v4(),
            engagement_model: "Market Place".to_string(),
            country: "India".to_string(),
            organization_type: "Start-up".to_string(),
            membership_status: MembershipStatus::NotAMember,
            currency_code: "INR".to_string(),
            monthly_fee: Some(10.0),
            quarterly_fee: None,
            half_yearly_fee: Some(50.0),
            annual_fee: Some(90.0),
            discount_percentage: 0.0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(config.fee(BillingFrequency::Monthly), Some(10.0));
        assert_eq!(config.fee(BillingFrequency::Quarterly), None);
        assert_eq!(config.fee(BillingFrequency::HalfYearly), Some(50.0));
        assert_eq!(config.fee(BillingFrequency::Annual), Some(90.0));
    }
}
