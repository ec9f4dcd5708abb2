/// Engagement pricing resolution
///
/// Finds the pricing configuration that applies to an organization and
/// adjusts it for the organization's membership. Matching runs most
/// specific first; within a tier the first configuration in slice order
/// wins (callers pass configurations ordered by `(created_at, id)`):
///
/// | Tier                 | Model | Country                        | Org type        | Membership |
/// |----------------------|-------|--------------------------------|-----------------|------------|
/// | `Exact`              | =     | =                              | =               | =          |
/// | `Wildcard`           | =     | = or blank / "Global" / "All"  | = or "All"      | =          |
/// | `IgnoringMembership` | =     | =                              | =               | any        |
/// | `ModelOnly`          | =     | any                            | any             | not-a-member first, then any |
///
/// Text comparisons ignore case and surrounding whitespace, and the
/// engagement model is first mapped through [`canonical_engagement_model`].
///
/// The returned configuration carries the caller's membership tier, and
/// non-members always get a zero discount.
///
/// # Example
///
/// ```
/// use marketdesk_shared::pricing::{resolve_pricing, PricingQuery};
///
/// let query = PricingQuery::new("marketplace", "member_paid", "India", "Start-up");
/// assert!(resolve_pricing(&query, &[]).is_none());
/// ```

use serde::{Deserialize, Serialize};

use crate::models::membership::MembershipStatus;
use crate::models::pricing_config::{BillingFrequency, PricingConfig};

/// Country values that match every country in the wildcard tier
const WILDCARD_COUNTRIES: [&str; 3] = ["", "global", "all"];

/// Organization type value that matches every type in the wildcard tier
const WILDCARD_ORGANIZATION_TYPE: &str = "all";

/// Maps free-text engagement model names to their canonical spelling
///
/// Unknown names are returned trimmed.
///
/// ```
/// use marketdesk_shared::pricing::canonical_engagement_model;
///
/// assert_eq!(canonical_engagement_model(" market_place "), "Market Place");
/// assert_eq!(canonical_engagement_model("Aggregation"), "Aggregator");
/// assert_eq!(canonical_engagement_model(" Consulting "), "Consulting");
/// ```
pub fn canonical_engagement_model(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.to_lowercase().as_str() {
        "marketplace" | "market place" | "market-place" | "market_place" => "Market Place".to_string(),
        "aggregator" | "aggregation" => "Aggregator".to_string(),
        _ => trimmed.to_string(),
    }
}

fn same(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn is_wildcard_country(country: &str) -> bool {
    WILDCARD_COUNTRIES.iter().any(|wildcard| same(country, wildcard))
}

fn country_matches(config: &PricingConfig, query: &PricingQuery) -> bool {
    same(&config.country, &query.country)
}

fn org_type_matches(config: &PricingConfig, query: &PricingQuery) -> bool {
    same(&config.organization_type, &query.organization_type)
}

/// Pricing lookup input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingQuery {
    /// Engagement model, free text
    pub engagement_model: String,

    /// Caller's membership status as stored, e.g. `"member_paid"`
    pub membership_status: String,

    pub country: String,

    pub organization_type: String,
}

impl PricingQuery {
    pub fn new(
        engagement_model: impl Into<String>,
        membership_status: impl Into<String>,
        country: impl Into<String>,
        organization_type: impl Into<String>,
    ) -> Self {
        Self {
            engagement_model: engagement_model.into(),
            membership_status: membership_status.into(),
            country: country.into(),
            organization_type: organization_type.into(),
        }
    }

    /// Pricing tier derived from the caller's membership status
    pub fn tier(&self) -> MembershipStatus {
        MembershipStatus::from_caller(&self.membership_status)
    }
}

/// Fallback tier that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Wildcard,
    IgnoringMembership,
    ModelOnly,
}

/// Resolved pricing for a caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPricing {
    /// Matched configuration, adjusted to the caller's membership
    pub config: PricingConfig,

    /// How specific the match was
    pub match_tier: MatchTier,
}

/// Fee of one billing frequency before and after discount
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeQuote {
    pub frequency: BillingFrequency,
    pub fee: f64,
    pub discounted_fee: f64,
}

impl ResolvedPricing {
    /// Fee after the member discount, rounded to two decimals
    ///
    /// None when the configuration has no fee for the frequency.
    pub fn discounted_fee(&self, frequency: BillingFrequency) -> Option<f64> {
        let fee = self.config.fee(frequency)?;
        let discounted = fee * (1.0 - self.config.discount_percentage / 100.0);
        Some((discounted * 100.0).round() / 100.0)
    }

    /// Quotes for every configured billing frequency
    pub fn quotes(&self) -> Vec<FeeQuote> {
        BillingFrequency::ALL
            .into_iter()
            .filter_map(|frequency| {
                Some(FeeQuote {
                    frequency,
                    fee: self.config.fee(frequency)?,
                    discounted_fee: self.discounted_fee(frequency)?,
                })
            })
            .collect()
    }
}

/// Resolves the pricing configuration that applies to `query`
///
/// Returns None when no configuration exists for the engagement model.
pub fn resolve_pricing(query: &PricingQuery, configs: &[PricingConfig]) -> Option<ResolvedPricing> {
    let model = canonical_engagement_model(&query.engagement_model);
    let tier = query.tier();

    let for_model: Vec<&PricingConfig> = configs
        .iter()
        .filter(|c| same(&canonical_engagement_model(&c.engagement_model), &model))
        .collect();

    let exact = || {
        for_model.iter().find(|c| {
            c.membership_status == tier && country_matches(c, query) && org_type_matches(c, query)
        })
    };

    let wildcard = || {
        for_model.iter().find(|c| {
            c.membership_status == tier
                && (country_matches(c, query) || is_wildcard_country(&c.country))
                && (org_type_matches(c, query)
                    || same(&c.organization_type, WILDCARD_ORGANIZATION_TYPE))
        })
    };

    let ignoring_membership = || {
        for_model
            .iter()
            .find(|c| country_matches(c, query) && org_type_matches(c, query))
    };

    let model_only = || {
        for_model
            .iter()
            .find(|c| c.membership_status == MembershipStatus::NotAMember)
            .or_else(|| for_model.first())
    };

    let (matched, match_tier) = exact()
        .map(|c| (c, MatchTier::Exact))
        .or_else(|| wildcard().map(|c| (c, MatchTier::Wildcard)))
        .or_else(|| ignoring_membership().map(|c| (c, MatchTier::IgnoringMembership)))
        .or_else(|| model_only().map(|c| (c, MatchTier::ModelOnly)))?;

    let mut config = (*matched).clone();
    config.membership_status = tier;
    if !tier.is_paid_member() {
        config.discount_percentage = 0.0;
    }

    Some(ResolvedPricing { config, match_tier })
}
