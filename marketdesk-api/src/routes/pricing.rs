/// Engagement pricing endpoints
///
/// # Endpoints
///
/// - `GET|POST /v1/pricing/configs` - List or create configurations (admin)
/// - `GET|PUT|DELETE /v1/pricing/configs/:id` - Manage one configuration (admin)
/// - `POST /v1/pricing/configs/import` - Import a legacy export (admin)
/// - `POST /v1/pricing/resolve` - Resolve the pricing that applies to a caller

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use marketdesk_shared::{
    auth::middleware::AuthContext,
    legacy::{self, ImportReport},
    models::pricing_config::{CreatePricingConfig, PricingConfig, UpdatePricingConfig},
    pricing::{resolve_pricing, FeeQuote, PricingQuery, ResolvedPricing},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Shown when no configuration exists for the engagement model
pub const NO_PRICING_MESSAGE: &str =
    "No pricing is configured for this engagement model. Please contact the administrator.";

/// Pricing lookup request
///
/// Omitted fields default from the caller's session. Only administrators
/// may price for a membership status other than their own.
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveRequest {
    #[serde(alias = "engagementModel")]
    #[validate(length(min = 1, message = "Engagement model is required"))]
    pub engagement_model: String,

    #[serde(default, alias = "membershipStatus")]
    pub membership_status: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default, alias = "organizationType")]
    pub organization_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// Matched configuration, None when nothing applies
    pub pricing: Option<ResolvedPricing>,

    /// Fees per billing frequency after discount
    pub quotes: Vec<FeeQuote>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResolveRequest {
    /// Fills omitted fields from the caller's session
    pub fn into_query(self, auth: &AuthContext) -> PricingQuery {
        let session_status = auth.membership_status.as_str().to_string();
        let membership_status = match self.membership_status {
            Some(status) if auth.is_admin() => status,
            _ => session_status,
        };

        PricingQuery::new(
            self.engagement_model,
            membership_status,
            self.country.or_else(|| auth.country.clone()).unwrap_or_default(),
            self.organization_type
                .or_else(|| auth.organization_type.clone())
                .unwrap_or_default(),
        )
    }
}

fn config_not_found() -> ApiError {
    ApiError::NotFound("Pricing configuration not found".to_string())
}

pub async fn list_configs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PricingConfig>>> {
    auth.require_admin()?;

    Ok(Json(PricingConfig::list(&state.db).await?))
}

pub async fn get_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PricingConfig>> {
    auth.require_admin()?;

    let config = PricingConfig::find_by_id(&state.db, id)
        .await?
        .ok_or_else(config_not_found)?;

    Ok(Json(config))
}

pub async fn create_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(mut req): Json<CreatePricingConfig>,
) -> ApiResult<(StatusCode, Json<PricingConfig>)> {
    auth.require_admin()?;
    req.normalize();
    req.validate()?;

    let config = PricingConfig::create(&state.db, req).await?;

    tracing::info!(
        config_id = %config.id,
        engagement_model = %config.engagement_model,
        "Pricing configuration created"
    );

    Ok((StatusCode::CREATED, Json(config)))
}

pub async fn update_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(mut req): Json<UpdatePricingConfig>,
) -> ApiResult<Json<PricingConfig>> {
    auth.require_admin()?;
    req.normalize();
    req.validate()?;

    if req.has_negative_fee() {
        return Err(ApiError::invalid_field("fees", "Fees cannot be negative"));
    }

    let config = PricingConfig::update(&state.db, id, req)
        .await?
        .ok_or_else(config_not_found)?;

    tracing::info!(config_id = %config.id, "Pricing configuration updated");

    Ok(Json(config))
}

pub async fn delete_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;

    if !PricingConfig::delete(&state.db, id).await? {
        return Err(config_not_found());
    }

    tracing::info!(config_id = %id, "Pricing configuration deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Imports a legacy pricing export
pub async fn import_configs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: String,
) -> ApiResult<Json<ImportReport>> {
    auth.require_admin()?;

    let payload = legacy::repair(&body);
    let report = PricingConfig::import(&state.db, payload).await?;

    Ok(Json(report))
}

/// Resolves the pricing that applies to the caller
///
/// A missing configuration is not an error: the response carries no
/// pricing and a message asking the caller to contact the administrator.
pub async fn resolve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<Json<ResolveResponse>> {
    req.validate()?;

    let query = req.into_query(&auth);
    let configs = PricingConfig::list_active(&state.db).await?;

    let Some(resolved) = resolve_pricing(&query, &configs) else {
        tracing::info!(
            engagement_model = %query.engagement_model,
            country = %query.country,
            organization_type = %query.organization_type,
            "No pricing configuration matched"
        );

        return Ok(Json(ResolveResponse {
            pricing: None,
            quotes: Vec::new(),
            message: Some(NO_PRICING_MESSAGE.to_string()),
        }));
    };

    tracing::debug!(
        config_id = %resolved.config.id,
        match_tier = ?resolved.match_tier,
        "Pricing resolved"
    );

    Ok(Json(ResolveResponse {
        quotes: resolved.quotes(),
        pricing: Some(resolved),
        message: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marketdesk_shared::models::account::AccountClass;
    use marketdesk_shared::models::membership::MembershipStatus;

    fn context(class: AccountClass, membership_status: MembershipStatus) -> AuthContext {
        AuthContext {
            session_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            class,
            display_name: "Caller".to_string(),
            organization_name: Some("Acme".to_string()),
            organization_type: Some("Start-up".to_string()),
            country: Some("India".to_string()),
            membership_status,
            expires_at: Utc::now(),
        }
    }

    fn request(membership_status: Option<&str>) -> ResolveRequest {
        ResolveRequest {
            engagement_model: "Market Place".to_string(),
            membership_status: membership_status.map(str::to_string),
            country: None,
            organization_type: None,
        }
    }

    #[test]
    fn test_missing_fields_default_from_session() {
        let auth = context(AccountClass::SeekingOrganization, MembershipStatus::MemberPaid);
        let query = request(None).into_query(&auth);

        assert_eq!(query.membership_status, "member_paid");
        assert_eq!(query.country, "India");
        assert_eq!(query.organization_type, "Start-up");
    }

    #[test]
    fn test_only_admins_override_membership() {
        let organization = context(AccountClass::SeekingOrganization, MembershipStatus::NotAMember);
        let query = request(Some("member_paid")).into_query(&organization);
        assert_eq!(query.membership_status, "not-a-member");

        let admin = context(AccountClass::Administrator, MembershipStatus::NotAMember);
        let query = request(Some("member_paid")).into_query(&admin);
        assert_eq!(query.membership_status, "member_paid");
    }

    #[test]
    fn test_explicit_fields_win() {
        let auth = context(AccountClass::User, MembershipStatus::NotAMember);
        let query = ResolveRequest {
            country: Some("Global".to_string()),
            organization_type: Some("Enterprise".to_string()),
            ..request(None)
        }
        .into_query(&auth);

        assert_eq!(query.country, "Global");
        assert_eq!(query.organization_type, "Enterprise");
    }
}
