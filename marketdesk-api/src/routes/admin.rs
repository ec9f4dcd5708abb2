/// Administrator endpoints
///
/// Every handler requires an administrator session.
///
/// # Endpoints
///
/// - `GET /v1/admin/accounts?class=&limit=&offset=` - List accounts
/// - `POST /v1/admin/accounts` - Create an account of any class
/// - `PATCH /v1/admin/accounts/:id/status` - Approve, reject or deactivate
/// - `PATCH /v1/admin/accounts/:id/membership` - Set membership status
/// - `GET /v1/admin/dashboard` - Record counts

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use marketdesk_shared::{
    auth::{
        middleware::AuthContext,
        provider::{provision_account, NewAccount},
    },
    models::{
        account::{Account, AccountClass, AccountClassCount, AccountStatus},
        master_data::{MasterDataKindCount, MasterRecord},
        membership::MembershipStatus,
        session::Session,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Account listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    /// Restrict to one class (e.g. `seeking_organization`)
    pub class: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Account creation request
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(flatten)]
    pub account: NewAccount,

    /// Initial status (default: active)
    #[serde(default)]
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    pub membership_status: MembershipStatus,
}

/// Status change result
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub account: Account,

    /// Sessions ended because the account can no longer log in
    pub revoked_sessions: u64,
}

/// Dashboard counts
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub accounts: Vec<AccountClassCount>,
    pub pending_organizations: i64,
    pub master_data: Vec<MasterDataKindCount>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<Vec<Account>>> {
    auth.require_admin()?;

    let class = match query.class.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(AccountClass::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown account class '{}'", raw))
        })?),
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let accounts = Account::list(&state.db, class, limit, offset).await?;

    Ok(Json(accounts))
}

/// Creates an account, bypassing the self-registration policy
pub async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    auth.require_admin()?;

    let status = req.status.unwrap_or(AccountStatus::Active);
    let account = provision_account(&state.db, req.account, status).await?;

    tracing::info!(
        admin_id = %auth.account_id,
        account_id = %account.id,
        "Administrator created account"
    );

    Ok((StatusCode::CREATED, Json(account)))
}

/// Changes an account's status
///
/// Any status other than active ends the account's open sessions.
pub async fn update_account_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<StatusChangeResponse>> {
    auth.require_admin()?;

    if id == auth.account_id && req.status != AccountStatus::Active {
        return Err(ApiError::BadRequest(
            "Administrators cannot deactivate their own account".to_string(),
        ));
    }

    let account = Account::update_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let revoked_sessions = if account.status == AccountStatus::Active {
        0
    } else {
        Session::delete_for_account(&state.db, account.id).await?
    };

    tracing::info!(
        admin_id = %auth.account_id,
        account_id = %account.id,
        status = account.status.as_str(),
        revoked_sessions,
        "Account status changed"
    );

    Ok(Json(StatusChangeResponse {
        account,
        revoked_sessions,
    }))
}

/// Sets an account's membership status
///
/// Open sessions keep the status they were created with.
pub async fn update_account_membership(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMembershipRequest>,
) -> ApiResult<Json<Account>> {
    auth.require_admin()?;

    let account = Account::update_membership_status(&state.db, id, req.membership_status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    tracing::info!(
        admin_id = %auth.account_id,
        account_id = %account.id,
        membership_status = account.membership_status.as_str(),
        "Membership status changed"
    );

    Ok(Json(account))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    auth.require_admin()?;

    let accounts = Account::count_by_class(&state.db).await?;
    let pending_organizations = Account::count_with_status(
        &state.db,
        AccountClass::SeekingOrganization,
        AccountStatus::Pending,
    )
    .await?;
    let master_data = MasterRecord::count_by_kind(&state.db).await?;

    Ok(Json(DashboardResponse {
        accounts,
        pending_organizations,
        master_data,
    }))
}
