/// Master data endpoints
///
/// Kinds appear in paths as slugs (`countries`, `currencies`,
/// `reward-types`, ...). Any session may read; writes need an administrator.
///
/// # Endpoints
///
/// - `GET /v1/master-data/:kind` - List records (`?include_inactive=true` for admins)
/// - `GET /v1/master-data/:kind/:id` - Fetch one record
/// - `POST /v1/master-data/:kind` - Create
/// - `PUT /v1/master-data/:kind/:id` - Update
/// - `DELETE /v1/master-data/:kind/:id` - Delete
/// - `POST /v1/master-data/:kind/import` - Import a legacy export

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
    auth::middleware::AuthContext,
    legacy::{self, ImportReport},
    models::master_data::{CreateMasterRecord, MasterDataKind, MasterRecord, UpdateMasterRecord},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsQuery {
    /// Honored for administrators only
    #[serde(default)]
    pub include_inactive: bool,
}

fn parse_kind(slug: &str) -> ApiResult<MasterDataKind> {
    MasterDataKind::from_slug(slug)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown master data kind '{}'", slug)))
}

fn record_not_found(kind: MasterDataKind) -> ApiError {
    ApiError::NotFound(format!("No {} record with this ID", kind))
}

pub async fn list_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(kind): Path<String>,
    Query(query): Query<ListRecordsQuery>,
) -> ApiResult<Json<Vec<MasterRecord>>> {
    let kind = parse_kind(&kind)?;
    let include_inactive = query.include_inactive && auth.is_admin();

    let records = MasterRecord::list(&state.db, kind, include_inactive).await?;

    Ok(Json(records))
}

/// Fetches one record; inactive records are visible to administrators only
pub async fn get_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<MasterRecord>> {
    let kind = parse_kind(&kind)?;

    let record = MasterRecord::find_by_id(&state.db, kind, id)
        .await?
        .filter(|record| record.is_active || auth.is_admin())
        .ok_or_else(|| record_not_found(kind))?;

    Ok(Json(record))
}

pub async fn create_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(kind): Path<String>,
    Json(mut req): Json<CreateMasterRecord>,
) -> ApiResult<(StatusCode, Json<MasterRecord>)> {
    auth.require_admin()?;
    let kind = parse_kind(&kind)?;

    req.check_for_kind(kind)?;
    req.validate()?;

    let record = MasterRecord::create(&state.db, kind, req).await?;

    tracing::info!(%kind, record_id = %record.id, name = %record.name, "Master record created");

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(mut req): Json<UpdateMasterRecord>,
) -> ApiResult<Json<MasterRecord>> {
    auth.require_admin()?;
    let kind = parse_kind(&kind)?;

    req.check_for_kind(kind)?;
    req.validate()?;

    let record = MasterRecord::update(&state.db, kind, id, req)
        .await?
        .ok_or_else(|| record_not_found(kind))?;

    tracing::info!(%kind, record_id = %record.id, "Master record updated");

    Ok(Json(record))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    auth.require_admin()?;
    let kind = parse_kind(&kind)?;

    if !MasterRecord::delete(&state.db, kind, id).await? {
        return Err(record_not_found(kind));
    }

    tracing::info!(%kind, record_id = %id, "Master record deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Imports a legacy export of one kind
///
/// The body is taken verbatim and repaired before import; a malformed or
/// empty body imports nothing.
pub async fn import_records(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(kind): Path<String>,
    body: String,
) -> ApiResult<Json<ImportReport>> {
    auth.require_admin()?;
    let kind = parse_kind(&kind)?;

    let payload = legacy::repair(&body);
    let report = MasterRecord::import(&state.db, kind, payload).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("reward-types").unwrap(), MasterDataKind::RewardType);
        assert!(matches!(parse_kind("planets"), Err(ApiError::NotFound(_))));
    }
}
