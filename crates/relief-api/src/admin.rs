use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use relief_core::{CoreError, accounts, admin, run_blocking};
use relief_types::api::{
    AdminDonationQuery, AdminRequestQuery, AdminStats, AdminUserDetail, AdminUserQuery,
    AdminUserUpdate, BulkAction, BulkRequest, BulkResult, DonationPage, DonationResponse,
    GatewayOutcomeRequest, PlatformReport, RefundRequest, ReportQuery, RequestPage, UserPage,
};
use relief_types::models::{Identity, ReliefRequest, User};
use uuid::Uuid;

use crate::auth::AppState;
use crate::donations::donation_response;
use crate::error::ApiError;
use crate::extract::ApiJson;

pub async fn stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<AdminStats>, ApiError> {
    let db = state.db.clone();
    Ok(Json(run_blocking(move || accounts::stats(&db, identity)).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AdminUserQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let db = state.db.clone();
    Ok(Json(run_blocking(move || admin::list_users(&db, identity, &query)).await?))
}

pub async fn user_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<AdminUserDetail>, ApiError> {
    let db = state.db.clone();
    Ok(Json(run_blocking(move || admin::user_detail(&db, identity, id)).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<AdminUserUpdate>,
) -> Result<Json<User>, ApiError> {
    let db = state.db.clone();
    let user = run_blocking(move || accounts::admin_update_user(&db, identity, id, &body)).await?;
    Ok(Json(user))
}

pub async fn verify_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ReliefRequest>, ApiError> {
    let svc = state.requests.clone();
    Ok(Json(run_blocking(move || svc.verify(identity, id)).await?))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AdminRequestQuery>,
) -> Result<Json<RequestPage>, ApiError> {
    let db = state.db.clone();
    Ok(Json(run_blocking(move || admin::list_requests(&db, identity, &query)).await?))
}

pub async fn report(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PlatformReport>, ApiError> {
    let db = state.db.clone();
    Ok(Json(run_blocking(move || admin::report(&db, identity, &query)).await?))
}

pub async fn bulk(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> Result<Json<BulkResult>, ApiError> {
    let action: BulkAction = action
        .parse::<BulkAction>()
        .map_err(|e| CoreError::validation(e.to_string()))?;
    let db = state.db.clone();
    Ok(Json(run_blocking(move || admin::bulk(&db, identity, action, &body.ids)).await?))
}

pub async fn list_donations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<AdminDonationQuery>,
) -> Result<Json<DonationPage>, ApiError> {
    let ledger = state.ledger.clone();
    Ok(Json(run_blocking(move || ledger.admin_list(identity, &query)).await?))
}

pub async fn refund_donation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<RefundRequest>,
) -> Result<Json<DonationResponse>, ApiError> {
    let ledger = state.ledger.clone();
    let outcome = run_blocking(move || ledger.refund(identity, id, &body.reason)).await?;
    Ok(donation_response(outcome))
}

pub async fn gateway_outcome(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<GatewayOutcomeRequest>,
) -> Result<Json<DonationResponse>, ApiError> {
    let ledger = state.ledger.clone();
    let outcome = run_blocking(move || ledger.record_gateway_outcome(identity, id, body.succeeded)).await?;
    Ok(donation_response(outcome))
}
