use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use relief_core::run_blocking;
use relief_types::api::{
    CreateReliefRequest, MarkHelpedRequest, RequestQuery, UpdateReliefRequest, UpdateStatusRequest,
};
use relief_types::models::{BadgeTier, Identity, ReliefRequest};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

#[derive(Serialize)]
pub struct HelpResponse {
    pub request: ReliefRequest,
    pub help_count: i64,
    pub badges_granted: Vec<BadgeTier>,
}

pub async fn create_request(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    ApiJson(body): ApiJson<CreateReliefRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = identity.map(|Extension(i)| i);
    let svc = state.requests.clone();
    let created = run_blocking(move || svc.create(caller, body)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestQuery>,
) -> Result<Json<Vec<ReliefRequest>>, ApiError> {
    let svc = state.requests.clone();
    let requests = run_blocking(move || svc.list(&query)).await?;
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReliefRequest>, ApiError> {
    let svc = state.requests.clone();
    Ok(Json(run_blocking(move || svc.get(id)).await?))
}

pub async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<UpdateReliefRequest>,
) -> Result<Json<ReliefRequest>, ApiError> {
    let svc = state.requests.clone();
    Ok(Json(run_blocking(move || svc.update(identity, id, body)).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ReliefRequest>, ApiError> {
    let svc = state.requests.clone();
    Ok(Json(run_blocking(move || svc.set_status(identity, id, body.status)).await?))
}

pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    let svc = state.requests.clone();
    run_blocking(move || svc.delete(identity, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_helped(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    body: Option<Json<MarkHelpedRequest>>,
) -> Result<Json<HelpResponse>, ApiError> {
    let notes = body.and_then(|Json(b)| b.notes);
    let svc = state.requests.clone();
    let outcome = run_blocking(move || svc.mark_helped(identity, id, notes)).await?;
    Ok(Json(HelpResponse {
        request: outcome.request,
        help_count: outcome.help_count,
        badges_granted: outcome.badges_granted,
    }))
}
