use axum::{Extension, Json, extract::State};
use relief_core::{accounts, run_blocking};
use relief_types::api::UpdateProfileRequest;
use relief_types::models::{Identity, User};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<User>, ApiError> {
    let db = state.db.clone();
    let user = run_blocking(move || accounts::profile(&db, identity)).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let db = state.db.clone();
    let user = run_blocking(move || accounts::update_profile(&db, identity, &body)).await?;
    Ok(Json(user))
}
