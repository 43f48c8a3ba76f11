use axum::{
    Extension, Json,
    extract::{Query, State},
};
use relief_core::{badges, leaderboard as ranker, run_blocking};
use relief_types::api::{BadgeInfo, LeaderboardEntry, LeaderboardQuery, MyRank};
use relief_types::models::Identity;

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let db = state.db.clone();
    let board = run_blocking(move || ranker::leaderboard(&db, query.category)).await?;
    Ok(Json(board))
}

pub async fn my_rank(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MyRank>, ApiError> {
    let db = state.db.clone();
    let rank = run_blocking(move || ranker::my_rank(&db, identity.user_id)).await?;
    Ok(Json(rank))
}

/// Every badge that can be earned, with its threshold.
pub async fn badge_catalogue() -> Json<Vec<BadgeInfo>> {
    Json(badges::catalogue())
}
