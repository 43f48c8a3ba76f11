use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use relief_core::run_blocking;
use relief_types::api::Claims;
use relief_types::models::Identity;
use tracing::debug;

use crate::auth::AppState;
use crate::error::ApiError;

/// Reject the request unless it carries a valid token for an active user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = resolve_identity(&state, req.headers())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Attach an identity when a token is present. A missing header is
/// anonymous; a bad token is still rejected.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(identity) = resolve_identity(&state, req.headers()).await? {
        req.extensions_mut().insert(identity);
    }
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })
}

/// Token claims are re-checked against the user row, so deactivation and
/// admin changes apply to tokens that were already issued.
async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return Ok(None);
    };
    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let db = state.db.clone();
    let user_id = claims.sub;
    let user = run_blocking(move || Ok(db.get_user_by_id(&user_id.to_string())?)).await?;

    match user {
        Some(row) if row.is_active => Ok(Some(Identity {
            user_id,
            is_admin: row.is_admin,
        })),
        _ => Err(ApiError::Unauthorized),
    }
}
