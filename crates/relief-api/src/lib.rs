pub mod admin;
pub mod auth;
pub mod donations;
pub mod error;
pub mod extract;
pub mod health;
pub mod leaderboard;
pub mod middleware;
pub mod requests;
pub mod users;

use axum::{
    Router, middleware as axum_mw,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

use crate::middleware::{optional_auth, require_auth};

/// Full HTTP surface. Anonymous routes, routes that accept an optional
/// token, and token-only routes are assembled separately and merged.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/requests", get(requests::list_requests))
        .route("/requests/{id}", get(requests::get_request))
        .route("/requests/{id}/donations", get(donations::request_donations))
        .route("/donations/fees", get(donations::fee_quote))
        .route("/leaderboard", get(leaderboard::leaderboard))
        .route("/leaderboard/badges", get(leaderboard::badge_catalogue))
        .with_state(state.clone());

    let optional_routes = Router::new()
        .route("/requests", post(requests::create_request))
        .layer(axum_mw::from_fn_with_state(state.clone(), optional_auth))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(users::me).put(users::update_me))
        .route(
            "/requests/{id}",
            axum::routing::put(requests::update_request).delete(requests::delete_request),
        )
        .route("/requests/{id}/status", patch(requests::update_status))
        .route("/requests/{id}/help", post(requests::mark_helped))
        .route("/donations/card", post(donations::donate_card))
        .route("/donations/wallet", post(donations::donate_wallet))
        .route("/donations/in-kind", post(donations::donate_in_kind))
        .route("/donations/mine", get(donations::my_donations))
        .route("/donations/{id}", get(donations::get_donation))
        .route("/donations/{id}/confirm", post(donations::confirm_donation))
        .route("/leaderboard/me", get(leaderboard::my_rank))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", get(admin::user_detail).put(admin::update_user))
        .route("/admin/requests", get(admin::list_requests))
        .route("/admin/requests/{id}/verify", post(admin::verify_request))
        .route("/admin/reports", get(admin::report))
        .route("/admin/bulk/{action}", post(admin::bulk))
        .route("/admin/donations", get(admin::list_donations))
        .route("/admin/donations/{id}/refund", post(admin::refund_donation))
        .route("/admin/donations/{id}/gateway-outcome", post(admin::gateway_outcome))
        .layer(axum_mw::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
