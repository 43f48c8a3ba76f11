use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use relief_core::donations::LedgerOutcome;
use relief_core::run_blocking;
use relief_types::api::{
    CardDonationRequest, ConfirmDonationRequest, DonationResponse, FeeBreakdown, FeeQuery,
    InKindDonationRequest, RequestDonations, WalletDonationRequest, WalletInstructions,
};
use relief_types::models::{Donation, Identity};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

pub(crate) fn donation_response(outcome: LedgerOutcome) -> Json<DonationResponse> {
    Json(DonationResponse {
        donation: outcome.donation,
        fees: outcome.fees,
        warning: outcome.warning,
    })
}

pub async fn donate_card(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<CardDonationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.ledger.donate_card(identity, body).await?;
    Ok((StatusCode::CREATED, donation_response(outcome)))
}

pub async fn donate_wallet(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<WalletDonationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ledger = state.ledger.clone();
    let pledge = run_blocking(move || ledger.donate_wallet(identity, body)).await?;

    let message = format!(
        "Send {} to wallet {} and confirm with the reference number you receive.",
        pledge.donation.amount, pledge.wallet_number
    );
    Ok((
        StatusCode::CREATED,
        Json(WalletInstructions {
            donation_id: pledge.donation.id,
            wallet_number: pledge.wallet_number,
            amount: pledge.donation.amount,
            fees: pledge.fees,
            message,
        }),
    ))
}

pub async fn donate_in_kind(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<InKindDonationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ledger = state.ledger.clone();
    let outcome = run_blocking(move || ledger.donate_in_kind(identity, body)).await?;
    Ok((StatusCode::CREATED, donation_response(outcome)))
}

pub async fn confirm_donation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    ApiJson(body): ApiJson<ConfirmDonationRequest>,
) -> Result<Json<DonationResponse>, ApiError> {
    let ledger = state.ledger.clone();
    let outcome = run_blocking(move || ledger.confirm(identity, id, &body.reference_number)).await?;
    Ok(donation_response(outcome))
}

pub async fn get_donation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Donation>, ApiError> {
    let ledger = state.ledger.clone();
    Ok(Json(run_blocking(move || ledger.get(identity, id)).await?))
}

pub async fn my_donations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Donation>>, ApiError> {
    let ledger = state.ledger.clone();
    Ok(Json(run_blocking(move || ledger.donations_by(identity)).await?))
}

pub async fn request_donations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDonations>, ApiError> {
    let ledger = state.ledger.clone();
    Ok(Json(run_blocking(move || ledger.donations_for_request(id)).await?))
}

pub async fn fee_quote(
    State(state): State<AppState>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<FeeBreakdown>, ApiError> {
    Ok(Json(state.ledger.quote(query.amount)?))
}
