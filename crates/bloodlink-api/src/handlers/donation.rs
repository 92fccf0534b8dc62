//! Donation confirmation handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use bloodlink_core::types::DonationId;

use crate::dto::{ApiResponse, DisputeBody, DonationStatusResponse, validated};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/donations/{id}/confirm
///
/// The caller confirms as whichever party they are.
pub async fn confirm(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DonationStatusResponse>>, ApiError> {
    let donation_id = DonationId::from(id);
    let status = state
        .engine
        .confirm_donation_as(donation_id, auth.user_id())
        .await?;
    Ok(Json(ApiResponse::ok(DonationStatusResponse {
        donation_id,
        status,
    })))
}

/// POST /api/donations/{id}/dispute
pub async fn dispute(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<DisputeBody>>,
) -> Result<Json<ApiResponse<DonationStatusResponse>>, ApiError> {
    let body = validated(body.map(|Json(b)| b).unwrap_or_default())?;
    let donation_id = DonationId::from(id);
    let status = state
        .engine
        .dispute_donation_as(donation_id, auth.user_id(), body.reason)
        .await?;
    Ok(Json(ApiResponse::ok(DonationStatusResponse {
        donation_id,
        status,
    })))
}
