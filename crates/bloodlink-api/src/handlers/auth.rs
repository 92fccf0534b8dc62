//! Phone sign-in handlers.

use axum::Json;
use axum::extract::State;

use bloodlink_auth::IssueReceipt;

use crate::dto::{ApiResponse, RequestCodeBody, SessionResponse, VerifyCodeBody, validated};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/auth/phone/code
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeBody>,
) -> Result<Json<ApiResponse<IssueReceipt>>, ApiError> {
    let req = validated(req)?;
    let receipt = state.engine.issue_code(&req.phone_number).await?;
    Ok(Json(ApiResponse::ok(receipt)))
}

/// POST /api/auth/phone/verify
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeBody>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let req = validated(req)?;
    let (claim, token) = state.engine.sign_in(&req.phone_number, &req.code).await?;
    let user_id = bloodlink_auth::user_id_for_phone(&claim.phone_number);

    Ok(Json(ApiResponse::ok(SessionResponse {
        token: token.token,
        expires_at: token.expires_at,
        user_id,
        phone_number: claim.phone_number,
    })))
}
