//! Blood request handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use bloodlink_core::types::RequestId;
use bloodlink_service::MatchOutcome;

use crate::dto::{
    ApiResponse, CreateRequestBody, MatchResponseBody, RequestCreatedResponse, validated,
};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/requests
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<RequestCreatedResponse>>), ApiError> {
    let request = req.into_request(auth.user_id(), state.engine.now())?;
    let request_id = request.id;

    let dispatch = state.engine.request_created(request).await?;
    let request = state.engine.request(request_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RequestCreatedResponse { request, dispatch })),
    ))
}

/// POST /api/requests/{id}/responses
pub async fn respond(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MatchResponseBody>,
) -> Result<Json<ApiResponse<MatchOutcome>>, ApiError> {
    let req = validated(req)?;
    let outcome = state
        .engine
        .respond_to_match(RequestId::from(id), auth.user_id(), req.response, req.message)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
