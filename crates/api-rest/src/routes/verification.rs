//! PPRA verification chain endpoints.

use crate::caller::{Caller, Relay};
use crate::error::ApiResult;
use crate::extract::{JsonBody, Query};
use crate::AppState;
use api_shared::dto::{
    ApproveReq, ReviewReq, SaveAdjustmentReq, Verification, VerificationKeyQuery,
    WhatsappReplyReq, WhatsappReplyRes,
};
use api_shared::ApiResponse;
use axum::extract::State;
use axum::Json;
use simrs_core::ppra::verification::{
    MSG_ADJUSTMENT_SAVED, MSG_APPROVAL_SAVED, MSG_REVIEW_SAVED, MSG_VERIFICATION_FETCHED,
};

#[utoipa::path(
    post,
    path = "/api/ppra/verifikasi",
    request_body = SaveAdjustmentReq,
    responses(
        (status = 200, description = "Dosage adjustment saved", body = Verification),
        (status = 422, description = "Missing prescription or drug code")
    )
)]
pub async fn save_adjustment(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<SaveAdjustmentReq>,
) -> ApiResult<Json<ApiResponse<Verification>>> {
    let saved = state
        .verification
        .save_adjustment(req, &caller.user_id)
        .await?;
    Ok(Json(ApiResponse::success(MSG_ADJUSTMENT_SAVED, saved)))
}

#[utoipa::path(
    post,
    path = "/api/ppra/verifikasi/telaah",
    request_body = ReviewReq,
    responses(
        (status = 200, description = "Pharmacist review saved", body = Verification),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn review(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<ReviewReq>,
) -> ApiResult<Json<ApiResponse<Verification>>> {
    let saved = state.verification.review(req, &caller.user_id).await?;
    Ok(Json(ApiResponse::success(MSG_REVIEW_SAVED, saved)))
}

#[utoipa::path(
    post,
    path = "/api/ppra/verifikasi/approve",
    request_body = ApproveReq,
    responses(
        (status = 200, description = "Chairman approval saved", body = Verification),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(req): JsonBody<ApproveReq>,
) -> ApiResult<Json<ApiResponse<Verification>>> {
    let saved = state.verification.approve(req, &caller.user_id).await?;
    Ok(Json(ApiResponse::success(MSG_APPROVAL_SAVED, saved)))
}

/// The verification row of a line; `data` is `null` when no stage has run yet.
#[utoipa::path(
    get,
    path = "/api/ppra/verifikasi",
    params(VerificationKeyQuery),
    responses(
        (status = 200, description = "Verification row", body = Verification),
        (status = 422, description = "Missing prescription or drug code")
    )
)]
pub async fn show(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<VerificationKeyQuery>,
) -> ApiResult<Json<ApiResponse<Option<Verification>>>> {
    let found = state.verification.show(query).await?;
    Ok(Json(ApiResponse::success(MSG_VERIFICATION_FETCHED, found)))
}

#[utoipa::path(
    post,
    path = "/api/ppra/verifikasi-wa",
    request_body = WhatsappReplyReq,
    responses(
        (status = 200, description = "Reply applied", body = WhatsappReplyRes),
        (status = 403, description = "Sender is not on the PPRA roster"),
        (status = 404, description = "Unknown or expired short code"),
        (status = 422, description = "Malformed reply")
    )
)]
pub async fn whatsapp_reply(
    State(state): State<AppState>,
    _relay: Relay,
    JsonBody(req): JsonBody<WhatsappReplyReq>,
) -> ApiResult<Json<ApiResponse<WhatsappReplyRes>>> {
    let (message, applied) = state.verification.handle_whatsapp_reply(req).await?;
    Ok(Json(ApiResponse::success(message, applied)))
}
