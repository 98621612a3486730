//! BPJS Antrol task-time endpoints.

use crate::caller::Caller;
use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::AppState;
use api_shared::dto::{AntrolTaskSync, AntrolTaskSyncBulkReq, AntrolTaskSyncReq};
use api_shared::ApiResponse;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/bpjs/antrol/sync-task",
    request_body = AntrolTaskSyncReq,
    responses(
        (status = 200, description = "Task times recorded for the booking", body = AntrolTaskSync),
        (status = 404, description = "No visit for the booking")
    )
)]
pub async fn sync_task(
    State(state): State<AppState>,
    _caller: Caller,
    JsonBody(req): JsonBody<AntrolTaskSyncReq>,
) -> ApiResult<Json<ApiResponse<AntrolTaskSync>>> {
    let sync = state.antrol.task_updates(&req.kodebooking).await?;
    Ok(Json(ApiResponse::success("Sinkronisasi task berhasil", sync)))
}

#[utoipa::path(
    post,
    path = "/api/bpjs/antrol/sync-task-bulk",
    request_body = AntrolTaskSyncBulkReq,
    responses(
        (status = 200, description = "Task times per booking", body = [AntrolTaskSync]),
        (status = 422, description = "No booking codes")
    )
)]
pub async fn sync_task_bulk(
    State(state): State<AppState>,
    _caller: Caller,
    JsonBody(req): JsonBody<AntrolTaskSyncBulkReq>,
) -> ApiResult<Json<ApiResponse<Vec<AntrolTaskSync>>>> {
    let results = state.antrol.bulk_task_updates(&req.kodebookings).await?;
    Ok(Json(ApiResponse::success("Sinkronisasi bulk berhasil", results)))
}
