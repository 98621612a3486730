use crate::caller::Caller;
use crate::error::ApiResult;
use crate::AppState;
use api_shared::dto::ClinicQueue;
use api_shared::ApiResponse;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/antrian/summary",
    responses((status = 200, description = "Quota and registrations per clinic for seven days", body = [ClinicQueue]))
)]
pub async fn summary(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<ApiResponse<Vec<ClinicQueue>>>> {
    let clinics = state.queue.summary().await?;
    Ok(Json(ApiResponse::success("Ringkasan antrian berhasil diambil", clinics)))
}
