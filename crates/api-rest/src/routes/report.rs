use crate::caller::Caller;
use crate::error::ApiResult;
use crate::extract::Query;
use crate::AppState;
use api_shared::dto::{PpraReportRow, ReportQuery, SoapSuggestion, SoapSuggestionQuery};
use api_shared::ApiResponse;
use axum::extract::State;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/ppra/laporan",
    params(ReportQuery),
    responses((status = 200, description = "PPRA report rows", body = [PpraReportRow]))
)]
pub async fn report(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ApiResponse<Vec<PpraReportRow>>>> {
    let rows = state.report.report(query).await?;
    Ok(Json(ApiResponse::success("Laporan PPRA berhasil diambil", rows)))
}

#[utoipa::path(
    get,
    path = "/api/ppra/laporan/saran-soap",
    params(SoapSuggestionQuery),
    responses(
        (status = 200, description = "Dosage suggestions from SOAP plans", body = [SoapSuggestion]),
        (status = 404, description = "Unknown drug"),
        (status = 422, description = "Missing parameters")
    )
)]
pub async fn soap_suggestions(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<SoapSuggestionQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SoapSuggestion>>>> {
    let suggestions = state.report.soap_suggestions(query).await?;
    Ok(Json(ApiResponse::success("Saran dosis berhasil diambil", suggestions)))
}
