//! Antibiotic drug mapping endpoints.

use crate::caller::Caller;
use crate::error::ApiResult;
use crate::extract::{JsonBody, Path, Query};
use crate::AppState;
use api_shared::dto::{
    CreateDrugMappingReq, Drug, DrugMapping, DrugMappingListQuery, DrugMappingPage, KeywordQuery,
    UpdateDrugMappingReq,
};
use api_shared::ApiResponse;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/ppra/mapping-obat",
    params(DrugMappingListQuery),
    responses((status = 200, description = "One page of mappings", body = DrugMappingPage))
)]
pub async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<DrugMappingListQuery>,
) -> ApiResult<Json<ApiResponse<DrugMappingPage>>> {
    let page = state.mapping.list(query).await?;
    Ok(Json(ApiResponse::success("Data mapping obat berhasil diambil", page)))
}

#[utoipa::path(
    get,
    path = "/api/ppra/mapping-obat/{id}",
    params(("id" = i64, Path, description = "Mapping id")),
    responses(
        (status = 200, description = "Mapping", body = DrugMapping),
        (status = 404, description = "No such mapping")
    )
)]
pub async fn show(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<DrugMapping>>> {
    let mapping = state.mapping.show(id).await?;
    Ok(Json(ApiResponse::success("Data mapping obat berhasil diambil", mapping)))
}

#[utoipa::path(
    post,
    path = "/api/ppra/mapping-obat",
    request_body = CreateDrugMappingReq,
    responses(
        (status = 201, description = "Mapping created", body = DrugMapping),
        (status = 422, description = "Unknown or already mapped drug")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    _caller: Caller,
    JsonBody(req): JsonBody<CreateDrugMappingReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DrugMapping>>)> {
    let mapping = state.mapping.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Mapping obat berhasil ditambahkan", mapping)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/ppra/mapping-obat/{id}",
    params(("id" = i64, Path, description = "Mapping id")),
    request_body = UpdateDrugMappingReq,
    responses(
        (status = 200, description = "Mapping updated", body = DrugMapping),
        (status = 404, description = "No such mapping")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateDrugMappingReq>,
) -> ApiResult<Json<ApiResponse<DrugMapping>>> {
    let mapping = state.mapping.update(id, req).await?;
    Ok(Json(ApiResponse::success("Mapping obat berhasil diperbarui", mapping)))
}

#[utoipa::path(
    delete,
    path = "/api/ppra/mapping-obat/{id}",
    params(("id" = i64, Path, description = "Mapping id")),
    responses(
        (status = 200, description = "Mapping removed"),
        (status = 404, description = "No such mapping")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.mapping.delete(id).await?;
    Ok(Json(ApiResponse::ok("Mapping obat berhasil dihapus")))
}

/// Active drugs that are not mapped yet, for the mapping form's picker.
#[utoipa::path(
    get,
    path = "/api/ppra/mapping-obat/search-obat",
    params(KeywordQuery),
    responses((status = 200, description = "Matching drugs", body = [Drug]))
)]
pub async fn search_drugs(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Drug>>>> {
    let drugs = state.mapping.search_unmapped(query.keyword.as_deref()).await?;
    Ok(Json(ApiResponse::success("Data obat berhasil diambil", drugs)))
}
