//! PPRA team roster endpoints.

use crate::caller::Caller;
use crate::error::ApiResult;
use crate::extract::{JsonBody, Path, Query};
use crate::AppState;
use api_shared::dto::{CreateTeamMemberReq, KeywordQuery, TeamMember, UpdateTeamMemberReq};
use api_shared::ApiResponse;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/ppra/tim",
    params(KeywordQuery),
    responses((status = 200, description = "Team members ordered by position", body = [TeamMember]))
)]
pub async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<ApiResponse<Vec<TeamMember>>>> {
    let members = state.team.list(query.keyword.as_deref()).await?;
    Ok(Json(ApiResponse::success("Data Tim PPRA berhasil diambil", members)))
}

#[utoipa::path(
    post,
    path = "/api/ppra/tim",
    request_body = CreateTeamMemberReq,
    responses(
        (status = 201, description = "Member added", body = TeamMember),
        (status = 422, description = "Unknown employee or already a member")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    _caller: Caller,
    JsonBody(req): JsonBody<CreateTeamMemberReq>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TeamMember>>)> {
    let member = state.team.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Anggota Tim PPRA berhasil ditambahkan", member)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/ppra/tim/{id}",
    params(("id" = i64, Path, description = "Roster row id")),
    request_body = UpdateTeamMemberReq,
    responses(
        (status = 200, description = "Member updated", body = TeamMember),
        (status = 404, description = "No such member")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateTeamMemberReq>,
) -> ApiResult<Json<ApiResponse<TeamMember>>> {
    let member = state.team.update(id, req).await?;
    Ok(Json(ApiResponse::success("Anggota Tim PPRA berhasil diperbarui", member)))
}

#[utoipa::path(
    delete,
    path = "/api/ppra/tim/{id}",
    params(("id" = i64, Path, description = "Roster row id")),
    responses(
        (status = 200, description = "Member removed"),
        (status = 404, description = "No such member")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.team.delete(id).await?;
    Ok(Json(ApiResponse::ok("Anggota Tim PPRA berhasil dihapus")))
}
