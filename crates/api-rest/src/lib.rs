//! # API REST
//!
//! REST API for the SIMRS backend.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - API key checks and the JSON envelope on every response
//!
//! Business logic lives in `simrs-core`; wire types come from `api-shared`.

#![warn(rust_2018_idioms)]

pub mod caller;
pub mod error;
pub mod extract;
pub mod routes;

use api_shared::dto::{self, HealthRes};
use api_shared::{ApiResponse, HealthService};
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use simrs_core::antrol::AntrolTaskService;
use simrs_core::messaging::SharedMessenger;
use simrs_core::ppra::mapping::DrugMappingService;
use simrs_core::ppra::report::ReportService;
use simrs_core::ppra::team::TeamService;
use simrs_core::ppra::verification::VerificationService;
use simrs_core::queue::QueueService;
use simrs_core::store::SharedStore;
use simrs_core::{Clock, CoreConfig};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
///
/// Services are built once at startup and shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub api_key: Arc<str>,
    pub store: SharedStore,
    pub verification: VerificationService,
    pub team: TeamService,
    pub mapping: DrugMappingService,
    pub report: ReportService,
    pub queue: QueueService,
    pub antrol: AntrolTaskService,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        api_key: impl Into<Arc<str>>,
        store: SharedStore,
        messenger: SharedMessenger,
        clock: Clock,
    ) -> Self {
        Self {
            verification: VerificationService::new(
                cfg.clone(),
                store.clone(),
                messenger,
                clock.clone(),
            ),
            team: TeamService::new(store.clone()),
            mapping: DrugMappingService::new(store.clone()),
            report: ReportService::new(store.clone(), clock.clone()),
            queue: QueueService::new(store.clone(), clock),
            antrol: AntrolTaskService::new(store.clone()),
            cfg,
            api_key: api_key.into(),
            store,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        routes::verification::save_adjustment,
        routes::verification::review,
        routes::verification::approve,
        routes::verification::show,
        routes::verification::whatsapp_reply,
        routes::team::list,
        routes::team::create,
        routes::team::update,
        routes::team::delete,
        routes::mapping::list,
        routes::mapping::show,
        routes::mapping::create,
        routes::mapping::update,
        routes::mapping::delete,
        routes::mapping::search_drugs,
        routes::report::report,
        routes::report::soap_suggestions,
        routes::queue::summary,
        routes::antrol::sync_task,
        routes::antrol::sync_task_bulk,
    ),
    components(schemas(
        dto::HealthRes,
        dto::SaveAdjustmentReq,
        dto::ReviewReq,
        dto::ApproveReq,
        dto::WhatsappReplyReq,
        dto::WhatsappReplyRes,
        dto::Verification,
        dto::CreateTeamMemberReq,
        dto::UpdateTeamMemberReq,
        dto::Employee,
        dto::TeamMember,
        dto::CreateDrugMappingReq,
        dto::UpdateDrugMappingReq,
        dto::Drug,
        dto::DrugMapping,
        dto::DrugMappingPage,
        dto::PpraReportRow,
        dto::SoapSuggestion,
        dto::QueueDay,
        dto::ClinicQueue,
        dto::AntrolTaskSyncReq,
        dto::AntrolTaskSyncBulkReq,
        dto::AntrolTaskUpdate,
        dto::AntrolTaskSync,
    ))
)]
pub struct ApiDoc;

/// Builds the router with every endpoint, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/ppra/verifikasi",
            get(routes::verification::show).post(routes::verification::save_adjustment),
        )
        .route("/api/ppra/verifikasi/telaah", post(routes::verification::review))
        .route("/api/ppra/verifikasi/approve", post(routes::verification::approve))
        .route("/api/ppra/verifikasi-wa", post(routes::verification::whatsapp_reply))
        .route(
            "/api/ppra/tim",
            get(routes::team::list).post(routes::team::create),
        )
        .route(
            "/api/ppra/tim/:id",
            put(routes::team::update).delete(routes::team::delete),
        )
        .route(
            "/api/ppra/mapping-obat",
            get(routes::mapping::list).post(routes::mapping::create),
        )
        .route(
            "/api/ppra/mapping-obat/search-obat",
            get(routes::mapping::search_drugs),
        )
        .route(
            "/api/ppra/mapping-obat/:id",
            get(routes::mapping::show)
                .put(routes::mapping::update)
                .delete(routes::mapping::delete),
        )
        .route("/api/ppra/laporan", get(routes::report::report))
        .route(
            "/api/ppra/laporan/saran-soap",
            get(routes::report::soap_suggestions),
        )
        .route("/api/antrian/summary", get(routes::queue::summary))
        .route("/api/bpjs/antrol/sync-task", post(routes::antrol::sync_task))
        .route(
            "/api/bpjs/antrol/sync-task-bulk",
            post(routes::antrol::sync_task_bulk),
        )
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Reports whether the service is up and whether the hospital database answers a ping.
/// Used for monitoring and load balancer health checks; it never fails with an error status.
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthRes>> {
    let database_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database ping failed: {:?}", e);
            false
        }
    };
    let res = HealthService::check_health_with_database(database_ok);
    let message = res.message.clone();
    Json(ApiResponse::success(message, res))
}
