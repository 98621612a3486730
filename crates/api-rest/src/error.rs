//! Mapping of core, auth and extractor failures onto the JSON envelope.

use api_shared::auth::AuthError;
use api_shared::ApiResponse;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use simrs_core::SimrsError;

const MSG_INTERNAL: &str = "Terjadi kesalahan pada server";
const MSG_UNAUTHORISED: &str = "Unauthorized";
const MSG_UNKNOWN_CODE: &str = "Kode verifikasi tidak ditemukan atau sudah kadaluarsa";

#[derive(Debug)]
pub enum ApiError {
    Core(SimrsError),
    Auth(AuthError),
    /// The request could not be decoded into the handler's input.
    Rejection { status: StatusCode, message: String },
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        ApiError::Rejection {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        ApiError::Rejection {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        ApiError::Rejection {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<SimrsError> for ApiError {
    fn from(e: SimrsError) -> Self {
        ApiError::Core(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, MSG_UNAUTHORISED.into()),
            ApiError::Rejection { status, message } => (*status, message.clone()),
            ApiError::Core(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let message = match e {
                    SimrsError::InvalidInput(m)
                    | SimrsError::NotFound(m)
                    | SimrsError::Duplicate(m)
                    | SimrsError::Forbidden(m) => m.clone(),
                    SimrsError::Unauthorised(_) => MSG_UNAUTHORISED.into(),
                    SimrsError::UnknownShortCode => MSG_UNKNOWN_CODE.into(),
                    SimrsError::ShortCodeExhausted(_)
                    | SimrsError::Config(_)
                    | SimrsError::Database(_)
                    | SimrsError::Messaging(_) => MSG_INTERNAL.into(),
                };
                (status, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, message);
        }
        (status, Json(ApiResponse::error(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
