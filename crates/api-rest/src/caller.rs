//! Authentication of REST callers.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::{validate_api_key, validate_webhook_secret, API_KEY_HEADER, USER_ID_HEADER, WEBHOOK_SECRET_HEADER};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use simrs_core::constants::ANONYMOUS_ACTOR;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// An authenticated caller. Extraction fails with 401 when the API key is missing or wrong.
#[derive(Clone, Debug, PartialEq)]
pub struct Caller {
    /// Staff identity recorded as the actor of verification stages.
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        validate_api_key(header(&parts.headers, API_KEY_HEADER), &state.api_key)?;

        let user_id = header(&parts.headers, USER_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(ANONYMOUS_ACTOR)
            .to_string();
        Ok(Caller { user_id })
    }
}

/// The messaging relay. Passes when no webhook secret is configured.
#[derive(Clone, Copy, Debug)]
pub struct Relay;

#[async_trait]
impl FromRequestParts<AppState> for Relay {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        validate_webhook_secret(
            header(&parts.headers, WEBHOOK_SECRET_HEADER),
            state.cfg.webhook_secret(),
        )?;
        Ok(Relay)
    }
}
