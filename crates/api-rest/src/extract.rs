//! Request extractors whose rejections use the JSON envelope.
//!
//! axum's own `Json`, `Query` and `Path` reject with a plain-text body. These wrappers turn the
//! same rejections into `ApiError` so a malformed body or a non-numeric id still answers
//! `{"success": false, "message": ...}`.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// A JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Path segments.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);
