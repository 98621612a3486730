//! # API Shared
//!
//! Shared utilities and definitions for the SIMRS APIs.
//!
//! Contains:
//! - Wire types for requests and responses (`dto` module)
//! - The JSON envelope every endpoint answers with
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `simrs-core` for its output shapes and by `api-rest` for its endpoints.

pub mod auth;
pub mod dto;
pub mod envelope;
pub mod health;

pub use envelope::ApiResponse;
pub use health::HealthService;
