//! # SIMRS Core
//!
//! Core business logic of the hospital backend:
//! - the PPRA antibiotic verification workflow and its WhatsApp notifications
//! - the PPRA team roster, drug mapping and report
//! - the dosage-instruction parser
//! - the outpatient queue summary and BPJS Antrol task times
//!
//! **No API concerns**: HTTP routing, authentication and the CLI live in `api-rest`,
//! `api-shared` and `simrs-cli`. Storage is reached through the traits in [`store`].

pub mod antrol;
pub mod config;
pub mod constants;
pub mod dosage;
pub mod error;
pub mod messaging;
pub mod patient;
pub mod ppra;
pub mod queue;
pub mod store;

pub use config::CoreConfig;
pub use error::{SimrsError, SimrsResult};

use chrono::NaiveDateTime;
use std::sync::Arc;

/// Source of "now" in hospital local time. Injected so tests can pin the date.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The wall clock of the host, in local time.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}
