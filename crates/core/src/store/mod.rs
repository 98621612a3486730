//! Storage seams.
//!
//! Every service reads and writes the hospital database through these traits. `MySqlStore` is
//! the production implementation over the shared SIMRS schema; `MemoryStore` keeps the same
//! tables in memory for tests and local development.

pub mod memory;
pub mod mysql;

use crate::antrol::{BookingReference, RecordedVisitTimes};
use crate::error::SimrsResult;
use crate::ppra::mapping::{DrugMappingFields, DrugMappingRow, DrugRow};
use crate::ppra::report::{DiagnosisRow, ReportFilter, ReportSourceRow, RoomStayRow, SoapEntryRow};
use crate::ppra::team::TeamMemberRow;
use crate::ppra::{
    NotificationLog, PendingLine, PrescriptionLineDetail, PrescriptionLineKey, RosterEntry,
    StaffContact, VerificationPatch, VerificationRecord,
};
use crate::queue::ClinicRow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> SimrsResult<()>;
}

/// PPRA team members joined with staff contact details.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Finds the team member whose phone number ends with `suffix` (digits only).
    async fn find_roster_by_phone_suffix(&self, suffix: &str) -> SimrsResult<Option<RosterEntry>>;

    async fn find_chairman_contact(&self) -> SimrsResult<Option<StaffContact>>;

    /// Team members whose position mentions a pharmacist and who have a phone number.
    async fn pharmacist_contacts(&self) -> SimrsResult<Vec<StaffContact>>;

    async fn staff_name(&self, nip: &str) -> SimrsResult<Option<String>>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Writes one stage's columns, creating the row when it does not exist yet.
    async fn upsert_verification(
        &self,
        key: &PrescriptionLineKey,
        patch: &VerificationPatch,
        now: NaiveDateTime,
    ) -> SimrsResult<VerificationRecord>;

    async fn find_verification(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<VerificationRecord>>;

    async fn prescription_line_detail(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<PrescriptionLineDetail>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn find_notification_by_code(&self, code: &str) -> SimrsResult<Option<NotificationLog>>;

    async fn find_notification_for_line(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<NotificationLog>>;

    /// Whether `code` was sent at or after `since`. Older codes have expired and may be reused.
    async fn short_code_in_use(&self, code: &str, since: NaiveDateTime) -> SimrsResult<bool>;

    async fn insert_notification(&self, log: &NotificationLog) -> SimrsResult<()>;

    /// Lines of notifiable mapped antibiotics prescribed on or after `since` that have no
    /// notification log yet.
    async fn pending_antibiotic_lines(&self, since: NaiveDate) -> SimrsResult<Vec<PendingLine>>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn list_team(&self, keyword: Option<&str>) -> SimrsResult<Vec<TeamMemberRow>>;

    async fn employee_exists(&self, nik: &str) -> SimrsResult<bool>;

    async fn team_member_by_nik(&self, nik: &str) -> SimrsResult<Option<TeamMemberRow>>;

    async fn team_member(&self, id: i64) -> SimrsResult<Option<TeamMemberRow>>;

    async fn insert_team_member(
        &self,
        nik: &str,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<TeamMemberRow>;

    async fn update_team_member(
        &self,
        id: i64,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<Option<TeamMemberRow>>;

    async fn delete_team_member(&self, id: i64) -> SimrsResult<bool>;
}

#[async_trait]
pub trait DrugMappingStore: Send + Sync {
    /// One page of mappings ordered by drug name, plus the total match count.
    async fn list_drug_mappings(
        &self,
        keyword: Option<&str>,
        page: u32,
        limit: u32,
    ) -> SimrsResult<(Vec<DrugMappingRow>, u64)>;

    async fn drug_exists(&self, kode_brng: &str) -> SimrsResult<bool>;

    async fn drug_name(&self, kode_brng: &str) -> SimrsResult<Option<String>>;

    async fn drug_mapping_by_drug(&self, kode_brng: &str) -> SimrsResult<Option<DrugMappingRow>>;

    async fn drug_mapping(&self, id: i64) -> SimrsResult<Option<DrugMappingRow>>;

    async fn insert_drug_mapping(
        &self,
        kode_brng: &str,
        fields: &DrugMappingFields,
    ) -> SimrsResult<DrugMappingRow>;

    async fn update_drug_mapping(
        &self,
        id: i64,
        fields: &DrugMappingFields,
    ) -> SimrsResult<Option<DrugMappingRow>>;

    async fn delete_drug_mapping(&self, id: i64) -> SimrsResult<bool>;

    /// Active drugs matching `keyword` by name or code that are not mapped yet.
    async fn search_unmapped_drugs(&self, keyword: &str, limit: u32) -> SimrsResult<Vec<DrugRow>>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Inpatient prescription lines of mapped antibiotics matching `filter`.
    async fn report_rows(&self, filter: &ReportFilter) -> SimrsResult<Vec<ReportSourceRow>>;

    /// Diagnoses of the given visits, in priority order.
    async fn diagnoses(&self, no_rawat: &[String]) -> SimrsResult<Vec<DiagnosisRow>>;

    /// Room stays of the given visits, ordered by admission date.
    async fn room_stays(&self, no_rawat: &[String]) -> SimrsResult<Vec<RoomStayRow>>;

    /// SOAP notes of a visit, newest first.
    async fn soap_entries(&self, no_rawat: &str) -> SimrsResult<Vec<SoapEntryRow>>;
}

#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn active_clinics(&self) -> SimrsResult<Vec<ClinicRow>>;

    /// Sum of schedule quotas of a clinic on an Indonesian weekday name (`SENIN`, ...).
    async fn clinic_quota(&self, kd_poli: &str, hari_kerja: &str) -> SimrsResult<i64>;

    /// Registrations of a clinic on a date, excluding cancelled ones.
    async fn registration_count(&self, kd_poli: &str, date: NaiveDate) -> SimrsResult<i64>;
}

/// Visits and the moments recorded for them, for Antrol task times.
#[async_trait]
pub trait AntrolStore: Send + Sync {
    async fn booking_reference(&self, nobooking: &str) -> SimrsResult<Option<BookingReference>>;

    async fn registration_exists(&self, no_rawat: &str) -> SimrsResult<bool>;

    /// The patient's last registration of the day by registration time.
    async fn latest_registration(
        &self,
        no_rkm_medis: &str,
        date: NaiveDate,
    ) -> SimrsResult<Option<String>>;

    async fn recorded_visit_times(&self, no_rawat: &str) -> SimrsResult<RecordedVisitTimes>;
}

/// Everything the services need from storage.
pub trait Store:
    HealthCheck
    + RosterStore
    + VerificationStore
    + NotificationStore
    + TeamStore
    + DrugMappingStore
    + ReportStore
    + QueueStore
    + AntrolStore
{
}

impl<T> Store for T where
    T: HealthCheck
        + RosterStore
        + VerificationStore
        + NotificationStore
        + TeamStore
        + DrugMappingStore
        + ReportStore
        + QueueStore
        + AntrolStore
{
}

pub type SharedStore = Arc<dyn Store>;
