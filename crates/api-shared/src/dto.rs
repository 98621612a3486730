//! Request and response types of the SIMRS REST API.
//!
//! Field names follow the column names of the hospital database because the existing front
//! ends already consume them in that form.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Accepts `"1"`, `1` or `true` style flags and stores them as text.
fn flag_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Number(i64),
        Bool(bool),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => None,
        Some(Flag::Text(s)) => Some(s),
        Some(Flag::Number(n)) => Some(n.to_string()),
        Some(Flag::Bool(b)) => Some(if b { "1" } else { "0" }.to_string()),
    })
}

// ============================================================================
// HEALTH
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<bool>,
}

// ============================================================================
// PPRA VERIFICATION
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerificationKeyQuery {
    #[serde(default)]
    pub no_resep: String,
    #[serde(default)]
    pub kode_brng: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SaveAdjustmentReq {
    #[serde(default)]
    pub no_resep: String,
    #[serde(default)]
    pub kode_brng: String,
    pub aturan_pakai: Option<String>,
    pub keterangan: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReviewReq {
    #[serde(default)]
    pub no_resep: String,
    #[serde(default)]
    pub kode_brng: String,
    /// `SESUAI` or `TIDAK SESUAI`.
    #[serde(default)]
    pub status_telaah: String,
    pub catatan_telaah: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ApproveReq {
    #[serde(default)]
    pub no_resep: String,
    #[serde(default)]
    pub kode_brng: String,
    /// `ACC` or `REJECT`.
    #[serde(default)]
    pub status_persetujuan: String,
    pub catatan_persetujuan: Option<String>,
}

/// A WhatsApp reply relayed by the automation service.
///
/// The relay normally splits the reply into `command`, `code` and `comment`; when it only
/// forwards the raw text, `text` is parsed instead (`"ACC 1234 dosis sesuai"`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct WhatsappReplyReq {
    pub command: Option<String>,
    pub code: Option<String>,
    pub comment: Option<String>,
    pub sender: Option<String>,
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Verification {
    pub no_resep: String,
    pub kode_brng: String,
    pub aturan_pakai: Option<String>,
    pub keterangan: Option<String>,
    pub nik_petugas: Option<String>,
    pub petugas_telaah: Option<String>,
    pub status_telaah: Option<String>,
    pub catatan_telaah: Option<String>,
    pub tgl_telaah: Option<NaiveDateTime>,
    pub petugas_persetujuan: Option<String>,
    pub status_persetujuan: Option<String>,
    pub catatan_persetujuan: Option<String>,
    pub tgl_persetujuan: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WhatsappReplyRes {
    pub no_resep: String,
    pub kode_brng: String,
    /// Roster position of the sender.
    pub role: String,
    /// Upper-cased reply command.
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DispatchSummary {
    /// Antibiotic prescription lines without a notification yet.
    pub found: usize,
    /// Lines for which at least one recipient was reached.
    pub notified: usize,
    /// Lines no recipient could be reached for.
    pub failed: usize,
}

// ============================================================================
// PPRA TEAM
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KeywordQuery {
    pub keyword: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateTeamMemberReq {
    #[serde(default)]
    pub nik: String,
    #[serde(default)]
    pub jabatan: String,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTeamMemberReq {
    #[serde(default)]
    pub jabatan: String,
    pub role: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub nik: String,
    pub nama: String,
    pub jbtn: Option<String>,
    pub photo: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TeamMember {
    pub id: i64,
    pub nik: String,
    pub jabatan: String,
    pub role: Option<String>,
    pub pegawai: Option<Employee>,
}

// ============================================================================
// PPRA DRUG MAPPING
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DrugMappingListQuery {
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateDrugMappingReq {
    #[serde(default)]
    pub kode_brng: String,
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    /// `0` or `1`; only mapped drugs flagged `1` trigger WhatsApp notifications.
    #[serde(default, deserialize_with = "flag_as_string")]
    pub status_notif: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDrugMappingReq {
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    #[serde(default, deserialize_with = "flag_as_string")]
    pub status_notif: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Drug {
    pub kode_brng: String,
    pub nama_brng: String,
    pub kode_sat: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DrugMapping {
    pub id: i64,
    pub kode_brng: String,
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    pub status_notif: Option<String>,
    pub barang: Option<Drug>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DrugMappingPage {
    pub data: Vec<DrugMapping>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

// ============================================================================
// PPRA REPORT
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub tgl_awal: Option<NaiveDate>,
    pub tgl_akhir: Option<NaiveDate>,
    pub kd_sps: Option<String>,
    pub kd_dokter: Option<String>,
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SoapSuggestionQuery {
    pub no_rawat: Option<String>,
    pub kode_brng: Option<String>,
}

/// One antibiotic line of the PPRA report, flattened for table display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PpraReportRow {
    pub no_rawat: String,
    pub no_resep: String,
    pub kode_brng: String,
    /// Patient name with age suffix, e.g. `Siti (3 th)`.
    pub nm_pasien: String,
    pub no_rkm_medis: String,
    pub nm_dokter: String,
    pub tgl_masuk: String,
    pub diagnosa: String,
    pub los: String,
    pub jenis_ab: String,
    pub tgl_pemberian: NaiveDate,
    pub rute: Option<String>,
    pub penggunaan_harian: String,
    pub status_telaah: String,
    pub status_persetujuan: String,
    pub catatan_telaah: Option<String>,
    pub catatan_persetujuan: Option<String>,
    pub total_pakai: String,
    pub ddd_factor: f64,
    pub total_ddd: f64,
    /// `true` on the first row of each visit.
    pub is_new_patient: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SoapSuggestion {
    pub tgl: NaiveDate,
    pub jam: String,
    pub raw_text: String,
    pub suggestion: String,
}

// ============================================================================
// OUTPATIENT QUEUE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueDay {
    pub tanggal: NaiveDate,
    pub hari: String,
    pub kuota: i64,
    pub terisi: i64,
    pub tersedia: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClinicQueue {
    pub kd_poli: String,
    pub nm_poli: String,
    pub days: Vec<QueueDay>,
}

// ============================================================================
// BPJS ANTROL TASK TIMES
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AntrolTaskSyncReq {
    /// Antrol booking code, or the visit's `no_rawat` for walk-in registrations.
    #[serde(default)]
    pub kodebooking: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AntrolTaskSyncBulkReq {
    #[serde(default)]
    pub kodebookings: Vec<String>,
}

/// One `antrean/updatewaktu` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AntrolTaskUpdate {
    pub kodebooking: String,
    pub taskid: u8,
    /// Epoch milliseconds.
    pub waktu: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AntrolTaskSync {
    pub kodebooking: String,
    /// The visit the booking resolved to; absent when it could not be found.
    pub no_rawat: Option<String>,
    pub tasks: Vec<AntrolTaskUpdate>,
    /// Why no tasks were produced, for bulk requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
