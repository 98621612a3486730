//! PPRA (antimicrobial stewardship) workflow.
//!
//! One antibiotic line of one prescription, addressed by `(no_resep, kode_brng)`, moves
//! through three stages whose outcomes are columns on a single verification row:
//!
//! 1. dosage adjustment by the ward (`aturan_pakai`, `keterangan`)
//! 2. pharmacist review, *telaah* (`SESUAI` / `TIDAK SESUAI`)
//! 3. chairman approval, *persetujuan* (`ACC` / `REJECT`)
//!
//! Every stage upserts the same row; the row is created by whichever stage touches it first.
//! Stages can be advanced over HTTP by an authenticated user or by a WhatsApp reply carrying
//! the four-digit short code from the notification that announced the prescription.

pub mod mapping;
pub mod notification;
pub mod report;
pub mod team;
pub mod verification;

use crate::constants::PHARMACIST_KEYWORDS;
use crate::error::SimrsResult;
use api_shared::dto;
use chrono::{NaiveDate, NaiveDateTime};
use simrs_types::NonEmptyText;

/// Composite key of a prescription antibiotic line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PrescriptionLineKey {
    pub no_resep: NonEmptyText,
    pub kode_brng: NonEmptyText,
}

impl PrescriptionLineKey {
    /// Validates both parts of the key.
    ///
    /// # Errors
    /// Returns `SimrsError::InvalidInput` naming the blank field.
    pub fn new(no_resep: impl AsRef<str>, kode_brng: impl AsRef<str>) -> SimrsResult<Self> {
        let no_resep = NonEmptyText::new(no_resep).map_err(|_| {
            crate::SimrsError::InvalidInput("no_resep is required".into())
        })?;
        let kode_brng = NonEmptyText::new(kode_brng).map_err(|_| {
            crate::SimrsError::InvalidInput("kode_brng is required".into())
        })?;
        Ok(Self {
            no_resep,
            kode_brng,
        })
    }
}

impl std::fmt::Display for PrescriptionLineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.no_resep, self.kode_brng)
    }
}

/// The stored verification row.
#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct VerificationRecord {
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

/// The outcome of a review or approval stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageDecision {
    pub actor: String,
    pub status: String,
    pub note: Option<String>,
}

/// The columns one stage writes. Columns of the other stages are left untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum VerificationPatch {
    Adjustment {
        aturan_pakai: Option<String>,
        keterangan: Option<String>,
        actor: String,
    },
    Review(StageDecision),
    Approval(StageDecision),
}

impl VerificationRecord {
    /// A fresh row for `key`, as created by the first stage that touches it.
    pub fn empty(key: &PrescriptionLineKey) -> Self {
        Self {
            no_resep: key.no_resep.to_string(),
            kode_brng: key.kode_brng.to_string(),
            ..Self::default()
        }
    }

    /// Writes the columns of one stage.
    pub fn apply(&mut self, patch: &VerificationPatch, now: NaiveDateTime) {
        match patch {
            VerificationPatch::Adjustment {
                aturan_pakai,
                keterangan,
                actor,
            } => {
                self.aturan_pakai = aturan_pakai.clone();
                self.keterangan = keterangan.clone();
                self.nik_petugas = Some(actor.clone());
            }
            VerificationPatch::Review(decision) => {
                self.petugas_telaah = Some(decision.actor.clone());
                self.status_telaah = Some(decision.status.clone());
                self.catatan_telaah = decision.note.clone();
                self.tgl_telaah = Some(now);
            }
            VerificationPatch::Approval(decision) => {
                self.petugas_persetujuan = Some(decision.actor.clone());
                self.status_persetujuan = Some(decision.status.clone());
                self.catatan_persetujuan = decision.note.clone();
                self.tgl_persetujuan = Some(now);
            }
        }
        self.updated_at = Some(now);
    }
}

impl From<VerificationRecord> for dto::Verification {
    fn from(r: VerificationRecord) -> Self {
        dto::Verification {
            no_resep: r.no_resep,
            kode_brng: r.kode_brng,
            aturan_pakai: r.aturan_pakai,
            keterangan: r.keterangan,
            nik_petugas: r.nik_petugas,
            petugas_telaah: r.petugas_telaah,
            status_telaah: r.status_telaah,
            catatan_telaah: r.catatan_telaah,
            tgl_telaah: r.tgl_telaah,
            petugas_persetujuan: r.petugas_persetujuan,
            status_persetujuan: r.status_persetujuan,
            catatan_persetujuan: r.catatan_persetujuan,
            tgl_persetujuan: r.tgl_persetujuan,
            updated_at: r.updated_at,
        }
    }
}

/// A PPRA team member joined with their staff record.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct RosterEntry {
    pub nip: String,
    pub nama: Option<String>,
    pub jabatan: String,
    pub role: Option<String>,
}

impl RosterEntry {
    /// Pharmacists review; everyone else on the roster approves.
    pub fn is_pharmacist(&self) -> bool {
        let jabatan = self.jabatan.to_lowercase();
        let role = self.role.as_deref().unwrap_or_default().to_lowercase();
        PHARMACIST_KEYWORDS
            .iter()
            .any(|kw| jabatan.contains(kw) || role.contains(kw))
    }
}

/// Name and phone of a staff member who receives WhatsApp messages.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct StaffContact {
    pub nama: String,
    pub no_telp: String,
}

/// Record of the short code sent for a prescription line.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct NotificationLog {
    pub no_resep: String,
    pub kode_brng: String,
    pub short_code: String,
    pub tgl_notif: NaiveDateTime,
    pub status_notif: String,
}

/// Patient and drug details of a prescription line, as shown to the chairman.
#[derive(Clone, Debug, PartialEq)]
pub struct PrescriptionLineDetail {
    pub no_resep: String,
    pub nama_brng: String,
    pub aturan_pakai: Option<String>,
    pub nm_pasien: String,
    pub tgl_lahir: Option<NaiveDate>,
    pub berat_badan: Option<f64>,
}

/// A mapped antibiotic prescription line that has not been announced yet.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct PendingLine {
    pub no_resep: String,
    pub kode_brng: String,
    pub nama_brng: String,
    pub aturan_pakai: Option<String>,
    pub jml: Option<f64>,
    pub nm_pasien: String,
    pub no_rawat: String,
    pub no_rkm_medis: String,
    pub tgl_perawatan: NaiveDate,
}
