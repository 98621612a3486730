//! In-memory store.
//!
//! Mirrors the subset of the hospital schema the services touch, with the same matching rules
//! as the SQL in [`super::mysql`]. Used by tests and for running the API without a database.

use super::{
    AntrolStore, DrugMappingStore, HealthCheck, NotificationStore, QueueStore, ReportStore,
    RosterStore, TeamStore, VerificationStore,
};
use crate::antrol::{BookingReference, RecordedVisitTimes};
use crate::constants::{JABATAN_KETUA, PHARMACIST_KEYWORDS, REGISTRATION_CANCELLED};
use crate::error::SimrsResult;
use crate::ppra::mapping::{DrugMappingFields, DrugMappingRow, DrugRow};
use crate::ppra::report::{
    DiagnosisRow, ReportFilter, ReportSourceRow, RoomStayRow, SoapEntryRow,
};
use crate::ppra::team::TeamMemberRow;
use crate::ppra::{
    NotificationLog, PendingLine, PrescriptionLineDetail, PrescriptionLineKey, RosterEntry,
    StaffContact, VerificationPatch, VerificationRecord,
};
use crate::queue::ClinicRow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A staff member (`petugas` joined with `pegawai`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaffRow {
    pub nip: String,
    pub nama: String,
    pub no_telp: Option<String>,
    pub jbtn: Option<String>,
    pub photo: Option<String>,
}

impl StaffRow {
    pub fn new(nip: &str, nama: &str, no_telp: Option<&str>) -> Self {
        Self {
            nip: nip.into(),
            nama: nama.into(),
            no_telp: no_telp.map(str::to_string),
            ..Self::default()
        }
    }

    fn phone_digits(&self) -> String {
        self.no_telp
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect()
    }

    fn has_phone(&self) -> bool {
        self.no_telp.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TeamRow {
    pub id: i64,
    pub nik: String,
    pub jabatan: String,
    pub role: Option<String>,
}

impl TeamRow {
    pub fn new(id: i64, nik: &str, jabatan: &str, role: Option<&str>) -> Self {
        Self {
            id,
            nik: nik.into(),
            jabatan: jabatan.into(),
            role: role.map(str::to_string),
        }
    }
}

/// A `databarang` row.
#[derive(Clone, Debug, PartialEq)]
pub struct DrugRecord {
    pub kode_brng: String,
    pub nama_brng: String,
    pub kode_sat: Option<String>,
    /// `1` when the drug is active.
    pub status: String,
}

impl DrugRecord {
    pub fn new(kode_brng: &str, nama_brng: &str, status: &str) -> Self {
        Self {
            kode_brng: kode_brng.into(),
            nama_brng: nama_brng.into(),
            kode_sat: None,
            status: status.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingRow {
    pub id: i64,
    pub kode_brng: String,
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    pub status_notif: Option<String>,
}

impl MappingRow {
    pub fn new(id: i64, kode_brng: &str, status_notif: Option<&str>) -> Self {
        Self {
            id,
            kode_brng: kode_brng.into(),
            status_notif: status_notif.map(str::to_string),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClinicRecord {
    pub kd_poli: String,
    pub nm_poli: String,
    pub status: String,
}

impl ClinicRecord {
    pub fn new(kd_poli: &str, nm_poli: &str, status: &str) -> Self {
        Self {
            kd_poli: kd_poli.into(),
            nm_poli: nm_poli.into(),
            status: status.into(),
        }
    }
}

/// A doctor schedule slot (`jadwal`).
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleRow {
    pub kd_poli: String,
    pub hari_kerja: String,
    pub kuota: i64,
}

impl ScheduleRow {
    pub fn new(kd_poli: &str, hari_kerja: &str, kuota: i64) -> Self {
        Self {
            kd_poli: kd_poli.into(),
            hari_kerja: hari_kerja.into(),
            kuota,
        }
    }
}

/// An outpatient registration (`reg_periksa`).
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationRow {
    pub kd_poli: String,
    pub tgl_registrasi: NaiveDate,
    pub stts: String,
}

impl RegistrationRow {
    pub fn new(kd_poli: &str, tgl_registrasi: NaiveDate, stts: &str) -> Self {
        Self {
            kd_poli: kd_poli.into(),
            tgl_registrasi,
            stts: stts.into(),
        }
    }
}

/// A visit (`reg_periksa`) as seen by the Antrol lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct VisitRow {
    pub no_rawat: String,
    pub no_rkm_medis: String,
    pub tgl_registrasi: NaiveDate,
    /// `HH:MM:SS`
    pub jam_reg: String,
}

impl VisitRow {
    pub fn new(no_rawat: &str, no_rkm_medis: &str, tgl_registrasi: NaiveDate, jam_reg: &str) -> Self {
        Self {
            no_rawat: no_rawat.into(),
            no_rkm_medis: no_rkm_medis.into(),
            tgl_registrasi,
            jam_reg: jam_reg.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTables {
    pub staff: Vec<StaffRow>,
    pub team: Vec<TeamRow>,
    pub verifications: Vec<VerificationRecord>,
    pub notification_logs: Vec<NotificationLog>,
    /// Keyed by `(no_resep, kode_brng)`.
    pub line_details: HashMap<(String, String), PrescriptionLineDetail>,
    pub pending_lines: Vec<PendingLine>,
    pub drugs: Vec<DrugRecord>,
    pub mappings: Vec<MappingRow>,
    pub report_rows: Vec<ReportSourceRow>,
    pub diagnoses: Vec<DiagnosisRow>,
    pub room_stays: Vec<RoomStayRow>,
    /// Keyed by `no_rawat`.
    pub soap_entries: HashMap<String, Vec<SoapEntryRow>>,
    pub clinics: Vec<ClinicRecord>,
    pub schedules: Vec<ScheduleRow>,
    pub registrations: Vec<RegistrationRow>,
    pub visits: Vec<VisitRow>,
    /// Keyed by `nobooking`.
    pub booking_references: HashMap<String, BookingReference>,
    /// Keyed by `no_rawat`; visits without an entry have nothing recorded.
    pub visit_times: HashMap<String, RecordedVisitTimes>,
}

impl MemoryTables {
    fn staff(&self, nip: &str) -> Option<&StaffRow> {
        self.staff.iter().find(|s| s.nip == nip)
    }

    fn team_member_row(&self, member: &TeamRow) -> TeamMemberRow {
        let staff = self.staff(&member.nik);
        TeamMemberRow {
            id: member.id,
            nik: member.nik.clone(),
            jabatan: member.jabatan.clone(),
            role: member.role.clone(),
            nama: staff.map(|s| s.nama.clone()),
            jbtn: staff.and_then(|s| s.jbtn.clone()),
            photo: staff.and_then(|s| s.photo.clone()),
        }
    }

    fn drug(&self, kode_brng: &str) -> Option<&DrugRecord> {
        self.drugs.iter().find(|d| d.kode_brng == kode_brng)
    }

    fn mapping_row(&self, mapping: &MappingRow) -> DrugMappingRow {
        let drug = self.drug(&mapping.kode_brng);
        DrugMappingRow {
            id: mapping.id,
            kode_brng: mapping.kode_brng.clone(),
            rute_pemberian: mapping.rute_pemberian.clone(),
            nilai_ddd_who: mapping.nilai_ddd_who.clone(),
            status_notif: mapping.status_notif.clone(),
            nama_brng: drug.map(|d| d.nama_brng.clone()),
            kode_sat: drug.and_then(|d| d.kode_sat.clone()),
        }
    }

    fn is_mapped(&self, kode_brng: &str) -> bool {
        self.mappings.iter().any(|m| m.kode_brng == kode_brng)
    }
}

/// Case-insensitive `LIKE '%needle%'`.
fn like(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` with exclusive access to the tables, for seeding and inspection.
    pub fn with_tables<R>(&self, f: impl FnOnce(&mut MemoryTables) -> R) -> R {
        f(&mut self.lock())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> SimrsResult<()> {
        Ok(())
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn find_roster_by_phone_suffix(&self, suffix: &str) -> SimrsResult<Option<RosterEntry>> {
        let t = self.lock();
        Ok(t.team.iter().find_map(|member| {
            let staff = t.staff(&member.nik)?;
            staff.phone_digits().ends_with(suffix).then(|| RosterEntry {
                nip: staff.nip.clone(),
                nama: Some(staff.nama.clone()),
                jabatan: member.jabatan.clone(),
                role: member.role.clone(),
            })
        }))
    }

    async fn find_chairman_contact(&self) -> SimrsResult<Option<StaffContact>> {
        let t = self.lock();
        Ok(t.team
            .iter()
            .filter(|m| m.jabatan == JABATAN_KETUA)
            .filter_map(|m| t.staff(&m.nik))
            .find(|s| s.has_phone())
            .map(|s| StaffContact {
                nama: s.nama.clone(),
                no_telp: s.no_telp.clone().unwrap_or_default(),
            }))
    }

    async fn pharmacist_contacts(&self) -> SimrsResult<Vec<StaffContact>> {
        let t = self.lock();
        Ok(t.team
            .iter()
            .filter(|m| {
                PHARMACIST_KEYWORDS
                    .iter()
                    .any(|kw| like(Some(m.jabatan.as_str()), kw))
            })
            .filter_map(|m| t.staff(&m.nik))
            .filter(|s| s.has_phone())
            .map(|s| StaffContact {
                nama: s.nama.clone(),
                no_telp: s.no_telp.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn staff_name(&self, nip: &str) -> SimrsResult<Option<String>> {
        Ok(self.lock().staff(nip).map(|s| s.nama.clone()))
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn upsert_verification(
        &self,
        key: &PrescriptionLineKey,
        patch: &VerificationPatch,
        now: NaiveDateTime,
    ) -> SimrsResult<VerificationRecord> {
        let mut t = self.lock();
        let pos = t.verifications.iter().position(|r| {
            r.no_resep == key.no_resep.as_str() && r.kode_brng == key.kode_brng.as_str()
        });
        let pos = match pos {
            Some(pos) => pos,
            None => {
                t.verifications.push(VerificationRecord::empty(key));
                t.verifications.len() - 1
            }
        };
        let record = &mut t.verifications[pos];
        record.apply(patch, now);
        Ok(record.clone())
    }

    async fn find_verification(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<VerificationRecord>> {
        Ok(self
            .lock()
            .verifications
            .iter()
            .find(|r| r.no_resep == key.no_resep.as_str() && r.kode_brng == key.kode_brng.as_str())
            .cloned())
    }

    async fn prescription_line_detail(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<PrescriptionLineDetail>> {
        let lookup = (key.no_resep.to_string(), key.kode_brng.to_string());
        Ok(self.lock().line_details.get(&lookup).cloned())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn find_notification_by_code(&self, code: &str) -> SimrsResult<Option<NotificationLog>> {
        Ok(self
            .lock()
            .notification_logs
            .iter()
            .find(|l| l.short_code == code)
            .cloned())
    }

    async fn find_notification_for_line(
        &self,
        key: &PrescriptionLineKey,
    ) -> SimrsResult<Option<NotificationLog>> {
        Ok(self
            .lock()
            .notification_logs
            .iter()
            .find(|l| l.no_resep == key.no_resep.as_str() && l.kode_brng == key.kode_brng.as_str())
            .cloned())
    }

    async fn short_code_in_use(&self, code: &str, since: NaiveDateTime) -> SimrsResult<bool> {
        Ok(self
            .lock()
            .notification_logs
            .iter()
            .any(|l| l.short_code == code && l.tgl_notif >= since))
    }

    async fn insert_notification(&self, log: &NotificationLog) -> SimrsResult<()> {
        self.lock().notification_logs.push(log.clone());
        Ok(())
    }

    async fn pending_antibiotic_lines(&self, since: NaiveDate) -> SimrsResult<Vec<PendingLine>> {
        let t = self.lock();
        Ok(t.pending_lines
            .iter()
            .filter(|line| line.tgl_perawatan >= since)
            .filter(|line| {
                t.mappings
                    .iter()
                    .any(|m| m.kode_brng == line.kode_brng && m.status_notif.as_deref() == Some("1"))
            })
            .filter(|line| {
                !t.notification_logs
                    .iter()
                    .any(|l| l.no_resep == line.no_resep && l.kode_brng == line.kode_brng)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn list_team(&self, keyword: Option<&str>) -> SimrsResult<Vec<TeamMemberRow>> {
        let t = self.lock();
        Ok(t.team
            .iter()
            .map(|m| t.team_member_row(m))
            .filter(|row| match keyword {
                None => true,
                Some(kw) => {
                    like(Some(row.jabatan.as_str()), kw)
                        || like(row.role.as_deref(), kw)
                        || like(row.nama.as_deref(), kw)
                        || like(Some(row.nik.as_str()), kw)
                }
            })
            .collect())
    }

    async fn employee_exists(&self, nik: &str) -> SimrsResult<bool> {
        Ok(self.lock().staff(nik).is_some())
    }

    async fn team_member_by_nik(&self, nik: &str) -> SimrsResult<Option<TeamMemberRow>> {
        let t = self.lock();
        Ok(t.team
            .iter()
            .find(|m| m.nik == nik)
            .map(|m| t.team_member_row(m)))
    }

    async fn team_member(&self, id: i64) -> SimrsResult<Option<TeamMemberRow>> {
        let t = self.lock();
        Ok(t.team
            .iter()
            .find(|m| m.id == id)
            .map(|m| t.team_member_row(m)))
    }

    async fn insert_team_member(
        &self,
        nik: &str,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<TeamMemberRow> {
        let mut t = self.lock();
        let id = t.team.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let member = TeamRow::new(id, nik, jabatan, role);
        let row = t.team_member_row(&member);
        t.team.push(member);
        Ok(row)
    }

    async fn update_team_member(
        &self,
        id: i64,
        jabatan: &str,
        role: Option<&str>,
    ) -> SimrsResult<Option<TeamMemberRow>> {
        let mut t = self.lock();
        let Some(member) = t.team.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        member.jabatan = jabatan.to_string();
        member.role = role.map(str::to_string);
        let member = member.clone();
        Ok(Some(t.team_member_row(&member)))
    }

    async fn delete_team_member(&self, id: i64) -> SimrsResult<bool> {
        let mut t = self.lock();
        let before = t.team.len();
        t.team.retain(|m| m.id != id);
        Ok(t.team.len() != before)
    }
}

#[async_trait]
impl DrugMappingStore for MemoryStore {
    async fn list_drug_mappings(
        &self,
        keyword: Option<&str>,
        page: u32,
        limit: u32,
    ) -> SimrsResult<(Vec<DrugMappingRow>, u64)> {
        let t = self.lock();
        let mut rows: Vec<DrugMappingRow> = t
            .mappings
            .iter()
            .filter(|m| t.drug(&m.kode_brng).is_some())
            .map(|m| t.mapping_row(m))
            .filter(|row| match keyword {
                None => true,
                Some(kw) => {
                    like(row.rute_pemberian.as_deref(), kw)
                        || like(row.nama_brng.as_deref(), kw)
                        || like(Some(row.kode_brng.as_str()), kw)
                }
            })
            .collect();
        rows.sort_by(|a, b| a.nama_brng.cmp(&b.nama_brng));

        let total = rows.len() as u64;
        let offset = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let page_rows = rows.into_iter().skip(offset).take(limit as usize).collect();
        Ok((page_rows, total))
    }

    async fn drug_exists(&self, kode_brng: &str) -> SimrsResult<bool> {
        Ok(self.lock().drug(kode_brng).is_some())
    }

    async fn drug_name(&self, kode_brng: &str) -> SimrsResult<Option<String>> {
        Ok(self.lock().drug(kode_brng).map(|d| d.nama_brng.clone()))
    }

    async fn drug_mapping_by_drug(&self, kode_brng: &str) -> SimrsResult<Option<DrugMappingRow>> {
        let t = self.lock();
        Ok(t.mappings
            .iter()
            .find(|m| m.kode_brng == kode_brng)
            .map(|m| t.mapping_row(m)))
    }

    async fn drug_mapping(&self, id: i64) -> SimrsResult<Option<DrugMappingRow>> {
        let t = self.lock();
        Ok(t.mappings
            .iter()
            .find(|m| m.id == id)
            .map(|m| t.mapping_row(m)))
    }

    async fn insert_drug_mapping(
        &self,
        kode_brng: &str,
        fields: &DrugMappingFields,
    ) -> SimrsResult<DrugMappingRow> {
        let mut t = self.lock();
        let id = t.mappings.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let mapping = MappingRow {
            id,
            kode_brng: kode_brng.to_string(),
            rute_pemberian: fields.rute_pemberian.clone(),
            nilai_ddd_who: fields.nilai_ddd_who.clone(),
            status_notif: fields.status_notif.clone(),
        };
        let row = t.mapping_row(&mapping);
        t.mappings.push(mapping);
        Ok(row)
    }

    async fn update_drug_mapping(
        &self,
        id: i64,
        fields: &DrugMappingFields,
    ) -> SimrsResult<Option<DrugMappingRow>> {
        let mut t = self.lock();
        let Some(pos) = t.mappings.iter().position(|m| m.id == id) else {
            return Ok(None);
        };
        let mut row = t.mapping_row(&t.mappings[pos]);
        fields.apply_to(&mut row);
        let mapping = &mut t.mappings[pos];
        mapping.rute_pemberian = row.rute_pemberian.clone();
        mapping.nilai_ddd_who = row.nilai_ddd_who.clone();
        mapping.status_notif = row.status_notif.clone();
        Ok(Some(row))
    }

    async fn delete_drug_mapping(&self, id: i64) -> SimrsResult<bool> {
        let mut t = self.lock();
        let before = t.mappings.len();
        t.mappings.retain(|m| m.id != id);
        Ok(t.mappings.len() != before)
    }

    async fn search_unmapped_drugs(&self, keyword: &str, limit: u32) -> SimrsResult<Vec<DrugRow>> {
        let t = self.lock();
        Ok(t.drugs
            .iter()
            .filter(|d| d.status == "1")
            .filter(|d| {
                like(Some(d.nama_brng.as_str()), keyword)
                    || like(Some(d.kode_brng.as_str()), keyword)
            })
            .filter(|d| !t.is_mapped(&d.kode_brng))
            .take(limit as usize)
            .map(|d| DrugRow {
                kode_brng: d.kode_brng.clone(),
                nama_brng: d.nama_brng.clone(),
                kode_sat: d.kode_sat.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn report_rows(&self, filter: &ReportFilter) -> SimrsResult<Vec<ReportSourceRow>> {
        Ok(self
            .lock()
            .report_rows
            .iter()
            .filter(|r| r.tgl_perawatan >= filter.start && r.tgl_perawatan <= filter.end)
            .filter(|r| r.status.to_lowercase().starts_with("ranap"))
            .filter(|r| {
                filter
                    .kd_sps
                    .as_deref()
                    .is_none_or(|sps| r.kd_sps.as_deref() == Some(sps))
            })
            .filter(|r| {
                filter
                    .kd_dokter
                    .as_deref()
                    .is_none_or(|dokter| r.kd_dokter == dokter)
            })
            .filter(|r| {
                filter.search.as_deref().is_none_or(|s| {
                    like(Some(r.nm_pasien.as_str()), s)
                        || like(Some(r.no_rkm_medis.as_str()), s)
                        || like(Some(r.no_rawat.as_str()), s)
                })
            })
            .cloned()
            .collect())
    }

    async fn diagnoses(&self, no_rawat: &[String]) -> SimrsResult<Vec<DiagnosisRow>> {
        Ok(self
            .lock()
            .diagnoses
            .iter()
            .filter(|d| no_rawat.contains(&d.no_rawat))
            .cloned()
            .collect())
    }

    async fn room_stays(&self, no_rawat: &[String]) -> SimrsResult<Vec<RoomStayRow>> {
        let mut stays: Vec<RoomStayRow> = self
            .lock()
            .room_stays
            .iter()
            .filter(|s| no_rawat.contains(&s.no_rawat))
            .cloned()
            .collect();
        stays.sort_by(|a, b| a.tgl_masuk.cmp(&b.tgl_masuk));
        Ok(stays)
    }

    async fn soap_entries(&self, no_rawat: &str) -> SimrsResult<Vec<SoapEntryRow>> {
        let mut entries = self
            .lock()
            .soap_entries
            .get(no_rawat)
            .cloned()
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            (b.tgl_perawatan, &b.jam_rawat).cmp(&(a.tgl_perawatan, &a.jam_rawat))
        });
        Ok(entries)
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn active_clinics(&self) -> SimrsResult<Vec<ClinicRow>> {
        let mut clinics: Vec<ClinicRow> = self
            .lock()
            .clinics
            .iter()
            .filter(|c| c.status == "1" && c.kd_poli != "-")
            .map(|c| ClinicRow {
                kd_poli: c.kd_poli.clone(),
                nm_poli: c.nm_poli.clone(),
            })
            .collect();
        clinics.sort_by(|a, b| a.nm_poli.cmp(&b.nm_poli));
        Ok(clinics)
    }

    async fn clinic_quota(&self, kd_poli: &str, hari_kerja: &str) -> SimrsResult<i64> {
        Ok(self
            .lock()
            .schedules
            .iter()
            .filter(|s| s.kd_poli == kd_poli && s.hari_kerja == hari_kerja)
            .map(|s| s.kuota)
            .sum())
    }

    async fn registration_count(&self, kd_poli: &str, date: NaiveDate) -> SimrsResult<i64> {
        let count = self
            .lock()
            .registrations
            .iter()
            .filter(|r| r.kd_poli == kd_poli && r.tgl_registrasi == date)
            .filter(|r| r.stts != REGISTRATION_CANCELLED)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl AntrolStore for MemoryStore {
    async fn booking_reference(&self, nobooking: &str) -> SimrsResult<Option<BookingReference>> {
        Ok(self.lock().booking_references.get(nobooking).cloned())
    }

    async fn registration_exists(&self, no_rawat: &str) -> SimrsResult<bool> {
        Ok(self.lock().visits.iter().any(|v| v.no_rawat == no_rawat))
    }

    async fn latest_registration(
        &self,
        no_rkm_medis: &str,
        date: NaiveDate,
    ) -> SimrsResult<Option<String>> {
        Ok(self
            .lock()
            .visits
            .iter()
            .filter(|v| v.no_rkm_medis == no_rkm_medis && v.tgl_registrasi == date)
            .max_by(|a, b| a.jam_reg.cmp(&b.jam_reg))
            .map(|v| v.no_rawat.clone()))
    }

    async fn recorded_visit_times(&self, no_rawat: &str) -> SimrsResult<RecordedVisitTimes> {
        Ok(self
            .lock()
            .visit_times
            .get(no_rawat)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn phone_suffix_matching_ignores_formatting() {
        let store = MemoryStore::new();
        store.with_tables(|t| {
            t.staff.push(StaffRow::new("A1", "apt. Dewi", Some("+62 812-3456-7890")));
            t.team.push(TeamRow::new(1, "A1", "Anggota", Some("Apoteker")));
        });

        let found = store
            .find_roster_by_phone_suffix("1234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.nip, "A1");
        assert!(found.is_pharmacist());
        assert!(store
            .find_roster_by_phone_suffix("0000000000")
            .await
            .unwrap()
            .is_none());

        store.with_tables(|t| {
            t.staff.push(StaffRow::new("A2", "apt. Budi", Some("(0812) 9876.5432")));
            t.team.push(TeamRow::new(2, "A2", "Anggota", Some("Apoteker")));
        });
        let bracketed = store
            .find_roster_by_phone_suffix("1298765432")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bracketed.nip, "A2");
    }

    #[tokio::test]
    async fn upsert_creates_once_and_keeps_other_stage_columns() {
        let store = MemoryStore::new();
        let key = PrescriptionLineKey::new("R1", "B1").unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        store
            .upsert_verification(
                &key,
                &VerificationPatch::Adjustment {
                    aturan_pakai: Some("3x1".into()),
                    keterangan: None,
                    actor: "u1".into(),
                },
                at,
            )
            .await
            .unwrap();
        let after = store
            .upsert_verification(
                &key,
                &VerificationPatch::Review(crate::ppra::StageDecision {
                    actor: "apt".into(),
                    status: "SESUAI".into(),
                    note: None,
                }),
                at,
            )
            .await
            .unwrap();

        assert_eq!(after.aturan_pakai.as_deref(), Some("3x1"));
        assert_eq!(after.status_telaah.as_deref(), Some("SESUAI"));
        assert_eq!(store.with_tables(|t| t.verifications.len()), 1);
    }

    #[tokio::test]
    async fn soap_entries_are_newest_first() {
        let store = MemoryStore::new();
        let day = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();
        store.with_tables(|t| {
            t.soap_entries.insert(
                "V1".into(),
                vec![
                    SoapEntryRow {
                        tgl_perawatan: day(17),
                        jam_rawat: "08:00:00".into(),
                        rtl: None,
                    },
                    SoapEntryRow {
                        tgl_perawatan: day(18),
                        jam_rawat: "07:00:00".into(),
                        rtl: None,
                    },
                    SoapEntryRow {
                        tgl_perawatan: day(18),
                        jam_rawat: "20:00:00".into(),
                        rtl: None,
                    },
                ],
            );
        });
        let entries = store.soap_entries("V1").await.unwrap();
        let order: Vec<_> = entries
            .iter()
            .map(|e| (e.tgl_perawatan, e.jam_rawat.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(day(18), "20:00:00"), (day(18), "07:00:00"), (day(17), "08:00:00")]
        );
    }
}
