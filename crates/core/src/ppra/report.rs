//! PPRA antibiotic usage report.
//!
//! Inpatient prescription lines of mapped antibiotics are grouped per visit and per
//! antibiotic/route/day, then flattened back into table rows with length of stay, daily dose
//! and defined-daily-dose totals.

use crate::constants::{PERSETUJUAN_PENDING, TELAAH_BELUM};
use crate::dosage::{extract_dosage_suggestion, format_daily_dose, format_number};
use crate::error::{SimrsError, SimrsResult};
use crate::patient::{age_in_years, parse_khanza_date};
use crate::store::SharedStore;
use crate::Clock;
use api_shared::dto::{PpraReportRow, ReportQuery, SoapSuggestion, SoapSuggestionQuery};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

/// Report selection after defaults were applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kd_sps: Option<String>,
    pub kd_dokter: Option<String>,
    /// Matched against patient name, medical record number and visit number.
    pub search: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ReportFilter {
    /// Defaults the range to the current month up to `today`.
    pub fn from_query(query: ReportQuery, today: NaiveDate) -> Self {
        let month_start = today.with_day(1).unwrap_or(today);
        Self {
            start: query.tgl_awal.unwrap_or(month_start),
            end: query.tgl_akhir.unwrap_or(today),
            kd_sps: non_blank(query.kd_sps),
            kd_dokter: non_blank(query.kd_dokter),
            search: non_blank(query.search),
        }
    }
}

/// One dispensed line of a mapped antibiotic, as selected for the report.
#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct ReportSourceRow {
    pub no_resep: String,
    pub no_rawat: String,
    pub nm_pasien: String,
    pub no_rkm_medis: String,
    pub nm_dokter: String,
    pub kd_dokter: String,
    pub kd_sps: Option<String>,
    pub tgl_lahir: Option<String>,
    pub kode_brng: String,
    pub nama_brng: String,
    pub rute_pemberian: Option<String>,
    pub nilai_ddd_who: Option<String>,
    pub aturan_pakai_dokter: Option<String>,
    pub jml: Option<f64>,
    pub aturan_pakai_verif: Option<String>,
    pub status_telaah: Option<String>,
    pub status_persetujuan: Option<String>,
    pub catatan_telaah: Option<String>,
    pub catatan_persetujuan: Option<String>,
    pub tgl_perawatan: NaiveDate,
    pub jam: Option<String>,
    /// Prescription status, e.g. `ranap` or `ralan`.
    pub status: String,
    pub kode_sat: Option<String>,
    pub isi: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct DiagnosisRow {
    pub no_rawat: String,
    pub nm_penyakit: String,
}

/// One room stay; dates and times come as text because the schema allows zero dates.
#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct RoomStayRow {
    pub no_rawat: String,
    pub tgl_masuk: Option<String>,
    pub jam_masuk: Option<String>,
    pub tgl_keluar: Option<String>,
    pub jam_keluar: Option<String>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct SoapEntryRow {
    pub tgl_perawatan: NaiveDate,
    pub jam_rawat: String,
    /// Follow-up plan (`rtl`) free text, one instruction per line.
    pub rtl: Option<String>,
}

fn parse_time(raw: Option<&str>) -> NaiveTime {
    raw.and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S").ok())
        .unwrap_or(NaiveTime::MIN)
}

/// Admission date and whole days of stay.
///
/// Counts from the first admission to the last discharge, or to `now` while the patient is
/// still admitted. A known admission always counts at least one day; no usable admission
/// yields `("-", 0)`.
pub fn length_of_stay(stays: &[&RoomStayRow], now: NaiveDateTime) -> (String, i64) {
    let (Some(first), Some(last)) = (stays.first(), stays.last()) else {
        return ("-".into(), 0);
    };
    let Some(admitted) = parse_khanza_date(first.tgl_masuk.as_deref()) else {
        return ("-".into(), 0);
    };

    let start = admitted.and_time(parse_time(first.jam_masuk.as_deref()));
    let end = parse_khanza_date(last.tgl_keluar.as_deref())
        .map(|d| d.and_time(parse_time(last.jam_keluar.as_deref())))
        .unwrap_or(now);

    let days = (end - start).num_days().abs().max(1);
    (admitted.format("%Y-%m-%d").to_string(), days)
}

/// WHO defined daily dose from its text column; anything unparsable counts as zero.
fn ddd_factor(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().replace(',', ".").parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct AntibioticGroup {
    key: (String, Option<String>, NaiveDate),
    first: ReportSourceRow,
    jml_total: f64,
}

struct VisitGroup {
    first: ReportSourceRow,
    antibiotics: Vec<AntibioticGroup>,
}

/// Groups and flattens report source rows.
///
/// Visits keep the order in which they first appear in `rows`; so do antibiotic groups inside
/// a visit. The doctor's dosage rule is preferred over the adjusted one.
pub fn build_report(
    rows: Vec<ReportSourceRow>,
    diagnoses: &[DiagnosisRow],
    stays: &[RoomStayRow],
    now: NaiveDateTime,
) -> Vec<PpraReportRow> {
    let mut visits: Vec<VisitGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let pos = *index.entry(row.no_rawat.clone()).or_insert_with(|| {
            visits.push(VisitGroup {
                first: row.clone(),
                antibiotics: Vec::new(),
            });
            visits.len() - 1
        });
        let visit = &mut visits[pos];

        let key = (
            row.nama_brng.clone(),
            row.rute_pemberian.clone(),
            row.tgl_perawatan,
        );
        let jml = row.jml.unwrap_or(0.0);
        match visit.antibiotics.iter_mut().find(|g| g.key == key) {
            Some(group) => group.jml_total += jml,
            None => visit.antibiotics.push(AntibioticGroup {
                key,
                first: row,
                jml_total: jml,
            }),
        }
    }

    let today = now.date();
    let mut out = Vec::new();
    for visit in visits {
        let v = &visit.first;
        let diagnosa = diagnoses
            .iter()
            .filter(|d| d.no_rawat == v.no_rawat)
            .map(|d| d.nm_penyakit.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let visit_stays: Vec<&RoomStayRow> =
            stays.iter().filter(|s| s.no_rawat == v.no_rawat).collect();
        let (tgl_masuk, los) = length_of_stay(&visit_stays, now);
        let age = age_in_years(parse_khanza_date(v.tgl_lahir.as_deref()), today);
        let nm_pasien = format!("{} ({} th)", v.nm_pasien, age);

        for (i, group) in visit.antibiotics.into_iter().enumerate() {
            let ab = group.first;
            let rule = ab
                .aturan_pakai_dokter
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .or(ab.aturan_pakai_verif.as_deref());
            let factor = ddd_factor(ab.nilai_ddd_who.as_deref());
            let ddd = if factor > 0.0 {
                group.jml_total * ab.isi.unwrap_or(0.0) / factor
            } else {
                0.0
            };
            let total_pakai = format!(
                "{} {}",
                format_number(group.jml_total),
                ab.kode_sat.as_deref().unwrap_or_default()
            )
            .trim_end()
            .to_string();

            out.push(PpraReportRow {
                no_rawat: v.no_rawat.clone(),
                no_resep: ab.no_resep,
                kode_brng: ab.kode_brng,
                nm_pasien: nm_pasien.clone(),
                no_rkm_medis: v.no_rkm_medis.clone(),
                nm_dokter: v.nm_dokter.clone(),
                tgl_masuk: tgl_masuk.clone(),
                diagnosa: diagnosa.clone(),
                los: format!("{los} hari"),
                jenis_ab: ab.nama_brng,
                tgl_pemberian: ab.tgl_perawatan,
                rute: ab.rute_pemberian,
                penggunaan_harian: format_daily_dose(rule),
                status_telaah: ab.status_telaah.unwrap_or_else(|| TELAAH_BELUM.into()),
                status_persetujuan: ab
                    .status_persetujuan
                    .unwrap_or_else(|| PERSETUJUAN_PENDING.into()),
                catatan_telaah: ab.catatan_telaah,
                catatan_persetujuan: ab.catatan_persetujuan,
                total_pakai,
                ddd_factor: factor,
                total_ddd: round2(ddd),
                is_new_patient: i == 0,
            });
        }
    }
    out
}

/// Lowercase fragments a plan line must contain to be about the drug.
fn drug_match_criteria(nama_brng: &str) -> Vec<String> {
    let lower = nama_brng.trim().to_lowercase();
    let first_word = lower.split_whitespace().next().unwrap_or_default().to_string();
    let mut criteria = Vec::new();
    if first_word.chars().count() >= 5 {
        criteria.push(first_word.chars().take(4).collect());
    }
    criteria.insert(0, first_word);
    criteria
}

/// Dosage suggestions found in SOAP plan text, newest entries first.
pub fn soap_suggestions_from(entries: &[SoapEntryRow], nama_brng: &str) -> Vec<SoapSuggestion> {
    let criteria = drug_match_criteria(nama_brng);
    let mut out = Vec::new();

    for entry in entries {
        let Some(rtl) = entry.rtl.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        for line in rtl.split('\n') {
            let lower = line.to_lowercase();
            if !criteria.iter().any(|c| lower.contains(c.as_str())) {
                continue;
            }
            if let Some(suggestion) = extract_dosage_suggestion(line) {
                out.push(SoapSuggestion {
                    tgl: entry.tgl_perawatan,
                    jam: entry.jam_rawat.clone(),
                    raw_text: line.trim().to_string(),
                    suggestion,
                });
            }
        }
    }
    out
}

#[derive(Clone)]
pub struct ReportService {
    store: SharedStore,
    clock: Clock,
}

impl ReportService {
    pub fn new(store: SharedStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub async fn report(&self, query: ReportQuery) -> SimrsResult<Vec<PpraReportRow>> {
        let now = (self.clock)();
        let filter = ReportFilter::from_query(query, now.date());
        let rows = self.store.report_rows(&filter).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut visits: Vec<String> = Vec::new();
        for row in &rows {
            if !visits.contains(&row.no_rawat) {
                visits.push(row.no_rawat.clone());
            }
        }
        let diagnoses = self.store.diagnoses(&visits).await?;
        let stays = self.store.room_stays(&visits).await?;

        tracing::debug!(
            "PPRA report {}..{}: {} lines over {} visits",
            filter.start,
            filter.end,
            rows.len(),
            visits.len()
        );
        Ok(build_report(rows, &diagnoses, &stays, now))
    }

    /// Dosage suggestions for a drug from a visit's SOAP plans.
    ///
    /// # Errors
    /// `InvalidInput` when either parameter is missing, `NotFound` for an unknown drug.
    pub async fn soap_suggestions(
        &self,
        query: SoapSuggestionQuery,
    ) -> SimrsResult<Vec<SoapSuggestion>> {
        let (Some(no_rawat), Some(kode_brng)) =
            (non_blank(query.no_rawat), non_blank(query.kode_brng))
        else {
            return Err(SimrsError::InvalidInput(
                "Parameter no_rawat dan kode_brng wajib diisi".into(),
            ));
        };

        let nama_brng = self
            .store
            .drug_name(&kode_brng)
            .await?
            .ok_or_else(|| SimrsError::NotFound("Obat tidak ditemukan".into()))?;
        let entries = self.store.soap_entries(&no_rawat).await?;
        Ok(soap_suggestions_from(&entries, &nama_brng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{DrugRecord, MemoryStore};
    use std::sync::Arc;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn line(no_rawat: &str, nama: &str, day: u32, jml: f64) -> ReportSourceRow {
        ReportSourceRow {
            no_resep: format!("R-{no_rawat}-{day}"),
            no_rawat: no_rawat.into(),
            nm_pasien: "An. Raka".into(),
            no_rkm_medis: "000321".into(),
            nm_dokter: "dr. Lina".into(),
            kd_dokter: "D01".into(),
            kd_sps: Some("S0001".into()),
            tgl_lahir: Some("2021-10-01".into()),
            kode_brng: "AB1".into(),
            nama_brng: nama.into(),
            rute_pemberian: Some("IV".into()),
            nilai_ddd_who: Some("2".into()),
            aturan_pakai_dokter: Some("3x500mg".into()),
            jml: Some(jml),
            tgl_perawatan: date(day),
            jam: Some("08:00:00".into()),
            status: "ranap".into(),
            kode_sat: Some("VIAL".into()),
            isi: Some(1.0),
            ..Default::default()
        }
    }

    fn stay(no_rawat: &str, masuk: &str, keluar: Option<&str>) -> RoomStayRow {
        RoomStayRow {
            no_rawat: no_rawat.into(),
            tgl_masuk: Some(masuk.into()),
            jam_masuk: Some("10:00:00".into()),
            tgl_keluar: Some(keluar.unwrap_or("0000-00-00").into()),
            jam_keluar: Some("09:00:00".into()),
        }
    }

    #[test]
    fn filter_defaults_to_month_to_date() {
        let filter = ReportFilter::from_query(
            ReportQuery {
                kd_sps: Some(" ".into()),
                ..Default::default()
            },
            date(19),
        );
        assert_eq!(filter.start, date(1));
        assert_eq!(filter.end, date(19));
        assert_eq!(filter.kd_sps, None);
    }

    #[test]
    fn length_of_stay_spans_first_admission_to_last_discharge() {
        let a = stay("V1", "2026-10-10", Some("2026-10-12"));
        let b = stay("V1", "2026-10-12", Some("2026-10-15"));
        assert_eq!(length_of_stay(&[&a, &b], now()), ("2026-10-10".into(), 4));
    }

    #[test]
    fn length_of_stay_runs_to_now_while_admitted() {
        let a = stay("V1", "2026-10-17", None);
        assert_eq!(length_of_stay(&[&a], now()).1, 2);
    }

    #[test]
    fn length_of_stay_is_at_least_one_day() {
        let a = stay("V1", "2026-10-19", None);
        assert_eq!(length_of_stay(&[&a], now()).1, 1);
    }

    #[test]
    fn length_of_stay_without_admission_is_zero() {
        assert_eq!(length_of_stay(&[], now()), ("-".into(), 0));
        let zero = stay("V1", "0000-00-00", None);
        assert_eq!(length_of_stay(&[&zero], now()), ("-".into(), 0));
    }

    #[test]
    fn groups_same_drug_route_and_day() {
        let rows = vec![
            line("V1", "Ceftriaxone", 17, 1.0),
            line("V1", "Ceftriaxone", 17, 2.0),
            line("V1", "Ceftriaxone", 18, 1.0),
            line("V2", "Ampicillin", 18, 4.0),
        ];
        let diagnoses = vec![
            DiagnosisRow {
                no_rawat: "V1".into(),
                nm_penyakit: "Pneumonia".into(),
            },
            DiagnosisRow {
                no_rawat: "V1".into(),
                nm_penyakit: "Sepsis".into(),
            },
        ];
        let stays = vec![stay("V1", "2026-10-16", None)];

        let report = build_report(rows, &diagnoses, &stays, now());
        assert_eq!(report.len(), 3);

        let first = &report[0];
        assert!(first.is_new_patient);
        assert_eq!(first.nm_pasien, "An. Raka (5 th)");
        assert_eq!(first.diagnosa, "Pneumonia, Sepsis");
        assert_eq!(first.tgl_masuk, "2026-10-16");
        assert_eq!(first.los, "3 hari");
        assert_eq!(first.total_pakai, "3 VIAL");
        assert_eq!(first.total_ddd, 1.5);
        assert_eq!(first.penggunaan_harian, "3 x\n500 mg =\n1.5 gr");
        assert_eq!(first.status_telaah, "BELUM");
        assert_eq!(first.status_persetujuan, "PENDING");

        assert!(!report[1].is_new_patient);
        assert_eq!(report[1].tgl_pemberian, date(18));

        let other = &report[2];
        assert!(other.is_new_patient);
        assert_eq!(other.los, "0 hari");
        assert_eq!(other.tgl_masuk, "-");
        assert_eq!(other.diagnosa, "");
    }

    #[test]
    fn dosage_falls_back_to_adjusted_rule() {
        let mut row = line("V1", "Gentamicin", 18, 1.0);
        row.aturan_pakai_dokter = Some(" ".into());
        row.aturan_pakai_verif = Some("80mg/12jam".into());
        row.status_telaah = Some("SESUAI".into());
        let report = build_report(vec![row], &[], &[], now());
        assert_eq!(report[0].penggunaan_harian, "2 x\n80 mg =\n160 mg");
        assert_eq!(report[0].status_telaah, "SESUAI");
    }

    #[test]
    fn ddd_is_zero_without_factor() {
        let mut row = line("V1", "Gentamicin", 18, 3.0);
        row.nilai_ddd_who = Some("n/a".into());
        row.aturan_pakai_dokter = None;
        let report = build_report(vec![row], &[], &[], now());
        assert_eq!(report[0].ddd_factor, 0.0);
        assert_eq!(report[0].total_ddd, 0.0);
        assert_eq!(report[0].penggunaan_harian, "-");
    }

    #[test]
    fn ddd_is_rounded_to_two_decimals() {
        let mut row = line("V1", "Meropenem", 18, 1.0);
        row.nilai_ddd_who = Some("3".into());
        let report = build_report(vec![row], &[], &[], now());
        assert_eq!(report[0].total_ddd, 0.33);
    }

    #[test]
    fn match_criteria_use_first_word_and_its_prefix() {
        assert_eq!(
            drug_match_criteria("Ceftriaxone 1g inj"),
            vec!["ceftriaxone".to_string(), "ceft".to_string()]
        );
        assert_eq!(drug_match_criteria("Cefo"), vec!["cefo".to_string()]);
    }

    #[test]
    fn soap_lines_yield_dosage_suggestions() {
        let entries = vec![SoapEntryRow {
            tgl_perawatan: date(18),
            jam_rawat: "09:30:00".into(),
            rtl: Some("Inj. Ceft 2x1gr\r\nParacetamol 3x250mg\nceftriaxone lanjut".into()),
        }];
        let suggestions = soap_suggestions_from(&entries, "Ceftriaxone 1g");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].raw_text, "Inj. Ceft 2x1gr");
        assert_eq!(suggestions[0].suggestion, "2x1gr");
    }

    #[tokio::test]
    async fn soap_suggestions_validate_parameters() {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| t.drugs.push(DrugRecord::new("AB1", "Ampicillin 1g", "1")));
        let svc = ReportService::new(store, Arc::new(now));

        let missing = svc
            .soap_suggestions(SoapSuggestionQuery {
                no_rawat: Some("V1".into()),
                kode_brng: None,
            })
            .await
            .unwrap_err();
        assert_eq!(missing.status_code(), 422);

        let unknown = svc
            .soap_suggestions(SoapSuggestionQuery {
                no_rawat: Some("V1".into()),
                kode_brng: Some("NOPE".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(unknown.status_code(), 404);

        let none = svc
            .soap_suggestions(SoapSuggestionQuery {
                no_rawat: Some("V1".into()),
                kode_brng: Some("AB1".into()),
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn report_only_includes_inpatient_lines_in_range() {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            t.report_rows.push(line("V1", "Ceftriaxone", 18, 1.0));
            let mut outpatient = line("V2", "Ceftriaxone", 18, 1.0);
            outpatient.status = "ralan".into();
            t.report_rows.push(outpatient);
            let mut old = line("V3", "Ceftriaxone", 18, 1.0);
            old.tgl_perawatan = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
            t.report_rows.push(old);
        });
        let svc = ReportService::new(store, Arc::new(now));

        let report = svc.report(ReportQuery::default()).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].no_rawat, "V1");

        let by_doctor = svc
            .report(ReportQuery {
                kd_dokter: Some("D99".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(by_doctor.is_empty());
    }
}
