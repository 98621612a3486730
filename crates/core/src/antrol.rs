//! BPJS Antrol queue task times.
//!
//! Antrol follows an outpatient visit through numbered tasks. The hospital records the moments
//! of tasks 3 to 7 in its own tables (exam notes, the clinic's estimate and finish side-tables,
//! prescriptions); this module reads them back and builds the `antrean/updatewaktu` payloads.
//! Posting them is left to the Antrol bridge.

use crate::constants::ANTROL_UTC_OFFSET_HOURS;
use crate::error::{SimrsError, SimrsResult};
use crate::patient::parse_khanza_date;
use crate::store::SharedStore;
use api_shared::dto::{AntrolTaskSync, AntrolTaskUpdate};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub const MSG_BOOKING_NOT_FOUND: &str = "Data antrean tidak ditemukan";

/// Antrol task numbers the hospital reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AntrolTask {
    ExamStarted = 3,
    ExamEstimatedEnd = 4,
    ExamFinished = 5,
    DispensingStarted = 6,
    DrugsHandedOver = 7,
}

impl AntrolTask {
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Mobile JKN booking joined to the local visit, as stored in `referensi_mobilejkn_bpjs`.
#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct BookingReference {
    pub no_rawat: Option<String>,
    pub norm: Option<String>,
    pub tanggalperiksa: Option<String>,
}

/// Timestamps recorded for one visit, as text straight from the legacy tables.
///
/// Dates may be `0000-00-00`; such values count as not recorded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedVisitTimes {
    /// First outpatient exam note (`pemeriksaan_ralan`).
    pub exam_date: Option<String>,
    pub exam_time: Option<String>,
    /// `rsia_estimasi_poli.jam_periksa`, a full datetime.
    pub estimated_end: Option<String>,
    /// `rsia_selesai_poli.jam_periksa`, a full datetime.
    pub finished_at: Option<String>,
    /// Latest prescription with a prescribing date.
    pub prescription: Option<PrescriptionTimes>,
}

#[derive(Clone, Debug, Default, PartialEq, sqlx::FromRow)]
pub struct PrescriptionTimes {
    pub prescribed_date: Option<String>,
    pub prescribed_time: Option<String>,
    pub prepared_date: Option<String>,
    pub prepared_time: Option<String>,
    pub handed_over_date: Option<String>,
    pub handed_over_time: Option<String>,
}

fn parse_time(raw: Option<&str>) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw?.trim(), "%H:%M:%S").ok()
}

/// Joins a legacy date column and time column.
fn date_and_time(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    Some(parse_khanza_date(date)?.and_time(parse_time(time)?))
}

/// Parses a legacy datetime column.
fn datetime(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    let (date, time) = raw.split_once(' ')?;
    date_and_time(Some(date), Some(time))
}

/// Local hospital time as Antrol epoch milliseconds.
pub fn antrol_millis(local: NaiveDateTime) -> i64 {
    (local - Duration::hours(ANTROL_UTC_OFFSET_HOURS))
        .and_utc()
        .timestamp_millis()
}

/// The tasks that have a recorded moment, in task order.
///
/// Task 5 is the prescribing time when there is a prescription, otherwise the moment the
/// clinic marked the exam finished. Tasks 6 and 7 exist only with a prescription.
pub fn task_times(times: &RecordedVisitTimes) -> Vec<(AntrolTask, NaiveDateTime)> {
    let prescription = times.prescription.as_ref();
    let prescribed = prescription.and_then(|p| {
        date_and_time(p.prescribed_date.as_deref(), p.prescribed_time.as_deref())
    });

    let candidates = [
        (
            AntrolTask::ExamStarted,
            date_and_time(times.exam_date.as_deref(), times.exam_time.as_deref()),
        ),
        (AntrolTask::ExamEstimatedEnd, datetime(times.estimated_end.as_deref())),
        (
            AntrolTask::ExamFinished,
            prescribed.or_else(|| datetime(times.finished_at.as_deref())),
        ),
        (
            AntrolTask::DispensingStarted,
            prescription.and_then(|p| {
                date_and_time(p.prepared_date.as_deref(), p.prepared_time.as_deref())
            }),
        ),
        (
            AntrolTask::DrugsHandedOver,
            prescription.and_then(|p| {
                date_and_time(p.handed_over_date.as_deref(), p.handed_over_time.as_deref())
            }),
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(task, at)| at.map(|at| (task, at)))
        .collect()
}

#[derive(Clone)]
pub struct AntrolTaskService {
    store: SharedStore,
}

impl AntrolTaskService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Finds the visit behind a booking code.
    ///
    /// The booking's own `no_rawat` is tried first, then the code itself as a `no_rawat`, then
    /// the patient's latest registration on the booked exam date.
    pub async fn resolve_visit(&self, kodebooking: &str) -> SimrsResult<Option<String>> {
        let reference = self.store.booking_reference(kodebooking).await?;
        let candidate = reference
            .as_ref()
            .and_then(|r| r.no_rawat.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(kodebooking);
        if self.store.registration_exists(candidate).await? {
            return Ok(Some(candidate.to_string()));
        }

        let Some(reference) = reference.as_ref() else {
            return Ok(None);
        };
        if candidate != kodebooking && self.store.registration_exists(kodebooking).await? {
            return Ok(Some(kodebooking.to_string()));
        }
        let norm = reference.norm.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let date: Option<NaiveDate> = parse_khanza_date(reference.tanggalperiksa.as_deref());
        match (norm, date) {
            (Some(norm), Some(date)) => self.store.latest_registration(norm, date).await,
            _ => Ok(None),
        }
    }

    /// The `updatewaktu` payloads of one booking.
    ///
    /// # Errors
    /// `InvalidInput` for a blank code, `NotFound` when no visit matches the booking.
    pub async fn task_updates(&self, kodebooking: &str) -> SimrsResult<AntrolTaskSync> {
        let kodebooking = kodebooking.trim();
        if kodebooking.is_empty() {
            return Err(SimrsError::InvalidInput("kodebooking is required".into()));
        }
        let no_rawat = self
            .resolve_visit(kodebooking)
            .await?
            .ok_or_else(|| SimrsError::NotFound(MSG_BOOKING_NOT_FOUND.into()))?;

        let times = self.store.recorded_visit_times(&no_rawat).await?;
        let tasks: Vec<AntrolTaskUpdate> = task_times(&times)
            .into_iter()
            .map(|(task, at)| AntrolTaskUpdate {
                kodebooking: kodebooking.to_string(),
                taskid: task.id(),
                waktu: antrol_millis(at),
            })
            .collect();
        tracing::info!(
            "Antrol booking {} ({}): {} task times",
            kodebooking,
            no_rawat,
            tasks.len()
        );
        Ok(AntrolTaskSync {
            kodebooking: kodebooking.to_string(),
            no_rawat: Some(no_rawat),
            tasks,
            status: None,
        })
    }

    /// Task payloads for many bookings. A booking that fails is reported in its entry and does
    /// not stop the others.
    ///
    /// # Errors
    /// `InvalidInput` when no booking code is given.
    pub async fn bulk_task_updates(&self, kodebookings: &[String]) -> SimrsResult<Vec<AntrolTaskSync>> {
        if kodebookings.is_empty() {
            return Err(SimrsError::InvalidInput("kodebookings is required".into()));
        }
        let mut results = Vec::with_capacity(kodebookings.len());
        for kodebooking in kodebookings {
            let entry = match self.task_updates(kodebooking).await {
                Ok(sync) => sync,
                Err(e) => {
                    let status = match &e {
                        SimrsError::NotFound(m) | SimrsError::InvalidInput(m) => m.clone(),
                        other => {
                            tracing::error!("Antrol booking {} failed: {:?}", kodebooking, other);
                            other.to_string()
                        }
                    };
                    AntrolTaskSync {
                        kodebooking: kodebooking.clone(),
                        no_rawat: None,
                        tasks: Vec::new(),
                        status: Some(status),
                    }
                }
            };
            results.push(entry);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, VisitRow};
    use std::sync::Arc;

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn s(v: &str) -> Option<String> {
        Some(v.into())
    }

    fn full_visit() -> RecordedVisitTimes {
        RecordedVisitTimes {
            exam_date: s("2026-10-19"),
            exam_time: s("08:15:00"),
            estimated_end: s("2026-10-19 08:30:00"),
            finished_at: s("2026-10-19 08:40:00"),
            prescription: Some(PrescriptionTimes {
                prescribed_date: s("2026-10-19"),
                prescribed_time: s("08:35:10"),
                prepared_date: s("2026-10-19"),
                prepared_time: s("08:50:00"),
                handed_over_date: s("2026-10-19"),
                handed_over_time: s("09:05:00"),
            }),
        }
    }

    #[test]
    fn wib_is_seven_hours_ahead_of_utc() {
        assert_eq!(antrol_millis(at("1970-01-01 07:00:00")), 0);
        assert_eq!(antrol_millis(at("2026-10-19 08:15:00")), 1_792_372_500_000);
    }

    #[test]
    fn full_visit_reports_tasks_three_to_seven() {
        let tasks = task_times(&full_visit());
        let ids: Vec<_> = tasks.iter().map(|(t, _)| t.id()).collect();
        assert_eq!(ids, vec![3, 4, 5, 6, 7]);
        assert_eq!(tasks[2].1, at("2026-10-19 08:35:10"));
        assert_eq!(tasks[4].1, at("2026-10-19 09:05:00"));
    }

    #[test]
    fn without_prescription_task_five_is_the_finish_mark() {
        let times = RecordedVisitTimes {
            prescription: None,
            ..full_visit()
        };
        let tasks = task_times(&times);
        assert_eq!(
            tasks,
            vec![
                (AntrolTask::ExamStarted, at("2026-10-19 08:15:00")),
                (AntrolTask::ExamEstimatedEnd, at("2026-10-19 08:30:00")),
                (AntrolTask::ExamFinished, at("2026-10-19 08:40:00")),
            ]
        );
    }

    #[test]
    fn zero_dates_and_missing_times_are_skipped() {
        let mut times = full_visit();
        times.estimated_end = s("0000-00-00 00:00:00");
        if let Some(p) = times.prescription.as_mut() {
            p.handed_over_date = s("0000-00-00");
            p.prepared_time = None;
        }
        let ids: Vec<_> = task_times(&times).iter().map(|(t, _)| t.id()).collect();
        assert_eq!(ids, vec![3, 5]);
        assert!(task_times(&RecordedVisitTimes::default()).is_empty());
    }

    fn service() -> (AntrolTaskService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
            t.visits.push(VisitRow::new("2026/10/19/000007", "000123", day, "08:00:00"));
            t.visits.push(VisitRow::new("2026/10/19/000009", "000123", day, "10:00:00"));
            t.visit_times.insert("2026/10/19/000009".into(), full_visit());
            t.booking_references.insert(
                "BOOK-1".into(),
                BookingReference {
                    no_rawat: s("2026/10/19/000009"),
                    norm: s("000123"),
                    tanggalperiksa: s("2026-10-19"),
                },
            );
            t.booking_references.insert(
                "BOOK-2".into(),
                BookingReference {
                    no_rawat: s("2026/10/19/999999"),
                    norm: s("000123"),
                    tanggalperiksa: s("2026-10-19"),
                },
            );
            t.booking_references.insert(
                "BOOK-3".into(),
                BookingReference {
                    no_rawat: None,
                    norm: s("000999"),
                    tanggalperiksa: s("2026-10-19"),
                },
            );
        });
        (AntrolTaskService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn booking_resolves_through_reference_code_or_latest_registration() {
        let (svc, _) = service();
        assert_eq!(
            svc.resolve_visit("BOOK-1").await.unwrap().as_deref(),
            Some("2026/10/19/000009")
        );
        assert_eq!(
            svc.resolve_visit("2026/10/19/000007").await.unwrap().as_deref(),
            Some("2026/10/19/000007")
        );
        // Stale no_rawat on the booking: latest registration of the patient that day.
        assert_eq!(
            svc.resolve_visit("BOOK-2").await.unwrap().as_deref(),
            Some("2026/10/19/000009")
        );
        assert_eq!(svc.resolve_visit("BOOK-3").await.unwrap(), None);
        assert_eq!(svc.resolve_visit("NOPE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn task_updates_carry_booking_code_and_epoch_millis() {
        let (svc, _) = service();
        let sync = svc.task_updates(" BOOK-1 ").await.unwrap();
        assert_eq!(sync.no_rawat.as_deref(), Some("2026/10/19/000009"));
        assert_eq!(sync.tasks.len(), 5);
        assert_eq!(
            sync.tasks[0],
            AntrolTaskUpdate {
                kodebooking: "BOOK-1".into(),
                taskid: 3,
                waktu: 1_792_372_500_000,
            }
        );
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let (svc, _) = service();
        let err = svc.task_updates("NOPE").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(matches!(svc.task_updates("  ").await, Err(SimrsError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn bulk_reports_failures_per_booking() {
        let (svc, _) = service();
        let results = svc
            .bulk_task_updates(&["BOOK-1".into(), "NOPE".into()])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tasks.len(), 5);
        assert_eq!(results[1].status.as_deref(), Some(MSG_BOOKING_NOT_FOUND));
        assert!(results[1].tasks.is_empty());

        assert!(svc.bulk_task_updates(&[]).await.is_err());
    }
}
