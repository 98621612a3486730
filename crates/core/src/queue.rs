//! Outpatient queue volume for the coming week.

use crate::constants::QUEUE_SUMMARY_DAYS;
use crate::error::SimrsResult;
use crate::store::SharedStore;
use crate::Clock;
use api_shared::dto::{ClinicQueue, QueueDay};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ClinicRow {
    pub kd_poli: String,
    pub nm_poli: String,
}

/// Weekday name as stored in the doctor schedule (`jadwal.hari_kerja`).
pub fn indonesian_day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Sun => "MINGGU",
        Weekday::Mon => "SENIN",
        Weekday::Tue => "SELASA",
        Weekday::Wed => "RABU",
        Weekday::Thu => "KAMIS",
        Weekday::Fri => "JUMAT",
        Weekday::Sat => "SABTU",
    }
}

#[derive(Clone)]
pub struct QueueService {
    store: SharedStore,
    clock: Clock,
}

impl QueueService {
    pub fn new(store: SharedStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    /// Quota and registrations of every active clinic for today and the six days after.
    pub async fn summary(&self) -> SimrsResult<Vec<ClinicQueue>> {
        let today = (self.clock)().date();
        let clinics = self.store.active_clinics().await?;
        tracing::info!("Found {} active clinics", clinics.len());

        let mut results = Vec::with_capacity(clinics.len());
        for clinic in clinics {
            let mut days = Vec::new();
            for offset in 0..QUEUE_SUMMARY_DAYS {
                let tanggal = today + Duration::days(offset);
                let hari = indonesian_day_name(tanggal);
                let kuota = self.store.clinic_quota(&clinic.kd_poli, hari).await?;
                let terisi = self
                    .store
                    .registration_count(&clinic.kd_poli, tanggal)
                    .await?;
                days.push(QueueDay {
                    tanggal,
                    hari: hari.to_string(),
                    kuota,
                    terisi,
                    tersedia: (kuota - terisi).max(0),
                });
            }
            results.push(ClinicQueue {
                kd_poli: clinic.kd_poli,
                nm_poli: clinic.nm_poli,
                days,
            });
        }
        Ok(results)
    }
}
