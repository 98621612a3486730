//! WhatsApp notifications for new antibiotic prescriptions.
//!
//! Every newly prescribed line of a mapped antibiotic is announced to the pharmacists of the
//! PPRA team together with a four-digit short code. Replies quoting that code
//! (`ACC 1234 ...` / `TOLAK 1234 ...`) come back through the WhatsApp webhook and advance the
//! verification row of that line. The same code is reused when the line is forwarded to the
//! chairman after a positive review.

use crate::config::CoreConfig;
use crate::constants::{NOTIF_STATUS_SENT, SHORT_CODE_DIGITS, SHORT_CODE_MAX_ATTEMPTS};
use crate::error::{SimrsError, SimrsResult};
use crate::messaging::{OutgoingMessage, SharedMessenger};
use crate::ppra::{NotificationLog, PendingLine, PrescriptionLineDetail};
use crate::store::{NotificationStore, SharedStore};
use crate::Clock;
use api_shared::dto::DispatchSummary;
use chrono::NaiveDateTime;
use rand::Rng;
use simrs_types::PhoneNumber;
use std::sync::Arc;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━";

fn random_short_code() -> String {
    let max = 10u32.pow(SHORT_CODE_DIGITS as u32);
    let n = rand::thread_rng().gen_range(0..max);
    format!("{:0width$}", n, width = SHORT_CODE_DIGITS)
}

/// Draws random short codes until one is not in use by a notification sent at or after
/// `since`.
///
/// # Errors
/// Returns `SimrsError::ShortCodeExhausted` when no free code was found within the attempt
/// budget, or a storage error.
pub async fn allocate_short_code<S>(store: &S, since: NaiveDateTime) -> SimrsResult<String>
where
    S: NotificationStore + ?Sized,
{
    for _attempt in 0..SHORT_CODE_MAX_ATTEMPTS {
        let code = random_short_code();
        if !store.short_code_in_use(&code, since).await? {
            return Ok(code);
        }
    }
    Err(SimrsError::ShortCodeExhausted(SHORT_CODE_MAX_ATTEMPTS))
}

fn reply_instructions(short_code: &str) -> String {
    format!("*ACC {short_code} [Catatan]*\natau\n*TOLAK {short_code} [Alasan]*")
}

/// Message announcing a new antibiotic prescription to a pharmacist.
pub fn new_prescription_message(line: &PendingLine, short_code: &str) -> String {
    format!(
        "*NOTIFIKASI PPRA*\n\n\
         Terdapat resep antibiotik baru:\n\
         No. Resep: {}\n\
         Pasien: {}\n\
         Obat: {}\n\
         Dosis: {}\n\n\
         Balas WA ini dengan format:\n{}",
        line.no_resep,
        line.nm_pasien,
        line.nama_brng,
        line.aturan_pakai.as_deref().unwrap_or("-"),
        reply_instructions(short_code)
    )
}

/// Context for the message forwarded to the chairman after a positive review.
pub struct ChairmanNotice<'a> {
    pub hospital_name: &'a str,
    pub pharmacist_name: &'a str,
    pub detail: &'a PrescriptionLineDetail,
    pub age: &'a str,
    pub weight: &'a str,
    pub short_code: &'a str,
}

/// Message asking the chairman to approve a reviewed prescription line.
pub fn chairman_approval_message(notice: &ChairmanNotice<'_>) -> String {
    let dosage = notice
        .detail
        .aturan_pakai
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("-");
    format!(
        "🏥 *APPROVAL PPRA (KETUA) - {hospital}*\n\
         {RULE}\n\
         ✅ *Hasil Telaah Apoteker:*\n\
         Resep ini telah ditelaah oleh *{pharmacist}* dengan hasil: *SESUAI*.\n\n\
         💊 *Detail Resep Antibiotik:*\n\
         • Pasien: *{patient}*\n\
         • Usia: {age} | BB: {weight}\n\
         • Obat: _{drug}_\n\
         • Dosis: *{dosage}*\n\
         {RULE}\n\
         📱 *Konfirmasi Ketua:*\n\
         Silakan balas pesan ini dengan kode:\n\n\
         ✅ *ACC {code} [Catatan]*\n\
         ❌ *TOLAK {code} [Alasan]*\n\n\
         _Pesan ini diteruskan otomatis setelah telaah Apoteker._",
        hospital = notice.hospital_name,
        pharmacist = notice.pharmacist_name,
        patient = notice.detail.nm_pasien,
        age = notice.age,
        weight = notice.weight,
        drug = notice.detail.nama_brng,
        code = notice.short_code,
    )
}

/// Announces new antibiotic prescriptions to the PPRA pharmacists.
#[derive(Clone)]
pub struct NotificationDispatcher {
    cfg: Arc<CoreConfig>,
    store: SharedStore,
    messenger: SharedMessenger,
    clock: Clock,
}

impl NotificationDispatcher {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: SharedStore,
        messenger: SharedMessenger,
        clock: Clock,
    ) -> Self {
        Self {
            cfg,
            store,
            messenger,
            clock,
        }
    }

    /// Sends one notification per pending line to every pharmacist.
    ///
    /// A line is logged (and so never announced again) after the first recipient accepted the
    /// message; lines no recipient accepted stay pending for the next run.
    ///
    /// # Errors
    /// Returns storage errors from the initial queries. Short code and delivery failures are
    /// logged and counted per line, not returned.
    pub async fn dispatch_new_prescriptions(&self) -> SimrsResult<DispatchSummary> {
        let now = (self.clock)();
        let since = (now - self.cfg.notify_lookback()).date();

        let lines = self.store.pending_antibiotic_lines(since).await?;
        let mut summary = DispatchSummary {
            found: lines.len(),
            ..DispatchSummary::default()
        };
        if lines.is_empty() {
            tracing::info!("No new PPRA prescriptions found since {}", since);
            return Ok(summary);
        }
        tracing::info!("Found {} PPRA prescription lines to notify", lines.len());

        let recipients = self.store.pharmacist_contacts().await?;
        if recipients.is_empty() {
            tracing::error!("No pharmacists with a phone number in the PPRA team");
            summary.failed = lines.len();
            return Ok(summary);
        }

        let codes_live_since = now - self.cfg.short_code_ttl();
        for line in &lines {
            let short_code = match allocate_short_code(self.store.as_ref(), codes_live_since).await {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!("No short code for {}: {:?}", line.no_resep, e);
                    summary.failed += 1;
                    continue;
                }
            };
            let text = new_prescription_message(line, &short_code);
            let mut logged = false;

            for recipient in &recipients {
                let phone = match PhoneNumber::parse(&recipient.no_telp) {
                    Ok(phone) => phone,
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", recipient.nama, e);
                        continue;
                    }
                };
                let message = OutgoingMessage::ppra(
                    &line.no_resep,
                    &line.kode_brng,
                    &short_code,
                    phone.international(),
                    &line.nm_pasien,
                    &line.nama_brng,
                    &text,
                );

                if let Err(e) = self.messenger.send(&message).await {
                    tracing::error!(
                        "Notify {} to {} failed: {}",
                        line.no_resep,
                        recipient.nama,
                        e
                    );
                    continue;
                }

                if !logged {
                    let log = NotificationLog {
                        no_resep: line.no_resep.clone(),
                        kode_brng: line.kode_brng.clone(),
                        short_code: short_code.clone(),
                        tgl_notif: (self.clock)(),
                        status_notif: NOTIF_STATUS_SENT.into(),
                    };
                    match self.store.insert_notification(&log).await {
                        Ok(()) => {
                            logged = true;
                            tracing::info!(
                                "Notified PPRA recipients for {} with code {}",
                                line.no_resep,
                                short_code
                            );
                        }
                        Err(e) => tracing::error!(
                            "Failed to log notification for {}: {:?}",
                            line.no_resep,
                            e
                        ),
                    }
                }
            }

            if logged {
                summary.notified += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::testing::RecordingMessenger;
    use crate::store::memory::{MappingRow, MemoryStore, StaffRow, TeamRow};
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn fixed_clock() -> Clock {
        Arc::new(now)
    }

    fn pending(no_resep: &str, days_ago: i64) -> PendingLine {
        PendingLine {
            no_resep: no_resep.into(),
            kode_brng: "AB001".into(),
            nama_brng: "Ceftriaxone 1g inj".into(),
            aturan_pakai: Some("2x1gr".into()),
            jml: Some(2.0),
            nm_pasien: "Bayi Ny. Rina".into(),
            no_rawat: "2026/10/19/000001".into(),
            no_rkm_medis: "000123".into(),
            tgl_perawatan: now().date() - chrono::Duration::days(days_ago),
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            t.staff.push(StaffRow::new("P01", "apt. Dewi", Some("0812-1111-2222")));
            t.staff.push(StaffRow::new("P02", "apt. Budi", Some("081233334444")));
            t.staff.push(StaffRow::new("D01", "dr. Hasan", Some("081299990000")));
            t.team.push(TeamRow::new(1, "P01", "Anggota Apoteker", None));
            t.team.push(TeamRow::new(2, "P02", "Farmasi Klinis", None));
            t.team.push(TeamRow::new(3, "D01", "Ketua", None));
            t.mappings.push(MappingRow::new(1, "AB001", Some("1")));
        });
        store
    }

    fn dispatcher(store: Arc<MemoryStore>, messenger: Arc<RecordingMessenger>) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(CoreConfig::with_defaults("http://n8n.local").unwrap()),
            store,
            messenger,
            fixed_clock(),
        )
    }

    #[test]
    fn short_codes_are_four_zero_padded_digits() {
        for _ in 0..200 {
            let code = random_short_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn new_prescription_message_carries_code_and_dash_for_missing_dose() {
        let mut line = pending("R001", 0);
        line.aturan_pakai = None;
        let text = new_prescription_message(&line, "0420");
        assert!(text.contains("No. Resep: R001"));
        assert!(text.contains("Dosis: -"));
        assert!(text.contains("*ACC 0420 [Catatan]*"));
        assert!(text.contains("*TOLAK 0420 [Alasan]*"));
    }

    #[tokio::test]
    async fn dispatch_notifies_every_pharmacist_and_logs_once() {
        let store = seeded_store();
        store.with_tables(|t| t.pending_lines.push(pending("R001", 0)));
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store.clone(), messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary, DispatchSummary { found: 1, notified: 1, failed: 0 });
        let sent = messenger.sent();
        let phones: Vec<_> = sent.iter().map(|m| m.phone.as_str()).collect();
        assert_eq!(phones, vec!["6281211112222", "6281233334444"]);
        assert_eq!(sent[0].short_code, sent[1].short_code);

        let logs = store.with_tables(|t| t.notification_logs.clone());
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].short_code, sent[0].short_code);
        assert_eq!(logs[0].status_notif, "SENT");
    }

    #[tokio::test]
    async fn logged_lines_are_not_announced_again() {
        let store = seeded_store();
        store.with_tables(|t| t.pending_lines.push(pending("R001", 0)));
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = dispatcher(store, messenger.clone());

        dispatcher.dispatch_new_prescriptions().await.unwrap();
        let second = dispatcher.dispatch_new_prescriptions().await.unwrap();

        assert_eq!(second.found, 0);
        assert_eq!(messenger.sent().len(), 2);
    }

    #[tokio::test]
    async fn lines_outside_lookback_are_ignored() {
        let store = seeded_store();
        store.with_tables(|t| t.pending_lines.push(pending("R-OLD", 5)));
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store, messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary.found, 0);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_to_one_recipient_still_logs() {
        let store = seeded_store();
        store.with_tables(|t| t.pending_lines.push(pending("R001", 0)));
        let messenger = Arc::new(RecordingMessenger::failing_for(&["6281211112222"]));

        let summary = dispatcher(store.clone(), messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary.notified, 1);
        assert_eq!(messenger.sent().len(), 1);
        assert_eq!(store.with_tables(|t| t.notification_logs.len()), 1);
    }

    #[tokio::test]
    async fn undeliverable_line_stays_pending() {
        let store = seeded_store();
        store.with_tables(|t| t.pending_lines.push(pending("R001", 0)));
        let messenger = Arc::new(RecordingMessenger::failing_for(&[
            "6281211112222",
            "6281233334444",
        ]));

        let summary = dispatcher(store.clone(), messenger)
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary, DispatchSummary { found: 1, notified: 0, failed: 1 });
        assert!(store.with_tables(|t| t.notification_logs.is_empty()));
    }

    #[tokio::test]
    async fn no_pharmacists_means_nothing_is_sent() {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            t.mappings.push(MappingRow::new(1, "AB001", Some("1")));
            t.pending_lines.push(pending("R001", 0));
        });
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store, messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn drugs_with_notifications_disabled_are_skipped() {
        let store = seeded_store();
        store.with_tables(|t| {
            t.mappings[0].status_notif = Some("0".into());
            t.pending_lines.push(pending("R001", 0));
        });
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store, messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary.found, 0);
    }

    fn logs_for_every_code(sent_at: NaiveDateTime) -> Vec<NotificationLog> {
        (0..10_000)
            .map(|n| NotificationLog {
                no_resep: format!("R-{n}"),
                kode_brng: "AB001".into(),
                short_code: format!("{n:04}"),
                tgl_notif: sent_at,
                status_notif: "SENT".into(),
            })
            .collect()
    }

    #[tokio::test]
    async fn expired_short_codes_are_reused() {
        let store = seeded_store();
        store.with_tables(|t| {
            t.notification_logs = logs_for_every_code(now() - chrono::Duration::days(400));
            t.pending_lines.push(pending("R001", 0));
        });
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store, messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary, DispatchSummary { found: 1, notified: 1, failed: 0 });
        assert_eq!(messenger.sent().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_short_codes_fail_the_line_not_the_run() {
        let store = seeded_store();
        store.with_tables(|t| {
            t.notification_logs = logs_for_every_code(now() - chrono::Duration::hours(1));
            t.pending_lines.push(pending("R001", 0));
            t.pending_lines.push(pending("R002", 0));
        });
        let messenger = Arc::new(RecordingMessenger::default());

        let summary = dispatcher(store.clone(), messenger.clone())
            .dispatch_new_prescriptions()
            .await
            .unwrap();

        assert_eq!(summary, DispatchSummary { found: 2, notified: 0, failed: 2 });
        assert!(messenger.sent().is_empty());
        assert_eq!(store.with_tables(|t| t.notification_logs.len()), 10_000);
    }

    #[tokio::test]
    async fn allocation_ignores_codes_older_than_the_cutoff() {
        let store = MemoryStore::new();
        let sent_at = now() - chrono::Duration::hours(80);
        store.with_tables(|t| t.notification_logs = logs_for_every_code(sent_at));

        let code = allocate_short_code(&store, now() - chrono::Duration::hours(72))
            .await
            .unwrap();
        assert_eq!(code.len(), 4);

        let exhausted = allocate_short_code(&store, sent_at).await;
        assert!(matches!(exhausted, Err(SimrsError::ShortCodeExhausted(_))));
    }
}
