//! Advancing the verification chain.
//!
//! HTTP callers are trusted: the actor is whoever the API layer authenticated. WhatsApp replies
//! are not: the sender's phone number must belong to a roster member, and the short code must
//! belong to a notification that has not expired. A positive pharmacist review is forwarded to
//! the chairman with the same short code, so the chairman's reply lands on the same line.

use crate::config::CoreConfig;
use crate::constants::{COMMAND_ACC, PERSETUJUAN_ACC, PERSETUJUAN_REJECT, TELAAH_SESUAI, TELAAH_TIDAK_SESUAI};
use crate::error::{SimrsError, SimrsResult};
use crate::messaging::{OutgoingMessage, SharedMessenger};
use crate::patient::{age_description, weight_description};
use crate::ppra::notification::{chairman_approval_message, ChairmanNotice};
use crate::ppra::{PrescriptionLineKey, RosterEntry, StageDecision, VerificationPatch};
use crate::store::SharedStore;
use crate::Clock;
use api_shared::dto::{
    ApproveReq, ReviewReq, SaveAdjustmentReq, Verification, VerificationKeyQuery,
    WhatsappReplyReq, WhatsappReplyRes,
};
use simrs_types::{NonEmptyText, PhoneNumber};
use std::sync::Arc;

pub const MSG_ADJUSTMENT_SAVED: &str = "Data verifikasi PPRA berhasil disimpan";
pub const MSG_REVIEW_SAVED: &str = "Telaah apoteker berhasil disimpan";
pub const MSG_APPROVAL_SAVED: &str = "Persetujuan ketua PPRA berhasil disimpan";
pub const MSG_VERIFICATION_FETCHED: &str = "Data verifikasi PPRA berhasil diambil";
pub const MSG_WA_REVIEW_SAVED: &str = "Telaah apoteker berhasil diperbarui via WA";
pub const MSG_WA_APPROVAL_SAVED: &str = "Persetujuan ketua berhasil diperbarui via WA";

const MSG_UNKNOWN_SENDER: &str = "Nomor pengirim tidak terdaftar sebagai Tim PPRA";

/// A WhatsApp reply after validation.
#[derive(Clone, Debug, PartialEq)]
pub struct WhatsappCommand {
    /// Upper-cased command word, `ACC` or anything else for a refusal.
    pub command: String,
    pub code: String,
    pub comment: Option<String>,
    pub sender: PhoneNumber,
}

impl WhatsappCommand {
    pub fn is_affirmative(&self) -> bool {
        self.command == COMMAND_ACC
    }

    /// Validates a relayed reply.
    ///
    /// Structured fields win; when `command` or `code` is missing the raw `text` is split as
    /// `COMMAND CODE [comment...]`.
    ///
    /// # Errors
    /// `InvalidInput` when the command, code or sender cannot be determined.
    pub fn from_request(req: WhatsappReplyReq) -> SimrsResult<Self> {
        let mut command = non_blank(req.command);
        let mut code = non_blank(req.code);
        let mut comment = non_blank(req.comment);

        if command.is_none() || code.is_none() {
            if let Some(text) = req.text.as_deref() {
                let mut words = text.split_whitespace();
                command = command.or_else(|| words.next().map(str::to_string));
                code = code.or_else(|| words.next().map(str::to_string));
                let rest = words.collect::<Vec<_>>().join(" ");
                if comment.is_none() && !rest.is_empty() {
                    comment = Some(rest);
                }
            }
        }

        let command = command
            .ok_or_else(|| SimrsError::InvalidInput("command is required".into()))?
            .to_uppercase();
        let code = code.ok_or_else(|| SimrsError::InvalidInput("code is required".into()))?;
        let sender = req
            .sender
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SimrsError::InvalidInput("sender is required".into()))?;
        let sender = PhoneNumber::parse(sender)
            .map_err(|e| SimrsError::InvalidInput(format!("sender: {e}")))?;

        Ok(Self {
            command,
            code,
            comment,
            sender,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_status(value: &str, field: &str) -> SimrsResult<String> {
    NonEmptyText::new(value)
        .map(NonEmptyText::into_inner)
        .map_err(|_| SimrsError::InvalidInput(format!("{field} is required")))
}

/// Verification chain operations.
#[derive(Clone)]
pub struct VerificationService {
    cfg: Arc<CoreConfig>,
    store: SharedStore,
    messenger: SharedMessenger,
    clock: Clock,
}

impl VerificationService {
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

    async fn write(
        &self,
        key: &PrescriptionLineKey,
        patch: VerificationPatch,
    ) -> SimrsResult<Verification> {
        let now = (self.clock)();
        let record = self.store.upsert_verification(key, &patch, now).await?;
        Ok(record.into())
    }

    /// Stores the ward's dosage adjustment.
    pub async fn save_adjustment(
        &self,
        req: SaveAdjustmentReq,
        actor: &str,
    ) -> SimrsResult<Verification> {
        let key = PrescriptionLineKey::new(&req.no_resep, &req.kode_brng)?;
        let saved = self
            .write(
                &key,
                VerificationPatch::Adjustment {
                    aturan_pakai: req.aturan_pakai,
                    keterangan: req.keterangan,
                    actor: actor.to_string(),
                },
            )
            .await?;
        tracing::info!("Dosage adjustment saved for {} by {}", key, actor);
        Ok(saved)
    }

    /// Stores a pharmacist review.
    ///
    /// A `SESUAI` review of a line that was announced over WhatsApp is forwarded to the
    /// chairman with the line's short code.
    pub async fn review(&self, req: ReviewReq, actor: &str) -> SimrsResult<Verification> {
        let key = PrescriptionLineKey::new(&req.no_resep, &req.kode_brng)?;
        let status = required_status(&req.status_telaah, "status_telaah")?;
        let affirmative = status == TELAAH_SESUAI;

        let saved = self
            .write(
                &key,
                VerificationPatch::Review(StageDecision {
                    actor: actor.to_string(),
                    status,
                    note: req.catatan_telaah,
                }),
            )
            .await?;
        tracing::info!("Review saved for {} by {}", key, actor);

        if affirmative {
            match self.store.find_notification_for_line(&key).await {
                Ok(Some(log)) => self.forward_to_chairman(&key, &log.short_code, actor).await,
                Ok(None) => tracing::debug!("{} has no short code, not forwarding", key),
                Err(e) => tracing::error!("Short code lookup for {} failed: {:?}", key, e),
            }
        }
        Ok(saved)
    }

    /// Stores the chairman's approval.
    pub async fn approve(&self, req: ApproveReq, actor: &str) -> SimrsResult<Verification> {
        let key = PrescriptionLineKey::new(&req.no_resep, &req.kode_brng)?;
        let status = required_status(&req.status_persetujuan, "status_persetujuan")?;
        let saved = self
            .write(
                &key,
                VerificationPatch::Approval(StageDecision {
                    actor: actor.to_string(),
                    status,
                    note: req.catatan_persetujuan,
                }),
            )
            .await?;
        tracing::info!("Approval saved for {} by {}", key, actor);
        Ok(saved)
    }

    pub async fn show(&self, query: VerificationKeyQuery) -> SimrsResult<Option<Verification>> {
        let key = PrescriptionLineKey::new(&query.no_resep, &query.kode_brng)?;
        Ok(self
            .store
            .find_verification(&key)
            .await?
            .map(Verification::from))
    }

    /// Applies a WhatsApp reply.
    ///
    /// Returns the envelope message and the affected line.
    ///
    /// # Errors
    /// `InvalidInput` for a malformed reply, `Forbidden` when the sender is not on the roster,
    /// `UnknownShortCode` when the code is unknown or expired. No row is written in these cases.
    pub async fn handle_whatsapp_reply(
        &self,
        req: WhatsappReplyReq,
    ) -> SimrsResult<(&'static str, WhatsappReplyRes)> {
        let cmd = WhatsappCommand::from_request(req)?;

        let member = match cmd.sender.lookup_suffix() {
            Some(suffix) => self.store.find_roster_by_phone_suffix(suffix).await?,
            None => None,
        };
        let member = member.ok_or_else(|| {
            tracing::warn!("WhatsApp reply from unknown number {}", cmd.sender);
            SimrsError::Forbidden(MSG_UNKNOWN_SENDER.into())
        })?;

        let now = (self.clock)();
        let log = self
            .store
            .find_notification_by_code(&cmd.code)
            .await?
            .filter(|log| now - log.tgl_notif <= self.cfg.short_code_ttl())
            .ok_or(SimrsError::UnknownShortCode)?;
        let key = PrescriptionLineKey::new(&log.no_resep, &log.kode_brng)?;

        let (patch, message) = stage_for(&member, &cmd);
        let forward = matches!(&patch, VerificationPatch::Review(d) if d.status == TELAAH_SESUAI);
        self.store.upsert_verification(&key, &patch, now).await?;
        tracing::info!(
            "WhatsApp {} from {} ({}) applied to {}",
            cmd.command,
            member.nip,
            member.jabatan,
            key
        );

        if forward {
            self.forward_to_chairman(&key, &log.short_code, &member.nip)
                .await;
        }

        Ok((
            message,
            WhatsappReplyRes {
                no_resep: log.no_resep,
                kode_brng: log.kode_brng,
                role: member.jabatan,
                status: cmd.command,
            },
        ))
    }

    /// Sends the approval request to the chairman. Failures are logged, never returned.
    async fn forward_to_chairman(
        &self,
        key: &PrescriptionLineKey,
        short_code: &str,
        pharmacist_nip: &str,
    ) {
        if let Err(e) = self.try_forward(key, short_code, pharmacist_nip).await {
            tracing::error!("Forwarding {} to the PPRA chairman failed: {:?}", key, e);
        }
    }

    async fn try_forward(
        &self,
        key: &PrescriptionLineKey,
        short_code: &str,
        pharmacist_nip: &str,
    ) -> SimrsResult<()> {
        let Some(chairman) = self.store.find_chairman_contact().await? else {
            tracing::debug!("No PPRA chairman with a phone number, skipping {}", key);
            return Ok(());
        };
        let Ok(phone) = PhoneNumber::parse(&chairman.no_telp) else {
            tracing::debug!("PPRA chairman phone is unusable, skipping {}", key);
            return Ok(());
        };
        let Some(detail) = self.store.prescription_line_detail(key).await? else {
            tracing::debug!("No prescription detail for {}, skipping", key);
            return Ok(());
        };
        let pharmacist_name = self
            .store
            .staff_name(pharmacist_nip)
            .await?
            .unwrap_or_else(|| pharmacist_nip.to_string());

        let today = (self.clock)().date();
        let text = chairman_approval_message(&ChairmanNotice {
            hospital_name: self.cfg.hospital_name(),
            pharmacist_name: &pharmacist_name,
            detail: &detail,
            age: &age_description(detail.tgl_lahir, today),
            weight: &weight_description(detail.berat_badan),
            short_code,
        });
        let message = OutgoingMessage::ppra(
            key.no_resep.as_str(),
            key.kode_brng.as_str(),
            short_code,
            phone.international(),
            &detail.nm_pasien,
            &detail.nama_brng,
            text,
        );
        self.messenger.send(&message).await?;
        tracing::info!("Forwarded {} to PPRA chairman {}", key, chairman.nama);
        Ok(())
    }
}

/// Pharmacists review, every other roster member approves.
fn stage_for(member: &RosterEntry, cmd: &WhatsappCommand) -> (VerificationPatch, &'static str) {
    if member.is_pharmacist() {
        let status = if cmd.is_affirmative() {
            TELAAH_SESUAI
        } else {
            TELAAH_TIDAK_SESUAI
        };
        (
            VerificationPatch::Review(StageDecision {
                actor: member.nip.clone(),
                status: status.into(),
                note: cmd.comment.clone(),
            }),
            MSG_WA_REVIEW_SAVED,
        )
    } else {
        let status = if cmd.is_affirmative() {
            PERSETUJUAN_ACC
        } else {
            PERSETUJUAN_REJECT
        };
        (
            VerificationPatch::Approval(StageDecision {
                actor: member.nip.clone(),
                status: status.into(),
                note: cmd.comment.clone(),
            }),
            MSG_WA_APPROVAL_SAVED,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::testing::RecordingMessenger;
    use crate::ppra::{NotificationLog, PrescriptionLineDetail};
    use crate::store::memory::{MemoryStore, StaffRow, TeamRow};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    struct Fixture {
        svc: VerificationService,
        store: Arc<MemoryStore>,
        messenger: Arc<RecordingMessenger>,
    }

    fn fixture_with(messenger: RecordingMessenger) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.with_tables(|t| {
            t.staff.push(StaffRow::new("APT1", "apt. Dewi", Some("0812-3456-7890")));
            t.staff.push(StaffRow::new("KT1", "dr. Hasan, Sp.A", Some("081298765432")));
            t.staff.push(StaffRow::new("DR2", "dr. Lina", Some("081311112222")));
            t.team.push(TeamRow::new(1, "APT1", "Anggota", Some("Apoteker")));
            t.team.push(TeamRow::new(2, "KT1", "Ketua", None));
            t.team.push(TeamRow::new(3, "DR2", "Wakil Ketua", None));
            t.notification_logs.push(NotificationLog {
                no_resep: "R001".into(),
                kode_brng: "AB1".into(),
                short_code: "0420".into(),
                tgl_notif: now() - Duration::hours(2),
                status_notif: "SENT".into(),
            });
            t.line_details.insert(
                ("R001".into(), "AB1".into()),
                PrescriptionLineDetail {
                    no_resep: "R001".into(),
                    nama_brng: "Ceftriaxone 1g".into(),
                    aturan_pakai: Some("2x1gr".into()),
                    nm_pasien: "By. Ny. Rina".into(),
                    tgl_lahir: NaiveDate::from_ymd_opt(2026, 8, 10),
                    berat_badan: Some(4.27),
                },
            );
        });
        let messenger = Arc::new(messenger);
        let svc = VerificationService::new(
            Arc::new(CoreConfig::with_defaults("http://n8n.local").unwrap()),
            store.clone(),
            messenger.clone(),
            Arc::new(now),
        );
        Fixture {
            svc,
            store,
            messenger,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingMessenger::default())
    }

    fn reply(command: &str, code: &str, sender: &str) -> WhatsappReplyReq {
        WhatsappReplyReq {
            command: Some(command.into()),
            code: Some(code.into()),
            comment: Some("dosis sesuai".into()),
            sender: Some(sender.into()),
            text: None,
        }
    }

    fn key() -> PrescriptionLineKey {
        PrescriptionLineKey::new("R001", "AB1").unwrap()
    }

    #[test]
    fn free_text_reply_is_split() {
        let cmd = WhatsappCommand::from_request(WhatsappReplyReq {
            text: Some("acc 0420 dosis sudah sesuai".into()),
            sender: Some("+62 812-3456-7890".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cmd.command, "ACC");
        assert_eq!(cmd.code, "0420");
        assert_eq!(cmd.comment.as_deref(), Some("dosis sudah sesuai"));
        assert_eq!(cmd.sender.lookup_suffix(), Some("1234567890"));
    }

    #[test]
    fn reply_without_sender_is_invalid() {
        let err = WhatsappCommand::from_request(WhatsappReplyReq {
            command: Some("ACC".into()),
            code: Some("0420".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, SimrsError::InvalidInput(ref m) if m.contains("sender")));
    }

    #[tokio::test]
    async fn stages_upsert_the_same_row() {
        let f = fixture();
        f.svc
            .save_adjustment(
                SaveAdjustmentReq {
                    no_resep: "R001".into(),
                    kode_brng: "AB1".into(),
                    aturan_pakai: Some("2x500mg".into()),
                    keterangan: None,
                },
                "perawat1",
            )
            .await
            .unwrap();
        f.svc
            .approve(
                ApproveReq {
                    no_resep: "R001".into(),
                    kode_brng: "AB1".into(),
                    status_persetujuan: "ACC".into(),
                    catatan_persetujuan: Some("ok".into()),
                },
                "ketua",
            )
            .await
            .unwrap();

        let rows = f.store.with_tables(|t| t.verifications.clone());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].aturan_pakai.as_deref(), Some("2x500mg"));
        assert_eq!(rows[0].nik_petugas.as_deref(), Some("perawat1"));
        assert_eq!(rows[0].status_persetujuan.as_deref(), Some("ACC"));
        assert_eq!(rows[0].tgl_persetujuan, Some(now()));
        assert_eq!(rows[0].status_telaah, None);
    }

    #[tokio::test]
    async fn review_requires_key_and_status() {
        let f = fixture();
        let err = f
            .svc
            .review(
                ReviewReq {
                    no_resep: "R001".into(),
                    ..Default::default()
                },
                "apt",
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        let err = f
            .svc
            .review(
                ReviewReq {
                    no_resep: "R001".into(),
                    kode_brng: "AB1".into(),
                    ..Default::default()
                },
                "apt",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SimrsError::InvalidInput(ref m) if m.contains("status_telaah")));
    }

    #[tokio::test]
    async fn http_review_sesuai_forwards_when_line_has_code() {
        let f = fixture();
        f.svc
            .review(
                ReviewReq {
                    no_resep: "R001".into(),
                    kode_brng: "AB1".into(),
                    status_telaah: "SESUAI".into(),
                    catatan_telaah: None,
                },
                "APT1",
            )
            .await
            .unwrap();
        let sent = f.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].phone, "6281298765432");
        assert_eq!(sent[0].short_code, "0420");

        let other = fixture();
        other
            .svc
            .review(
                ReviewReq {
                    no_resep: "R999".into(),
                    kode_brng: "AB1".into(),
                    status_telaah: "SESUAI".into(),
                    catatan_telaah: None,
                },
                "APT1",
            )
            .await
            .unwrap();
        assert!(other.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn pharmacist_acc_reviews_and_forwards_to_chairman() {
        let f = fixture();
        let (message, res) = f
            .svc
            .handle_whatsapp_reply(reply("acc", "0420", "6281234567890"))
            .await
            .unwrap();

        assert_eq!(message, MSG_WA_REVIEW_SAVED);
        assert_eq!(
            res,
            WhatsappReplyRes {
                no_resep: "R001".into(),
                kode_brng: "AB1".into(),
                role: "Anggota".into(),
                status: "ACC".into(),
            }
        );

        let row = f.svc.show(VerificationKeyQuery {
            no_resep: "R001".into(),
            kode_brng: "AB1".into(),
        });
        let row = row.await.unwrap().unwrap();
        assert_eq!(row.status_telaah.as_deref(), Some("SESUAI"));
        assert_eq!(row.petugas_telaah.as_deref(), Some("APT1"));
        assert_eq!(row.catatan_telaah.as_deref(), Some("dosis sesuai"));

        let sent = f.messenger.sent();
        assert_eq!(sent.len(), 1);
        let msg = &sent[0];
        assert_eq!(msg.phone, "6281298765432");
        assert_eq!(msg.kind, "OUTGOING_PPRA");
        assert!(msg.message_text.contains("APPROVAL PPRA (KETUA) - RSIA AISYIYAH"));
        assert!(msg.message_text.contains("*apt. Dewi*"));
        assert!(msg.message_text.contains("Usia: 2 bulan 9 hari | BB: 4.3 kg"));
        assert!(msg.message_text.contains("Dosis: *2x1gr*"));
        assert!(msg.message_text.contains("ACC 0420 [Catatan]"));
    }

    #[tokio::test]
    async fn pharmacist_refusal_does_not_forward() {
        let f = fixture();
        f.svc
            .handle_whatsapp_reply(reply("TOLAK", "0420", "081234567890"))
            .await
            .unwrap();
        let row = f.svc.store.find_verification(&key()).await.unwrap().unwrap();
        assert_eq!(row.status_telaah.as_deref(), Some("TIDAK SESUAI"));
        assert!(f.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn non_pharmacist_reply_writes_approval() {
        let f = fixture();
        let (message, res) = f
            .svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281298765432"))
            .await
            .unwrap();
        assert_eq!(message, MSG_WA_APPROVAL_SAVED);
        assert_eq!(res.role, "Ketua");

        let row = f.svc.store.find_verification(&key()).await.unwrap().unwrap();
        assert_eq!(row.status_persetujuan.as_deref(), Some("ACC"));
        assert_eq!(row.petugas_persetujuan.as_deref(), Some("KT1"));
        assert_eq!(row.status_telaah, None);

        f.svc
            .handle_whatsapp_reply(reply("no", "0420", "6281311112222"))
            .await
            .unwrap();
        let row = f.svc.store.find_verification(&key()).await.unwrap().unwrap();
        assert_eq!(row.status_persetujuan.as_deref(), Some("REJECT"));
        assert!(f.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_sender_is_forbidden_and_nothing_is_written() {
        let f = fixture();
        let err = f
            .svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6289999999999"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert!(f.store.with_tables(|t| t.verifications.is_empty()));
    }

    #[tokio::test]
    async fn short_sender_does_not_match_roster_by_trailing_digits() {
        let f = fixture();
        for sender in ["2", "0", "7890", "3456-7890"] {
            let err = f
                .svc
                .handle_whatsapp_reply(reply("ACC", "0420", sender))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 403, "sender {sender}");
        }
        assert!(f.store.with_tables(|t| t.verifications.is_empty()));
        assert!(f.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn unknown_code_is_rejected_without_mutation() {
        let f = fixture();
        let err = f
            .svc
            .handle_whatsapp_reply(reply("ACC", "9999", "6281234567890"))
            .await
            .unwrap_err();
        assert!(matches!(err, SimrsError::UnknownShortCode));
        assert_eq!(err.status_code(), 404);
        assert!(f.store.with_tables(|t| t.verifications.is_empty()));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let f = fixture();
        f.store.with_tables(|t| {
            t.notification_logs[0].tgl_notif = now() - Duration::hours(73);
        });
        let err = f
            .svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281234567890"))
            .await
            .unwrap_err();
        assert!(matches!(err, SimrsError::UnknownShortCode));
        assert!(f.store.with_tables(|t| t.verifications.is_empty()));
    }

    #[tokio::test]
    async fn messaging_failure_does_not_fail_the_reply() {
        let f = fixture_with(RecordingMessenger::failing_for(&["6281298765432"]));
        let (message, _) = f
            .svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281234567890"))
            .await
            .unwrap();
        assert_eq!(message, MSG_WA_REVIEW_SAVED);
        assert!(f.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_detail_or_chairman_skips_forwarding() {
        let f = fixture();
        f.store.with_tables(|t| t.line_details.clear());
        f.svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281234567890"))
            .await
            .unwrap();
        assert!(f.messenger.sent().is_empty());

        let g = fixture();
        g.store.with_tables(|t| t.team.retain(|m| m.jabatan != "Ketua"));
        g.svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281234567890"))
            .await
            .unwrap();
        assert!(g.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_birth_date_and_weight_render_dashes() {
        let f = fixture();
        f.store.with_tables(|t| {
            let detail = t.line_details.values_mut().next().unwrap();
            detail.tgl_lahir = None;
            detail.berat_badan = None;
            detail.aturan_pakai = None;
        });
        f.svc
            .handle_whatsapp_reply(reply("ACC", "0420", "6281234567890"))
            .await
            .unwrap();
        let text = &f.messenger.sent()[0].message_text;
        assert!(text.contains("Usia: - | BB: -"));
        assert!(text.contains("Dosis: *-*"));
    }

    #[tokio::test]
    async fn show_returns_none_for_untouched_line() {
        let f = fixture();
        let found = f
            .svc
            .show(VerificationKeyQuery {
                no_resep: "R001".into(),
                kode_brng: "AB1".into(),
            })
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
