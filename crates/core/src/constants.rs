//! Constants used throughout the SIMRS core crate.
//!
//! Status tokens and table values are the ones stored in the hospital database, so they are
//! kept in Indonesian exactly as the other SIMRS clients write them.

/// Default hospital name used in outgoing message headers.
pub const DEFAULT_HOSPITAL_NAME: &str = "RSIA AISYIYAH";

/// Path appended to the automation base URL for outgoing PPRA messages.
pub const PPRA_OUTGOING_WEBHOOK_PATH: &str = "/webhook/ppra-outgoing-notif";

/// Message type tag expected by the automation workflow.
pub const OUTGOING_PPRA_TYPE: &str = "OUTGOING_PPRA";

/// Default lifetime of a WhatsApp short code.
pub const DEFAULT_SHORT_CODE_TTL_HOURS: i64 = 72;

/// Default look-back window (days) for new prescription dispatch.
pub const DEFAULT_NOTIFY_LOOKBACK_DAYS: i64 = 2;

/// Number of digits in a short code.
pub const SHORT_CODE_DIGITS: usize = 4;

/// Attempts made to find an unused short code before giving up.
pub const SHORT_CODE_MAX_ATTEMPTS: usize = 50;

/// Reply command that affirms a review or approval.
pub const COMMAND_ACC: &str = "ACC";

/// Pharmacist review outcome: prescription matches guidelines.
pub const TELAAH_SESUAI: &str = "SESUAI";
/// Pharmacist review outcome: prescription does not match guidelines.
pub const TELAAH_TIDAK_SESUAI: &str = "TIDAK SESUAI";
/// Review status shown in reports when no review exists yet.
pub const TELAAH_BELUM: &str = "BELUM";

/// Chairman approval outcome: approved.
pub const PERSETUJUAN_ACC: &str = "ACC";
/// Chairman approval outcome: rejected.
pub const PERSETUJUAN_REJECT: &str = "REJECT";
/// Approval status shown in reports when no approval exists yet.
pub const PERSETUJUAN_PENDING: &str = "PENDING";

/// Roster position of the committee chairman.
pub const JABATAN_KETUA: &str = "Ketua";

/// Roster ordering used by the team listing.
pub const JABATAN_ORDER: [&str; 4] = ["Ketua", "Wakil Ketua", "Sekretaris", "Anggota"];

/// Keywords that identify a pharmacist in a roster position or role.
pub const PHARMACIST_KEYWORDS: [&str; 2] = ["apoteker", "farmasi"];

/// Notification log status written after a successful dispatch.
pub const NOTIF_STATUS_SENT: &str = "SENT";

/// Fallback actor identity when the caller did not identify themselves.
pub const ANONYMOUS_ACTOR: &str = "-";

/// Registration status excluded from queue counts.
pub const REGISTRATION_CANCELLED: &str = "Batal";

/// Number of days covered by the queue summary.
pub const QUEUE_SUMMARY_DAYS: i64 = 7;

/// Default page size of the drug mapping listing.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Maximum number of drugs returned by the unmapped-drug search.
pub const DRUG_SEARCH_LIMIT: u32 = 20;

/// Offset of hospital local time (WIB) from UTC, used for Antrol epoch timestamps.
pub const ANTROL_UTC_OFFSET_HOURS: i64 = 7;
