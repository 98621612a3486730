//! Outgoing WhatsApp messages.
//!
//! The hospital does not talk to WhatsApp directly: messages are posted to an n8n automation
//! workflow which relays them. The core only composes the payload; `simrs-messaging` sends it.

use crate::constants::OUTGOING_PPRA_TYPE;
use crate::error::SimrsResult;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Payload of the outgoing PPRA webhook.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub no_resep: String,
    pub kode_brng: String,
    pub short_code: String,
    /// Recipient in international form (`628...`).
    pub phone: String,
    pub nm_pasien: String,
    pub nama_obat: String,
    pub message_text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl OutgoingMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn ppra(
        no_resep: impl Into<String>,
        kode_brng: impl Into<String>,
        short_code: impl Into<String>,
        phone: impl Into<String>,
        nm_pasien: impl Into<String>,
        nama_obat: impl Into<String>,
        message_text: impl Into<String>,
    ) -> Self {
        Self {
            no_resep: no_resep.into(),
            kode_brng: kode_brng.into(),
            short_code: short_code.into(),
            phone: phone.into(),
            nm_pasien: nm_pasien.into(),
            nama_obat: nama_obat.into(),
            message_text: message_text.into(),
            kind: OUTGOING_PPRA_TYPE.into(),
        }
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Hands a message to the relay.
    ///
    /// # Errors
    /// Returns `SimrsError::Messaging` when the relay cannot be reached or answers with a
    /// non-success status.
    async fn send(&self, message: &OutgoingMessage) -> SimrsResult<()>;
}

pub type SharedMessenger = Arc<dyn Messenger>;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::SimrsError;
    use std::sync::Mutex;

    /// Records every message; fails for phones listed in `failing`.
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<OutgoingMessage>>,
        pub failing: Vec<String>,
    }

    impl RecordingMessenger {
        pub fn failing_for(phones: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: phones.iter().map(|p| p.to_string()).collect(),
            }
        }

        pub fn sent(&self) -> Vec<OutgoingMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, message: &OutgoingMessage) -> SimrsResult<()> {
            if self.failing.contains(&message.phone) {
                return Err(SimrsError::Messaging(format!(
                    "relay refused {}",
                    message.phone
                )));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_type_field() {
        let msg = OutgoingMessage::ppra("R1", "B1", "0042", "628123", "Siti", "Cefixime", "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "OUTGOING_PPRA");
        assert_eq!(json["short_code"], "0042");
        assert!(json.get("kind").is_none());
    }
}
