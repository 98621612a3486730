//! # SIMRS Messaging
//!
//! Sends outgoing WhatsApp messages through the n8n automation webhook.

use async_trait::async_trait;
use reqwest::Client;
use simrs_core::messaging::{Messenger, OutgoingMessage};
use simrs_core::{CoreConfig, SimrsError, SimrsResult};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Posts each message as JSON to the automation workflow, which relays it to WhatsApp.
#[derive(Clone, Debug)]
pub struct N8nWebhookMessenger {
    client: Client,
    url: String,
}

impl N8nWebhookMessenger {
    /// # Errors
    /// Returns `SimrsError::Messaging` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> SimrsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SimrsError::Messaging(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Messenger for the outgoing PPRA webhook of `cfg`.
    pub fn from_config(cfg: &CoreConfig) -> SimrsResult<Self> {
        Self::new(cfg.outgoing_webhook_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Messenger for N8nWebhookMessenger {
    async fn send(&self, message: &OutgoingMessage) -> SimrsResult<()> {
        tracing::debug!(
            "Posting {} for {} to {}",
            message.kind,
            message.no_resep,
            self.url
        );

        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| SimrsError::Messaging(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Automation webhook answered {}: {}", status, body);
            return Err(SimrsError::Messaging(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_comes_from_config() {
        let cfg = CoreConfig::with_defaults("http://n8n.local:5678/").unwrap();
        let messenger = N8nWebhookMessenger::from_config(&cfg).unwrap();
        assert_eq!(
            messenger.url(),
            "http://n8n.local:5678/webhook/ppra-outgoing-notif"
        );
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_messaging_error() {
        let messenger = N8nWebhookMessenger::new("http://127.0.0.1:1/webhook").unwrap();
        let msg = OutgoingMessage::ppra("R1", "B1", "0042", "628123", "Siti", "Cefixime", "hi");
        let err = messenger.send(&msg).await.unwrap_err();
        assert!(matches!(err, SimrsError::Messaging(_)));
    }
}
