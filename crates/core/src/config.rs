//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Services never read process-wide environment variables during
//! request handling.

use crate::constants::{
    DEFAULT_HOSPITAL_NAME, DEFAULT_NOTIFY_LOOKBACK_DAYS, DEFAULT_SHORT_CODE_TTL_HOURS,
    PPRA_OUTGOING_WEBHOOK_PATH,
};
use crate::{SimrsError, SimrsResult};
use chrono::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    hospital_name: String,
    automation_base_url: String,
    short_code_ttl: Duration,
    notify_lookback: Duration,
    webhook_secret: Option<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    /// Returns `SimrsError::Config` if the hospital name or automation URL is blank, or if
    /// either duration is not positive.
    pub fn new(
        hospital_name: String,
        automation_base_url: String,
        short_code_ttl: Duration,
        notify_lookback: Duration,
        webhook_secret: Option<String>,
    ) -> SimrsResult<Self> {
        if hospital_name.trim().is_empty() {
            return Err(SimrsError::Config("hospital_name cannot be empty".into()));
        }
        let automation_base_url = automation_base_url.trim().trim_end_matches('/').to_string();
        if automation_base_url.is_empty() {
            return Err(SimrsError::Config(
                "automation base URL cannot be empty".into(),
            ));
        }
        if short_code_ttl <= Duration::zero() || notify_lookback <= Duration::zero() {
            return Err(SimrsError::Config(
                "short code TTL and notify look-back must be positive".into(),
            ));
        }

        Ok(Self {
            hospital_name: hospital_name.trim().to_string(),
            automation_base_url,
            short_code_ttl,
            notify_lookback,
            webhook_secret: webhook_secret.filter(|s| !s.trim().is_empty()),
        })
    }

    /// Configuration with defaults for everything but the automation URL.
    pub fn with_defaults(automation_base_url: impl Into<String>) -> SimrsResult<Self> {
        Self::new(
            DEFAULT_HOSPITAL_NAME.into(),
            automation_base_url.into(),
            Duration::hours(DEFAULT_SHORT_CODE_TTL_HOURS),
            Duration::days(DEFAULT_NOTIFY_LOOKBACK_DAYS),
            None,
        )
    }

    /// Configuration from raw environment values (`HOSPITAL_NAME`, `N8N_URL`,
    /// `PPRA_SHORT_CODE_TTL_HOURS`, `PPRA_NOTIFY_LOOKBACK_DAYS`, `PPRA_WEBHOOK_SECRET`).
    ///
    /// # Errors
    /// Returns `SimrsError::Config` when `N8N_URL` is missing or a number is malformed.
    pub fn from_env_values(
        hospital_name: Option<String>,
        automation_base_url: Option<String>,
        short_code_ttl_hours: Option<String>,
        notify_lookback_days: Option<String>,
        webhook_secret: Option<String>,
    ) -> SimrsResult<Self> {
        let automation_base_url = automation_base_url
            .ok_or_else(|| SimrsError::Config("N8N_URL must be set".into()))?;
        let ttl = positive_i64_from_env_value(
            "PPRA_SHORT_CODE_TTL_HOURS",
            short_code_ttl_hours,
            DEFAULT_SHORT_CODE_TTL_HOURS,
        )?;
        let lookback = positive_i64_from_env_value(
            "PPRA_NOTIFY_LOOKBACK_DAYS",
            notify_lookback_days,
            DEFAULT_NOTIFY_LOOKBACK_DAYS,
        )?;
        Self::new(
            hospital_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOSPITAL_NAME.into()),
            automation_base_url,
            Duration::hours(ttl),
            Duration::days(lookback),
            webhook_secret,
        )
    }

    /// Reads [`CoreConfig::from_env_values`] inputs from the process environment.
    pub fn from_env() -> SimrsResult<Self> {
        Self::from_env_values(
            std::env::var("HOSPITAL_NAME").ok(),
            std::env::var("N8N_URL").ok(),
            std::env::var("PPRA_SHORT_CODE_TTL_HOURS").ok(),
            std::env::var("PPRA_NOTIFY_LOOKBACK_DAYS").ok(),
            std::env::var("PPRA_WEBHOOK_SECRET").ok(),
        )
    }

    pub fn hospital_name(&self) -> &str {
        &self.hospital_name
    }

    /// Full URL of the outgoing PPRA webhook.
    pub fn outgoing_webhook_url(&self) -> String {
        format!("{}{}", self.automation_base_url, PPRA_OUTGOING_WEBHOOK_PATH)
    }

    pub fn short_code_ttl(&self) -> Duration {
        self.short_code_ttl
    }

    pub fn notify_lookback(&self) -> Duration {
        self.notify_lookback
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref()
    }
}

/// Parse a positive whole number from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn positive_i64_from_env_value(
    name: &str,
    value: Option<String>,
    default: i64,
) -> SimrsResult<i64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    match value {
        None => Ok(default),
        Some(v) => match v.parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(SimrsError::Config(format!(
                "{name} must be a positive whole number, got {v:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_url_appends_webhook_path_once() {
        let cfg = CoreConfig::with_defaults("http://n8n.local:5678/").unwrap();
        assert_eq!(
            cfg.outgoing_webhook_url(),
            "http://n8n.local:5678/webhook/ppra-outgoing-notif"
        );
    }

    #[test]
    fn blank_secret_is_treated_as_unset() {
        let cfg = CoreConfig::new(
            "RS".into(),
            "http://n8n".into(),
            Duration::hours(1),
            Duration::days(1),
            Some("  ".into()),
        )
        .unwrap();
        assert!(cfg.webhook_secret().is_none());
    }

    #[test]
    fn rejects_blank_automation_url() {
        assert!(matches!(
            CoreConfig::with_defaults(" "),
            Err(SimrsError::Config(_))
        ));
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        let cfg = CoreConfig::from_env_values(None, Some("http://n8n".into()), None, None, None)
            .unwrap();
        assert_eq!(cfg.hospital_name(), DEFAULT_HOSPITAL_NAME);
        assert_eq!(cfg.short_code_ttl(), Duration::hours(72));
        assert_eq!(cfg.notify_lookback(), Duration::days(2));

        let missing_url = CoreConfig::from_env_values(None, None, None, None, None);
        assert!(matches!(missing_url, Err(SimrsError::Config(_))));

        let custom = CoreConfig::from_env_values(
            Some("RS Lain".into()),
            Some("http://n8n".into()),
            Some("24".into()),
            None,
            Some("abc".into()),
        )
        .unwrap();
        assert_eq!(custom.hospital_name(), "RS Lain");
        assert_eq!(custom.short_code_ttl(), Duration::hours(24));
        assert_eq!(custom.webhook_secret(), Some("abc"));
    }

    #[test]
    fn env_value_parsing() {
        assert_eq!(positive_i64_from_env_value("X", None, 72).unwrap(), 72);
        assert_eq!(
            positive_i64_from_env_value("X", Some(" 24 ".into()), 72).unwrap(),
            24
        );
        assert!(positive_i64_from_env_value("X", Some("0".into()), 72).is_err());
        assert!(positive_i64_from_env_value("X", Some("abc".into()), 72).is_err());
    }
}
