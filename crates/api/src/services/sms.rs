//! SMS delivery.
//!
//! Providers:
//! - `console`: logs the message (default)
//! - `twilio`: Twilio Messages API

use crate::config::SmsConfig;
use domain::models::account::PHONE_REGEX;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS service not configured")]
    NotConfigured,

    #[error("SMS service disabled")]
    Disabled,

    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    #[error("Failed to send SMS: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Clone)]
pub struct SmsService {
    config: Arc<SmsConfig>,
    http: reqwest::Client,
}

impl SmsService {
    pub fn new(config: SmsConfig, http: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        if !self.config.enabled {
            debug!(to = %to, "SMS disabled, skipping send");
            return Err(SmsError::Disabled);
        }

        if !PHONE_REGEX.is_match(to) {
            return Err(SmsError::InvalidNumber(to.to_string()));
        }

        match self.config.provider.as_str() {
            "console" => {
                info!(to = %to, from = %self.config.from_number, chars = body.len(), "SMS (console provider)");
                debug!(body = %body, "SMS body");
                Ok(())
            }
            "twilio" => self.send_twilio(to, body).await,
            provider => {
                error!(provider = %provider, "Unknown SMS provider");
                Err(SmsError::NotConfigured)
            }
        }
    }

    async fn send_twilio(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let sid = &self.config.twilio_account_sid;
        if sid.is_empty() || self.config.twilio_auth_token.is_empty() || self.config.from_number.is_empty() {
            return Err(SmsError::NotConfigured);
        }

        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, sid);
        let response = self
            .http
            .post(url)
            .basic_auth(sid, Some(&self.config.twilio_auth_token))
            .form(&[("To", to), ("From", self.config.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| SmsError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(to = %to, "SMS sent via Twilio");
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "Twilio rejected SMS");
            Err(SmsError::ProviderError(format!("Twilio returned {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(enabled: bool, provider: &str) -> SmsService {
        SmsService::new(
            SmsConfig {
                enabled,
                provider: provider.to_string(),
                ..SmsConfig::default()
            },
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_disabled() {
        assert!(matches!(
            service(false, "console").send("+34 600 123 456", "hi").await,
            Err(SmsError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_console_provider() {
        assert!(service(true, "console").send("+34 600 123 456", "hi").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_number() {
        assert!(matches!(
            service(true, "console").send("call me", "hi").await,
            Err(SmsError::InvalidNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_twilio_requires_credentials() {
        assert!(matches!(
            service(true, "twilio").send("+34 600 123 456", "hi").await,
            Err(SmsError::NotConfigured)
        ));
    }
}
