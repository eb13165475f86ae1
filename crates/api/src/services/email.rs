//! Email delivery.
//!
//! Providers:
//! - `console`: logs the message (default)
//! - `sendgrid`: SendGrid v3 mail API

use crate::config::EmailConfig;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Email service disabled")]
    Disabled,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    http: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig, http: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Sends one message. `Disabled` when email is switched off.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(to = %message.to, subject = %message.subject, "Email disabled, skipping send");
            return Err(EmailError::Disabled);
        }

        if !validator::ValidateEmail::validate_email(&message.to) {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider.as_str() {
            "console" => {
                self.send_console(&message);
                Ok(())
            }
            "sendgrid" => self.send_sendgrid(&message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    fn send_console(&self, message: &EmailMessage) {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );
        debug!(body = %message.body_text, "Email body");
    }

    async fn send_sendgrid(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut recipient = json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = json!(name);
        }

        let body = json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [{
                "type": "text/plain",
                "value": message.body_text
            }]
        });

        let response = self
            .http
            .post(SENDGRID_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "SendGrid rejected email");
            Err(EmailError::ProviderError(format!("SendGrid returned {}", status)))
        }
    }
}
