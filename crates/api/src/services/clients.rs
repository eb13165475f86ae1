//! HTTP clients for sibling services.
//!
//! Calls always go over HTTP to the configured base URL, even when the
//! sibling is mounted in this process. Each request carries a fresh
//! short-lived service token signed with the shared secret.

use async_trait::async_trait;
use domain::models::notification::{AppointmentAlertRequest, StockAlertRequest};
use domain::services::notifier::{NotificationResult, Notifier};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use shared::jwt::{JwtConfig, JwtError};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::metrics::record_outbound_call;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Could not mint service token: {0}")]
    Token(#[from] JwtError),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} sent an unexpected response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

/// Shared plumbing for the typed clients.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    jwt: Arc<JwtConfig>,
    base_url: String,
    service: &'static str,
}

impl ServiceClient {
    pub fn new(
        http: reqwest::Client,
        jwt: Arc<JwtConfig>,
        base_url: &str,
        service: &'static str,
    ) -> Self {
        Self {
            http,
            jwt,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ClientError> {
        let result = self.call_inner(method, path, body).await;
        record_outbound_call(self.service, result.is_ok());
        result
    }

    async fn call_inner<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ClientError> {
        let token = self.jwt.generate_service_token()?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(service = self.service, method = %method, url = %url, "Calling sibling service");
        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(payload)
        } else {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string();
            Err(ClientError::Status {
                service: self.service,
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Client for the notification service.
#[derive(Clone)]
pub struct NotificationClient {
    inner: ServiceClient,
}

impl NotificationClient {
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    pub async fn appointment_alert(&self, alert: &AppointmentAlertRequest) -> Result<(), ClientError> {
        self.inner
            .call(Method::POST, "/notifications/appointment-alert", Some(alert))
            .await
            .map(|_| ())
    }

    pub async fn stock_alert(&self, alert: &StockAlertRequest) -> Result<(), ClientError> {
        self.inner
            .call(Method::POST, "/notifications/stock-alert", Some(alert))
            .await
            .map(|_| ())
    }
}

/// `Notifier` backed by the notification service.
#[derive(Clone)]
pub struct HttpNotifier {
    client: NotificationClient,
}

impl HttpNotifier {
    pub fn new(client: NotificationClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn appointment_alert(&self, alert: AppointmentAlertRequest) -> NotificationResult {
        if alert.receptionist_emails.is_empty() {
            return NotificationResult::Skipped;
        }
        match self.client.appointment_alert(&alert).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }

    async fn stock_alert(&self, alert: StockAlertRequest) -> NotificationResult {
        if alert.recipients.is_empty() {
            return NotificationResult::Skipped;
        }
        match self.client.stock_alert(&alert).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}

/// Client for the inventory service.
#[derive(Clone)]
pub struct InventoryClient {
    inner: ServiceClient,
}

impl InventoryClient {
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Takes `quantity` units out of stock. Returns the new stock level.
    pub async fn reduce_stock(
        &self,
        medication_id: Uuid,
        quantity: i32,
        reason: &str,
        reference_id: Uuid,
    ) -> Result<i32, ClientError> {
        let body = json!({
            "medication_id": medication_id,
            "quantity": quantity,
            "reason": reason,
            "reference_id": reference_id,
        });
        let payload = self
            .inner
            .call(Method::POST, "/inventory/reduce-stock", Some(&body))
            .await?;

        payload
            .get("new_stock")
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| ClientError::InvalidResponse {
                service: self.inner.service,
                message: "missing new_stock".to_string(),
            })
    }
}

/// Client for the scheduling service.
#[derive(Clone)]
pub struct SchedulingClient {
    inner: ServiceClient,
}

impl SchedulingClient {
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    pub async fn complete_appointment(&self, appointment_id: Uuid) -> Result<(), ClientError> {
        let path = format!("/appointments/{}/complete", appointment_id);
        self.inner
            .call::<Value>(Method::PUT, &path, None)
            .await
            .map(|_| ())
    }
}
