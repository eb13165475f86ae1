//! Notification receipts and alert payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::account::PHONE_REGEX;

pub const KIND_GENERIC: &str = "generic";
pub const KIND_APPOINTMENT_ALERT: &str = "appointment_alert";
pub const KIND_STOCK_ALERT: &str = "stock_alert";

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            _ => Err(format!("Invalid channel: {}", s)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider outcome stored on the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored notification receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub channel: Channel,
    pub recipient: String,
    pub notification_type: String,
    pub subject: Option<String>,
    pub message: String,
    pub payload: serde_json::Value,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A receipt about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Option<Uuid>,
    pub channel: Channel,
    pub recipient: String,
    pub notification_type: String,
    pub subject: Option<String>,
    pub message: String,
    pub payload: serde_json::Value,
    pub delivery_status: DeliveryStatus,
    pub error_message: Option<String>,
}

/// Request body for POST /notifications/send.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_recipient_for_channel", skip_on_field_errors = false))]
pub struct SendNotificationRequest {
    pub user_id: Option<Uuid>,
    pub channel: Channel,
    #[validate(length(min = 1, max = 255, message = "recipient is required"))]
    pub recipient: String,
    #[validate(length(max = 255))]
    pub subject: Option<String>,
    #[validate(
        length(min = 1, max = 10000, message = "message is required"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub message: String,
}

fn validate_recipient_for_channel(request: &SendNotificationRequest) -> Result<(), ValidationError> {
    let ok = match request.channel {
        Channel::Email => validator::ValidateEmail::validate_email(&request.recipient),
        Channel::Sms => PHONE_REGEX.is_match(&request.recipient),
    };
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("recipient");
        err.message = Some(format!("recipient is not a valid {} address", request.channel).into());
        Err(err)
    }
}

/// Appointment fields carried in an appointment alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub id: Uuid,
    pub date: NaiveDate,
    /// `HH:MM`
    pub time: String,
    pub client_id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

impl AppointmentDetails {
    pub fn subject(&self) -> String {
        format!("New appointment on {} at {}", self.date, self.time)
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "A new appointment has been booked.\n\nDate: {}\nTime: {}\nReason: {}\n",
            self.date, self.time, self.reason
        );
        if let Some(pet) = &self.pet_name {
            body.push_str(&format!("Pet: {}\n", pet));
        }
        if let Some(owner) = &self.owner_name {
            body.push_str(&format!("Owner: {}\n", owner));
        }
        body.push_str(&format!(
            "Veterinarian: {}\nAppointment ID: {}\n",
            self.veterinarian_id, self.id
        ));
        body
    }
}

/// Request body for POST /notifications/appointment-alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppointmentAlertRequest {
    pub appointment_details: AppointmentDetails,
    #[validate(length(min = 1, message = "receptionist_emails must not be empty"))]
    pub receptionist_emails: Vec<String>,
}

/// Kind of stock alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    Expiring,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::Expiring => "expiring",
        }
    }
}

/// Medication fields carried in a stock alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlertMedication {
    pub id: Uuid,
    pub name: String,
    pub stock_quantity: i32,
    pub minimum_stock: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_expiration: Option<i64>,
}

/// Request body for POST /notifications/stock-alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StockAlertRequest {
    pub alert_type: AlertType,
    pub medication: StockAlertMedication,
    #[validate(length(min = 1, message = "recipients must not be empty"))]
    pub recipients: Vec<String>,
}

impl StockAlertRequest {
    pub fn subject(&self) -> String {
        match self.alert_type {
            AlertType::LowStock => format!("Low stock: {}", self.medication.name),
            AlertType::Expiring => format!("Expiring medication: {}", self.medication.name),
        }
    }

    pub fn body(&self) -> String {
        let m = &self.medication;
        match self.alert_type {
            AlertType::LowStock => format!(
                "{} is running low.\n\nCurrent stock: {}\nMinimum stock: {}\n",
                m.name, m.stock_quantity, m.minimum_stock
            ),
            AlertType::Expiring => {
                let when = match (m.expiration_date, m.days_until_expiration) {
                    (Some(date), Some(days)) if days < 0 => {
                        format!("expired on {} ({} days ago)", date, -days)
                    }
                    (Some(date), Some(days)) => format!("expires on {} (in {} days)", date, days),
                    (Some(date), None) => format!("expires on {}", date),
                    _ => "is about to expire".to_string(),
                };
                format!(
                    "{} {}.\n\nCurrent stock: {}\n",
                    m.name, when, m.stock_quantity
                )
            }
        }
    }
}

/// Query parameters for GET /notifications/user/:user_id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

/// Outcome of a multi-recipient alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDispatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_request(channel: Channel, recipient: &str) -> SendNotificationRequest {
        SendNotificationRequest {
            user_id: None,
            channel,
            recipient: recipient.to_string(),
            subject: None,
            message: "Your pet is ready for pickup".to_string(),
        }
    }

    #[test]
    fn test_recipient_must_match_channel() {
        assert!(send_request(Channel::Email, "owner@example.com").validate().is_ok());
        assert!(send_request(Channel::Email, "+15551234567").validate().is_err());
        assert!(send_request(Channel::Sms, "+15551234567").validate().is_ok());
        assert!(send_request(Channel::Sms, "owner@example.com").validate().is_err());
    }

    #[test]
    fn test_appointment_alert_deserializes() {
        let json = serde_json::json!({
            "appointment_details": {
                "id": Uuid::nil(),
                "date": "2025-03-03",
                "time": "09:30",
                "client_id": Uuid::nil(),
                "pet_id": Uuid::nil(),
                "veterinarian_id": Uuid::nil(),
                "reason": "Vaccination"
            },
            "receptionist_emails": ["recepcion@veterinariaclinic.com"]
        });
        let request: AppointmentAlertRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(
            request.appointment_details.subject(),
            "New appointment on 2025-03-03 at 09:30"
        );
        assert!(request.appointment_details.body().contains("Vaccination"));
    }

    #[test]
    fn test_stock_alert_text() {
        let request = StockAlertRequest {
            alert_type: AlertType::Expiring,
            medication: StockAlertMedication {
                id: Uuid::nil(),
                name: "Meloxicam".to_string(),
                stock_quantity: 12,
                minimum_stock: 5,
                expiration_date: NaiveDate::from_ymd_opt(2025, 1, 10),
                days_until_expiration: Some(-3),
            },
            recipients: vec!["admin@example.com".to_string()],
        };
        assert_eq!(request.subject(), "Expiring medication: Meloxicam");
        assert!(request.body().contains("3 days ago"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["alert_type"], "expiring");
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let request = StockAlertRequest {
            alert_type: AlertType::LowStock,
            medication: StockAlertMedication {
                id: Uuid::nil(),
                name: "Meloxicam".to_string(),
                stock_quantity: 1,
                minimum_stock: 5,
                expiration_date: None,
                days_until_expiration: None,
            },
            recipients: vec![],
        };
        assert!(request.validate().is_err());
    }
}
