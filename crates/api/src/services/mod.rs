//! Outbound integrations and logic shared between routes and jobs.

pub mod alerts;
pub mod auth;
pub mod clients;
pub mod email;
pub mod inventory;
pub mod notifications;
pub mod sms;

pub use auth::{AuthError, AuthService, AuthSession};
pub use clients::{
    ClientError, HttpNotifier, InventoryClient, NotificationClient, SchedulingClient, ServiceClient,
};
pub use email::{EmailError, EmailService};
pub use inventory::InventoryAlerts;
pub use notifications::{NotificationDispatcher, Outgoing};
pub use sms::{SmsError, SmsService};
