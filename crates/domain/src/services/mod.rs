//! Domain services for the vet clinic.
//!
//! Services contain business logic that operates on domain models.

pub mod notifier;
pub mod scheduling;
pub mod stock;

pub use notifier::{MockDelivery, MockNotifier, NotificationResult, Notifier};
pub use scheduling::{free_slots, is_available, ClosingTimePolicy, WorkingWindow, SLOT_MINUTES};
pub use stock::{apply_delta, StockRuleError};
