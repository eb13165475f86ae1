//! Domain models for the vet clinic.

pub mod account;
pub mod appointment;
pub mod availability;
pub mod medical_record;
pub mod medication;
pub mod notification;
pub mod pet;

pub use account::{Account, Role};
pub use appointment::{Appointment, AppointmentStatus};
pub use availability::WeeklyAvailability;
pub use medical_record::{ExamResult, MedicalRecord, Prescription, RecordStatus};
pub use medication::{Medication, MovementType, StockMovement};
pub use notification::{Channel, DeliveryStatus, Notification};
pub use pet::{Pet, VaccinationStatus};
