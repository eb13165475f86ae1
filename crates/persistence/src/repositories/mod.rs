//! Repository implementations for database operations.

pub mod account;
pub mod appointment;
pub mod availability;
pub mod medical_record;
pub mod medication;
pub mod notification;
pub mod pet;

pub use account::{AccountCounts, AccountRepository, NewAccount};
pub use appointment::{AppointmentRepository, BookingError};
pub use availability::AvailabilityRepository;
pub use medical_record::{
    ExamResultChanges, MedicalRecordRepository, NewExamResult, RecordCounts, RecordFilter,
    RecordStats,
};
pub use medication::{MedicationRepository, StockError, StockUpdate};
pub use notification::NotificationRepository;
pub use pet::{PetFilter, PetRepository};
