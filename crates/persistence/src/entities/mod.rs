//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod account;
pub mod appointment;
pub mod availability;
pub mod medical_record;
pub mod medication;
pub mod notification;
pub mod pet;

pub use account::{AccountEntity, RoleDb};
pub use appointment::{AppointmentEntity, AppointmentStatusDb};
pub use availability::AvailabilityEntity;
pub use medical_record::{
    ExamResultEntity, MedicalRecordEntity, PrescriptionEntity, RecordStatusDb,
};
pub use medication::{MedicationEntity, MovementTypeDb, StockMovementEntity};
pub use notification::{ChannelDb, DeliveryStatusDb, NotificationEntity};
pub use pet::{CountRow, PetEntity, VaccinationStatusDb};
