//! Domain layer for the vet clinic backend.
//!
//! This crate contains:
//! - Domain models (Account, Appointment, Pet, MedicalRecord, Medication, Notification)
//! - Business rules (availability engine, stock ledger, status machines)
//! - The outbound alert abstraction

pub mod errors;
pub mod models;
pub mod services;
