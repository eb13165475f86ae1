//! HTTP route handlers.

pub mod appointments;
pub mod auth;
pub mod exam_results;
pub mod health;
pub mod medical_records;
pub mod medications;
pub mod notifications;
pub mod pets;
pub mod prescriptions;
pub mod schedules;
pub mod users;
