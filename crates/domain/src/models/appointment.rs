//! Appointment domain models and the appointment status lifecycle.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{format_time, parse_date, parse_time, ParseError};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::errors::TransitionError;

/// Default value of `appointment_type`.
pub const DEFAULT_APPOINTMENT_TYPE: &str = "consultation";

/// Appointment status.
///
/// ```text
/// scheduled -> confirmed -> completed
///     \            \
///      +------------+----> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses that hold a slot.
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Scheduled, AppointmentStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Statuses from which `target` can be reached.
    pub fn allowed_sources(target: AppointmentStatus) -> &'static [AppointmentStatus] {
        match target {
            AppointmentStatus::Scheduled => &[],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Scheduled],
            AppointmentStatus::Completed => &[AppointmentStatus::Confirmed],
            AppointmentStatus::Cancelled => {
                &[AppointmentStatus::Scheduled, AppointmentStatus::Confirmed]
            }
        }
    }

    /// Returns `target` if the lifecycle allows moving there from `self`.
    pub fn transition_to(self, target: AppointmentStatus) -> Result<Self, TransitionError> {
        if Self::allowed_sources(target).contains(&self) {
            Ok(target)
        } else {
            Err(TransitionError {
                entity: "appointment",
                from: self.as_str(),
                to: target.as_str(),
            })
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booking of a veterinarian's time for a pet.
///
/// `pet_id` and `client_id` are weak references: the medical and identity
/// services own those entities and existence is not checked here. The display
/// fields are copied at booking time and are not kept in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub client_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub pet_name: Option<String>,
    pub pet_species: Option<String>,
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated booking, ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub client_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: String,
    pub reason: String,
    pub notes: Option<String>,
    pub pet_name: Option<String>,
    pub pet_species: Option<String>,
    pub owner_name: Option<String>,
}

/// Request body for POST /appointments/create.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub client_id: Uuid,

    /// `YYYY-MM-DD`
    pub appointment_date: String,

    /// `HH:MM`
    pub appointment_time: String,

    #[validate(length(min = 1, max = 50, message = "appointment_type must be 1-50 characters"))]
    pub appointment_type: Option<String>,

    #[validate(
        length(min = 1, max = 1000, message = "reason must be 1-1000 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub reason: String,

    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 100))]
    pub pet_name: Option<String>,

    #[validate(length(max = 50))]
    pub pet_species: Option<String>,

    #[validate(length(max = 200))]
    pub owner_name: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn parse(&self) -> Result<NewAppointment, ParseError> {
        Ok(NewAppointment {
            pet_id: self.pet_id,
            veterinarian_id: self.veterinarian_id,
            client_id: self.client_id,
            appointment_date: parse_date("appointment_date", &self.appointment_date)?,
            appointment_time: parse_time("appointment_time", &self.appointment_time)?,
            appointment_type: self
                .appointment_type
                .clone()
                .unwrap_or_else(|| DEFAULT_APPOINTMENT_TYPE.to_string()),
            reason: self.reason.trim().to_string(),
            notes: self.notes.clone(),
            pet_name: self.pet_name.clone(),
            pet_species: self.pet_species.clone(),
            owner_name: self.owner_name.clone(),
        })
    }
}

/// Request body for PUT /appointments/:id.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<String>,

    pub appointment_time: Option<String>,

    #[validate(length(min = 1, max = 50, message = "appointment_type must be 1-50 characters"))]
    pub appointment_type: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "reason must be 1-1000 characters"))]
    pub reason: Option<String>,

    #[validate(length(max = 2000, message = "notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 100))]
    pub pet_name: Option<String>,

    #[validate(length(max = 50))]
    pub pet_species: Option<String>,

    #[validate(length(max = 200))]
    pub owner_name: Option<String>,
}

/// New date/time requested by an update, when it moves the appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reschedule {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl UpdateAppointmentRequest {
    /// Returns the target slot if the update changes date or time.
    pub fn reschedule(&self, current: &Appointment) -> Result<Option<Reschedule>, ParseError> {
        if self.appointment_date.is_none() && self.appointment_time.is_none() {
            return Ok(None);
        }

        let date = match self.appointment_date.as_deref() {
            Some(v) => parse_date("appointment_date", v)?,
            None => current.appointment_date,
        };
        let time = match self.appointment_time.as_deref() {
            Some(v) => parse_time("appointment_time", v)?,
            None => current.appointment_time,
        };

        if date == current.appointment_date && time == current.appointment_time {
            return Ok(None);
        }
        Ok(Some(Reschedule { date, time }))
    }
}

/// Query parameters for GET /appointments/available-slots.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub veterinarian_id: Uuid,
    pub date: String,
}

/// Query parameters for GET /appointments/by-veterinarian/:vet_id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ByVeterinarianQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Query parameters for GET /appointments/by-client/:client_id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ByClientQuery {
    pub status: Option<AppointmentStatus>,
}

/// Wire representation of an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub client_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub appointment_type: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            pet_id: a.pet_id,
            veterinarian_id: a.veterinarian_id,
            client_id: a.client_id,
            appointment_date: a.appointment_date,
            appointment_time: format_time(a.appointment_time),
            appointment_type: a.appointment_type,
            reason: a.reason,
            notes: a.notes,
            status: a.status,
            pet_name: a.pet_name,
            pet_species: a.pet_species,
            owner_name: a.owner_name,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}
