//! Pet domain models for the medical records service.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Vaccination status recorded for a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaccinationStatus {
    Complete,
    Partial,
    Pending,
    #[default]
    Unknown,
}

impl VaccinationStatus {
    pub const ALL: [VaccinationStatus; 4] = [
        VaccinationStatus::Complete,
        VaccinationStatus::Partial,
        VaccinationStatus::Pending,
        VaccinationStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VaccinationStatus::Complete => "complete",
            VaccinationStatus::Partial => "partial",
            VaccinationStatus::Pending => "pending",
            VaccinationStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for VaccinationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complete" => Ok(VaccinationStatus::Complete),
            "partial" => Ok(VaccinationStatus::Partial),
            "pending" => Ok(VaccinationStatus::Pending),
            "unknown" => Ok(VaccinationStatus::Unknown),
            _ => Err(format!("Invalid vaccination status: {}", s)),
        }
    }
}

impl fmt::Display for VaccinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A patient of the clinic. `owner_id` is a weak reference to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub color: Option<String>,
    pub microchip_number: Option<String>,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub vaccination_status: VaccinationStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    /// Age in whole years on `today`, if the birth date is known.
    pub fn age_years(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if birth > today {
            return None;
        }
        let mut years = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Request body for POST /medical/pets.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePetRequest {
    /// Defaults to the caller when omitted.
    pub owner_id: Option<Uuid>,

    #[validate(
        length(min = 1, max = 100, message = "name must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "species must be 1-50 characters"))]
    pub species: String,

    #[validate(length(max = 100))]
    pub breed: Option<String>,

    /// `YYYY-MM-DD`
    pub birth_date: Option<String>,

    #[validate(range(min = 0.0, max = 1000.0, message = "weight must be between 0 and 1000 kg"))]
    pub weight: Option<f64>,

    #[validate(length(max = 20))]
    pub gender: Option<String>,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[validate(length(max = 50))]
    pub microchip_number: Option<String>,

    #[validate(length(max = 2000))]
    pub allergies: Option<String>,

    #[validate(length(max = 4000))]
    pub medical_notes: Option<String>,

    pub vaccination_status: Option<VaccinationStatus>,
}

/// Request body for PUT /medical/pets/:id.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePetRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "species must be 1-50 characters"))]
    pub species: Option<String>,

    #[validate(length(max = 100))]
    pub breed: Option<String>,

    pub birth_date: Option<String>,

    #[validate(range(min = 0.0, max = 1000.0, message = "weight must be between 0 and 1000 kg"))]
    pub weight: Option<f64>,

    #[validate(length(max = 20))]
    pub gender: Option<String>,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[validate(length(max = 50))]
    pub microchip_number: Option<String>,

    #[validate(length(max = 2000))]
    pub allergies: Option<String>,

    #[validate(length(max = 4000))]
    pub medical_notes: Option<String>,

    pub vaccination_status: Option<VaccinationStatus>,
}

/// Query parameters for GET /medical/pets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPetsQuery {
    pub species: Option<String>,
    /// Case-insensitive name fragment.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Wire representation of a pet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microchip_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_notes: Option<String>,
    pub vaccination_status: VaccinationStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pet> for PetResponse {
    fn from(pet: Pet) -> Self {
        let age_years = pet.age_years(Utc::now().date_naive());
        Self {
            id: pet.id,
            owner_id: pet.owner_id,
            name: pet.name,
            species: pet.species,
            breed: pet.breed,
            birth_date: pet.birth_date,
            age_years,
            weight: pet.weight,
            gender: pet.gender,
            color: pet.color,
            microchip_number: pet.microchip_number,
            allergies: pet.allergies,
            medical_notes: pet.medical_notes,
            vaccination_status: pet.vaccination_status,
            is_active: pet.is_active,
            created_at: pet.created_at,
            updated_at: pet.updated_at,
        }
    }
}

/// Counts returned by GET /medical/pets/stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetStats {
    pub total_pets: i64,
    pub by_species: Vec<CountBucket>,
    pub by_vaccination: Vec<CountBucket>,
}

/// A labelled count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}
