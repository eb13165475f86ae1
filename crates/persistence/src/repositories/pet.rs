//! Pet repository for the medical records service.

use chrono::NaiveDate;
use domain::models::pet::{CreatePetRequest, UpdatePetRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CountRow, PetEntity, VaccinationStatusDb};
use crate::metrics::QueryTimer;

const PET_COLUMNS: &str = "id, owner_id, name, species, breed, birth_date, weight, gender, color, microchip_number, allergies, medical_notes, vaccination_status, is_active, created_at, updated_at";

/// Filters for pet listings.
#[derive(Debug, Clone, Default)]
pub struct PetFilter<'a> {
    pub owner_id: Option<Uuid>,
    pub species: Option<&'a str>,
    pub search: Option<&'a str>,
    pub include_inactive: bool,
}

/// Repository for pets.
#[derive(Clone)]
pub struct PetRepository {
    pool: PgPool,
}

impl PetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        request: &CreatePetRequest,
        birth_date: Option<NaiveDate>,
    ) -> Result<PetEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_pet");
        let status = request.vaccination_status.unwrap_or_default();
        let result = sqlx::query_as::<_, PetEntity>(&format!(
            r#"
            INSERT INTO pets
                (owner_id, name, species, breed, birth_date, weight, gender, color,
                 microchip_number, allergies, medical_notes, vaccination_status)
            VALUES ($1, $2, LOWER($3), $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PET_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(request.name.trim())
        .bind(request.species.trim())
        .bind(request.breed.as_deref())
        .bind(birth_date)
        .bind(request.weight)
        .bind(request.gender.as_deref())
        .bind(request.color.as_deref())
        .bind(request.microchip_number.as_deref())
        .bind(request.allergies.as_deref())
        .bind(request.medical_notes.as_deref())
        .bind(VaccinationStatusDb::from(status))
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds an active pet.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_pet_by_id");
        let result = sqlx::query_as::<_, PetEntity>(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list(&self, filter: PetFilter<'_>) -> Result<Vec<PetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_pets");
        let pattern = filter.search.map(|s| format!("%{}%", s.trim()));
        let result = sqlx::query_as::<_, PetEntity>(&format!(
            r#"
            SELECT {PET_COLUMNS}
            FROM pets
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::text IS NULL OR species = LOWER($2))
              AND ($3::text IS NULL OR name ILIKE $3)
              AND ($4 OR is_active)
            ORDER BY name
            "#
        ))
        .bind(filter.owner_id)
        .bind(filter.species)
        .bind(pattern)
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: &UpdatePetRequest,
        birth_date: Option<NaiveDate>,
    ) -> Result<Option<PetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_pet");
        let result = sqlx::query_as::<_, PetEntity>(&format!(
            r#"
            UPDATE pets
            SET name = COALESCE($2, name),
                species = COALESCE(LOWER($3), species),
                breed = COALESCE($4, breed),
                birth_date = COALESCE($5, birth_date),
                weight = COALESCE($6, weight),
                gender = COALESCE($7, gender),
                color = COALESCE($8, color),
                microchip_number = COALESCE($9, microchip_number),
                allergies = COALESCE($10, allergies),
                medical_notes = COALESCE($11, medical_notes),
                vaccination_status = COALESCE($12, vaccination_status)
            WHERE id = $1 AND is_active
            RETURNING {PET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.species.as_deref().map(str::trim))
        .bind(request.breed.as_deref())
        .bind(birth_date)
        .bind(request.weight)
        .bind(request.gender.as_deref())
        .bind(request.color.as_deref())
        .bind(request.microchip_number.as_deref())
        .bind(request.allergies.as_deref())
        .bind(request.medical_notes.as_deref())
        .bind(request.vaccination_status.map(VaccinationStatusDb::from))
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_pet");
        let result = sqlx::query("UPDATE pets SET is_active = false WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn count_active(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_active_pets");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pets WHERE is_active")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn count_by_species(&self) -> Result<Vec<CountRow>, sqlx::Error> {
        let timer = QueryTimer::new("count_pets_by_species");
        let result = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT species AS key, COUNT(*) AS count
            FROM pets
            WHERE is_active
            GROUP BY species
            ORDER BY count DESC, species
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count_by_vaccination(&self) -> Result<Vec<CountRow>, sqlx::Error> {
        let timer = QueryTimer::new("count_pets_by_vaccination");
        let result = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT vaccination_status::text AS key, COUNT(*) AS count
            FROM pets
            WHERE is_active
            GROUP BY vaccination_status
            ORDER BY count DESC, key
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
