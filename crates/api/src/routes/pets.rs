//! Pet registry routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::pet::{CreatePetRequest, ListPetsQuery, PetResponse, PetStats, UpdatePetRequest};
use domain::models::Pet;
use persistence::repositories::{PetFilter, PetRepository};
use shared::validation::parse_date;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::response::Envelope;

pub(crate) fn pet_not_found() -> ApiError {
    ApiError::NotFound("Pet not found".to_string())
}

/// Loads an active pet the caller may see: staff see all, clients their own.
pub(crate) async fn load_visible(
    repo: &PetRepository,
    auth: &UserAuth,
    id: Uuid,
) -> Result<Pet, ApiError> {
    let pet: Pet = repo.find_by_id(id).await?.ok_or_else(pet_not_found)?.into();
    if !auth.is_staff() && pet.owner_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only access your own pets".to_string(),
        ));
    }
    Ok(pet)
}

fn responses<E: Into<Pet>>(rows: Vec<E>) -> Vec<PetResponse> {
    rows.into_iter()
        .map(|row| PetResponse::from(row.into()))
        .collect()
}

/// POST /medical/pets
///
/// Clients register pets for themselves; staff must name the owner.
pub async fn create_pet(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreatePetRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let owner_id = if auth.is_staff() {
        request
            .owner_id
            .ok_or_else(|| ApiError::Validation("owner_id is required".to_string()))?
    } else {
        match request.owner_id {
            Some(owner) if owner != auth.user_id => {
                return Err(ApiError::Forbidden(
                    "Clients can only register their own pets".to_string(),
                ))
            }
            _ => auth.user_id,
        }
    };
    let birth_date = request
        .birth_date
        .as_deref()
        .map(|d| parse_date("birth_date", d))
        .transpose()?;

    let repo = PetRepository::new(state.pool.clone());
    let pet: Pet = repo.create(owner_id, &request, birth_date).await?.into();

    info!(pet_id = %pet.id, owner_id = %owner_id, created_by = %auth.user_id, "Pet registered");

    Ok(Envelope::created()
        .message("Pet registered successfully")
        .with("pet", PetResponse::from(pet)))
}

/// GET /medical/pets/:id
pub async fn get_pet(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = PetRepository::new(state.pool.clone());
    let pet = load_visible(&repo, &auth, id).await?;

    Ok(Envelope::ok().with("pet", PetResponse::from(pet)))
}

/// PUT /medical/pets/:id
pub async fn update_pet(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePetRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    let birth_date = request
        .birth_date
        .as_deref()
        .map(|d| parse_date("birth_date", d))
        .transpose()?;

    let repo = PetRepository::new(state.pool.clone());
    load_visible(&repo, &auth, id).await?;

    let pet: Pet = repo
        .update(id, &request, birth_date)
        .await?
        .ok_or_else(pet_not_found)?
        .into();

    info!(pet_id = %id, updated_by = %auth.user_id, "Pet updated");

    Ok(Envelope::ok()
        .message("Pet updated successfully")
        .with("pet", PetResponse::from(pet)))
}

/// DELETE /medical/pets/:id (soft delete, staff)
pub async fn delete_pet(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = PetRepository::new(state.pool.clone());
    if !repo.deactivate(id).await? {
        return Err(pet_not_found());
    }

    info!(pet_id = %id, deleted_by = %auth.user_id, "Pet deactivated");

    Ok(Envelope::ok().message("Pet deleted successfully"))
}

/// GET /medical/pets?species=&search=&include_inactive= (staff)
pub async fn list_pets(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListPetsQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = PetRepository::new(state.pool.clone());
    let pets = responses(
        repo.list(PetFilter {
            owner_id: None,
            species: query.species.as_deref(),
            search: query.search.as_deref(),
            include_inactive: query.include_inactive,
        })
        .await?,
    );

    Ok(Envelope::ok().with("count", pets.len()).with("pets", pets))
}

/// GET /medical/pets/owner/:owner_id
pub async fn list_by_owner(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(owner_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    if !auth.is_staff() && auth.user_id != owner_id {
        return Err(ApiError::Forbidden(
            "You can only access your own pets".to_string(),
        ));
    }

    let repo = PetRepository::new(state.pool.clone());
    let pets = responses(
        repo.list(PetFilter {
            owner_id: Some(owner_id),
            species: None,
            search: None,
            include_inactive: false,
        })
        .await?,
    );

    Ok(Envelope::ok()
        .with("owner_id", owner_id)
        .with("count", pets.len())
        .with("pets", pets))
}

/// GET /medical/pets/stats (staff)
pub async fn pet_stats(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = PetRepository::new(state.pool.clone());
    let stats = PetStats {
        total_pets: repo.count_active().await?,
        by_species: repo.count_by_species().await?.into_iter().map(Into::into).collect(),
        by_vaccination: repo
            .count_by_vaccination()
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    };

    Ok(Envelope::ok().with("stats", stats))
}
