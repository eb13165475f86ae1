//! Account administration and staff directory routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::account::{
    match_score, AccountResponse, AdminUpdateUserRequest, ListUsersQuery, SearchUsersQuery,
    UserSearchHit, USER_SEARCH_LIMIT,
};
use domain::models::{Account, Role};
use persistence::repositories::AccountRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::response::Envelope;

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

fn to_responses<E: Into<Account>>(rows: Vec<E>) -> Vec<AccountResponse> {
    rows.into_iter()
        .map(|row| AccountResponse::from(row.into()))
        .collect()
}

/// GET /auth/users?role=&active= (admin)
pub async fn list_users(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListUsersQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;

    let repo = AccountRepository::new(state.pool.clone());
    let users = to_responses(repo.list(query.role, query.active).await?);

    Ok(Envelope::ok()
        .with("count", users.len())
        .with("users", users))
}

/// GET /auth/users/search?q=&role= (staff)
///
/// Best matches first. Only admins see inactive accounts.
pub async fn search_users(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::Validation("Search term q is required".to_string()))?;

    let repo = AccountRepository::new(state.pool.clone());
    let rows = repo
        .search(term, query.role, auth.role == Role::Admin, USER_SEARCH_LIMIT)
        .await?;
    let mut hits: Vec<UserSearchHit> = rows
        .into_iter()
        .map(|row| {
            let account: Account = row.into();
            UserSearchHit {
                match_score: match_score(&account, term),
                user: AccountResponse::from(account),
            }
        })
        .collect();
    hits.sort_by(|a, b| b.match_score.cmp(&a.match_score));

    Ok(Envelope::ok()
        .with("search_term", term)
        .with("count", hits.len())
        .with("users", hits))
}

/// GET /auth/users/stats (admin)
pub async fn user_stats(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;

    let repo = AccountRepository::new(state.pool.clone());
    Ok(Envelope::ok().with("stats", repo.stats().await?))
}

/// GET /auth/users/:id (admin)
pub async fn get_user(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;

    let repo = AccountRepository::new(state.pool.clone());
    let account: Account = repo.find_by_id(id).await?.ok_or_else(user_not_found)?.into();

    Ok(Envelope::ok().with("user", AccountResponse::from(account)))
}

/// PUT /auth/users/:id (admin)
pub async fn update_user(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;
    request.validate()?;

    let repo = AccountRepository::new(state.pool.clone());
    let account: Account = repo
        .admin_update(id, &request)
        .await?
        .ok_or_else(user_not_found)?
        .into();

    info!(account_id = %id, admin_id = %auth.user_id, "User updated by admin");

    Ok(Envelope::ok()
        .message("User updated successfully")
        .with("user", AccountResponse::from(account)))
}

/// DELETE /auth/users/:id (admin, hard delete)
pub async fn delete_user(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;
    if id == auth.user_id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let repo = AccountRepository::new(state.pool.clone());
    if !repo.delete(id).await? {
        return Err(user_not_found());
    }

    info!(account_id = %id, admin_id = %auth.user_id, "User deleted");

    Ok(Envelope::ok().message("User deleted successfully"))
}

/// PUT /auth/users/:id/toggle-status (admin)
pub async fn toggle_status(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;
    if id == auth.user_id {
        return Err(ApiError::Validation(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let repo = AccountRepository::new(state.pool.clone());
    let account: Account = repo.toggle_active(id).await?.ok_or_else(user_not_found)?.into();

    info!(
        account_id = %id,
        is_active = account.is_active,
        admin_id = %auth.user_id,
        "User status toggled"
    );

    let message = if account.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(Envelope::ok()
        .message(message)
        .with("user", AccountResponse::from(account)))
}

/// GET /auth/users/veterinarians
pub async fn list_veterinarians(
    State(state): State<AppState>,
    _auth: UserAuth,
) -> Result<Envelope, ApiError> {
    let repo = AccountRepository::new(state.pool.clone());
    let vets = to_responses(repo.list_active_by_role(Role::Veterinarian).await?);

    Ok(Envelope::ok()
        .with("count", vets.len())
        .with("veterinarians", vets))
}

/// GET /auth/users/by-role/:role
pub async fn list_by_role(
    State(state): State<AppState>,
    _auth: UserAuth,
    Path(role): Path<String>,
) -> Result<Envelope, ApiError> {
    let role: Role = role.parse().map_err(ApiError::Validation)?;

    let repo = AccountRepository::new(state.pool.clone());
    let users = to_responses(repo.list_active_by_role(role).await?);

    Ok(Envelope::ok()
        .with("role", role)
        .with("count", users.len())
        .with("users", users))
}
