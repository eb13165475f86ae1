//! Authentication routes: registration, login, token verification and the
//! caller's own profile.

use axum::{extract::State, Json};
use domain::models::account::{
    AccountResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use domain::models::{Account, Role};
use persistence::repositories::AccountRepository;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{OptionalUserAuth, UserAuth};
use crate::response::Envelope;
use crate::services::auth::{AuthService, AuthSession};

fn session_envelope(envelope: Envelope, session: AuthSession) -> Envelope {
    envelope
        .with("user", AccountResponse::from(session.account))
        .with("token", session.token)
        .with("token_type", "Bearer")
        .with("expires_in", session.expires_in)
}

/// Register a new account.
///
/// POST /auth/register
///
/// Anyone may create a client account. Any other role needs an admin token.
pub async fn register(
    State(state): State<AppState>,
    OptionalUserAuth(caller): OptionalUserAuth,
    Json(request): Json<RegisterRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let role = request.role.unwrap_or(Role::Client);
    if role != Role::Client {
        match &caller {
            Some(auth) => auth.require_admin()?,
            None => {
                return Err(ApiError::Forbidden(
                    "Only an admin can create staff accounts".to_string(),
                ))
            }
        }
    }

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let session = service.register(&request, role).await?;

    info!(
        account_id = %session.account.id,
        role = role.as_str(),
        created_by = ?caller.map(|c| c.user_id),
        "User registered"
    );

    Ok(session_envelope(
        Envelope::created().message("User registered successfully"),
        session,
    ))
}

/// Exchange email and password for a token.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let session = service.login(&request.email, &request.password).await?;

    info!(account_id = %session.account.id, "User logged in");

    Ok(session_envelope(
        Envelope::ok().message("Login successful"),
        session,
    ))
}

/// Validate the bearer token and return its account.
///
/// POST /auth/verify
pub async fn verify(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Envelope, ApiError> {
    if auth.is_service {
        return Ok(Envelope::ok()
            .with("valid", true)
            .with("service", true));
    }

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let account = service.current_account(auth.user_id).await?;

    Ok(Envelope::ok()
        .with("valid", true)
        .with("user", AccountResponse::from(account)))
}

/// PUT /auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    service
        .change_password(auth.user_id, &request.current_password, &request.new_password)
        .await?;

    Ok(Envelope::ok().message("Password changed successfully"))
}

/// GET /auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Envelope, ApiError> {
    let service = AuthService::new(state.pool.clone(), state.jwt.clone());
    let account = service.current_account(auth.user_id).await?;

    Ok(Envelope::ok().with("user", AccountResponse::from(account)))
}

/// PUT /auth/profile
///
/// Role and active flag are not part of the request and cannot change here.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let repo = AccountRepository::new(state.pool.clone());
    let account = repo
        .update_profile(auth.user_id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(account_id = %auth.user_id, "Profile updated");

    Ok(Envelope::ok()
        .message("Profile updated successfully")
        .with("user", AccountResponse::from(Account::from(account))))
}
