//! Registration, login and password changes.

use domain::models::account::RegisterRequest;
use domain::models::{Account, Role};
use persistence::repositories::{AccountRepository, NewAccount};
use shared::jwt::{JwtConfig, JwtError, TokenSubject};
use shared::password::{hash_password, validate_password_strength, verify_password, PasswordError};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Account not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailAlreadyExists => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::WrongCurrentPassword
            | AuthError::AccountDisabled => ApiError::Unauthorized(err.to_string()),
            AuthError::NotFound => ApiError::NotFound(err.to_string()),
            AuthError::Password(e) => e.into(),
            AuthError::Token(e) => e.into(),
            AuthError::Database(e) => e.into(),
        }
    }
}

/// An account together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account: Account,
    pub token: String,
    pub expires_in: i64,
}

pub struct AuthService {
    accounts: AccountRepository,
    jwt: Arc<JwtConfig>,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt: Arc<JwtConfig>) -> Self {
        Self {
            accounts: AccountRepository::new(pool),
            jwt,
        }
    }

    fn session(&self, account: Account) -> Result<AuthSession, AuthError> {
        let (token, _jti) = self.jwt.generate_access_token(TokenSubject {
            user_id: account.id,
            email: &account.email,
            role: account.role.as_str(),
        })?;
        Ok(AuthSession {
            account,
            token,
            expires_in: self.jwt.token_expiry_secs,
        })
    }

    /// Creates an account with `role` (already authorized by the caller).
    pub async fn register(
        &self,
        request: &RegisterRequest,
        role: Role,
    ) -> Result<AuthSession, AuthError> {
        validate_password_strength(&request.password)?;

        let email = request.email.trim().to_lowercase();
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&request.password)?;
        let created = self
            .accounts
            .create(NewAccount {
                email: &email,
                password_hash: &password_hash,
                first_name: request.first_name.trim(),
                last_name: request.last_name.trim(),
                phone: request.phone.as_deref(),
                address: request.address.as_deref(),
                role,
            })
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    AuthError::EmailAlreadyExists
                }
                _ => AuthError::Database(e),
            })?;

        tracing::info!(account_id = %created.id, role = role.as_str(), "Account registered");
        self.session(created.into())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = email.trim().to_lowercase();
        let account: Account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?
            .into();

        if !verify_password(password, &account.password_hash)? {
            tracing::info!(account_id = %account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !account.is_active {
            tracing::info!(account_id = %account.id, "Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        self.session(account)
    }

    /// Active account behind a validated token.
    pub async fn current_account(&self, user_id: Uuid) -> Result<Account, AuthError> {
        let account: Account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?
            .into();
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(account)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self.current_account(user_id).await?;

        if !verify_password(current_password, &account.password_hash)? {
            return Err(AuthError::WrongCurrentPassword);
        }
        validate_password_strength(new_password)?;

        let hash = hash_password(new_password)?;
        if !self.accounts.update_password(user_id, &hash).await? {
            return Err(AuthError::NotFound);
        }

        tracing::info!(account_id = %user_id, "Password changed");
        Ok(())
    }
}
