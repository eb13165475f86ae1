//! Signed bearer tokens using HS256.
//!
//! Every service validates tokens locally with the same shared secret, so a
//! token issued by the identity service is accepted by scheduling, medical,
//! inventory and notification without a round trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID, nil for service tokens)
    pub sub: String,
    pub email: String,
    /// Account role name (admin, veterinarian, receptionist, auxiliary, client)
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token identifier
    pub jti: String,
    pub token_type: TokenType,
}

/// Type of JWT token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Issued to a person at login or registration.
    Access,
    /// Minted by a service for its own calls to sibling services.
    Service,
}

/// Identity carried into a token.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub role: &'a str,
}

/// Role and email used for service tokens.
pub const SERVICE_ROLE: &str = "admin";
pub const SERVICE_EMAIL: &str = "service@internal";

/// Lifetime of service tokens in seconds.
const SERVICE_TOKEN_EXPIRY_SECS: i64 = 60;

/// Minimum accepted length of the shared secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration for token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Access token lifetime in seconds (default: 86400 = 24 hours)
    pub token_expiry_secs: i64,
    /// Leeway in seconds for clock skew between services
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("token_expiry_secs", &self.token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// Creates a JwtConfig from the shared secret.
    pub fn from_secret(
        secret: &str,
        token_expiry_secs: i64,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::InvalidKey(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_secs,
            leeway_secs,
        })
    }

    /// Generates an access token. Returns the token and its jti.
    pub fn generate_access_token(
        &self,
        subject: TokenSubject<'_>,
    ) -> Result<(String, String), JwtError> {
        self.generate_token(subject, TokenType::Access, self.token_expiry_secs)
    }

    /// Generates a short-lived token a service uses to call its siblings.
    pub fn generate_service_token(&self) -> Result<String, JwtError> {
        let subject = TokenSubject {
            user_id: Uuid::nil(),
            email: SERVICE_EMAIL,
            role: SERVICE_ROLE,
        };
        self.generate_token(subject, TokenType::Service, SERVICE_TOKEN_EXPIRY_SECS)
            .map(|(token, _)| token)
    }

    fn generate_token(
        &self,
        subject: TokenSubject<'_>,
        token_type: TokenType,
        expiry_secs: i64,
    ) -> Result<(String, String), JwtError> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: subject.user_id.to_string(),
            email: subject.email.to_string(),
            role: subject.role.to_string(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok((token, jti))
    }

    /// Validates a token of any type and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Extracts the account ID from validated claims.
pub fn extract_user_id(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}
