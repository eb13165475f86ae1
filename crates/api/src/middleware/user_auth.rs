//! Bearer token authentication middleware.
//!
//! Every service validates tokens locally with the shared secret. Service
//! tokens minted by sibling services pass through the same path and are
//! flagged with `is_service`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::Role;
use serde_json::json;
use shared::jwt::{extract_user_id, JwtConfig, JwtError, TokenType};
use uuid::Uuid;

use crate::app::AppState;

/// Authenticated caller extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// JWT ID (jti).
    pub jti: String,
    /// True for service tokens minted by a sibling service.
    pub is_service: bool,
}

impl UserAuth {
    /// Validates a token and returns the caller.
    pub fn validate(jwt: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt.validate_token(token)?;
        let user_id = extract_user_id(&claims)?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| JwtError::InvalidToken)?;

        Ok(UserAuth {
            user_id,
            email: claims.email,
            role,
            jti: claims.jti,
            is_service: claims.token_type == TokenType::Service,
        })
    }
}

/// Bearer token from the Authorization header, if well formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects requests without a valid bearer token and stores the caller in
/// the request extensions.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    match UserAuth::validate(&state.jwt, token) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            unauthorized_response("Invalid or expired token")
        }
    }
}

/// Stores the caller when a valid token is present and lets every request through.
pub async fn optional_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = bearer_token(req.headers()).and_then(|t| UserAuth::validate(&state.jwt, t).ok());
    if let Some(auth) = auth {
        req.extensions_mut().insert(auth);
    }
    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
