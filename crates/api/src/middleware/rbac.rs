//! Role checks for authenticated callers.
//!
//! Route groups that are closed to a whole class of callers use the
//! `require_staff` / `require_admin` middleware. Checks that depend on the
//! resource (own pet, own notifications) are made in the handler through the
//! `UserAuth` helpers below.

use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse, response::Response};
use domain::models::Role;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::user_auth::UserAuth;

/// Roles allowed to write clinical data.
pub const CLINICIANS: [Role; 3] = [Role::Admin, Role::Veterinarian, Role::Auxiliary];

/// Roles allowed to manage the agenda.
pub const FRONT_DESK: [Role; 3] = [Role::Admin, Role::Veterinarian, Role::Receptionist];

impl UserAuth {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.is_service || self.role.is_staff()
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".into()))
        }
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Clinic staff access required".into()))
        }
    }

    /// Passes when the caller holds one of `roles`. Service tokens carry the admin role.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.role.is_one_of(roles) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Requires one of the roles: {}",
                roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
            )))
        }
    }

    /// Passes for the account itself or for any of `roles`.
    pub fn require_self_or(&self, account_id: Uuid, roles: &[Role]) -> Result<(), ApiError> {
        if self.user_id == account_id {
            return Ok(());
        }
        self.require_role(roles)
            .map_err(|_| ApiError::Forbidden("Access denied".into()))
    }
}

fn caller(req: &Request<Body>) -> Result<&UserAuth, ApiError> {
    req.extensions()
        .get::<UserAuth>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
}

/// Rejects clients. Run after `require_user_auth`.
pub async fn require_staff(req: Request<Body>, next: Next) -> Response {
    if let Err(e) = caller(&req).and_then(UserAuth::require_staff) {
        return e.into_response();
    }
    next.run(req).await
}

/// Rejects everyone but admins. Run after `require_user_auth`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    if let Err(e) = caller(&req).and_then(UserAuth::require_admin) {
        return e.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(role: Role) -> UserAuth {
        UserAuth {
            user_id: Uuid::new_v4(),
            email: "someone@clinic.test".into(),
            role,
            jti: "jti".into(),
            is_service: false,
        }
    }

    #[test]
    fn test_staff_roles() {
        for role in Role::ALL {
            assert_eq!(auth(role).require_staff().is_ok(), role != Role::Client);
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(auth(Role::Admin).require_admin().is_ok());
        assert!(matches!(
            auth(Role::Veterinarian).require_admin(),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_require_role() {
        assert!(auth(Role::Auxiliary).require_role(&CLINICIANS).is_ok());
        assert!(auth(Role::Receptionist).require_role(&CLINICIANS).is_err());
        assert!(auth(Role::Receptionist).require_role(&FRONT_DESK).is_ok());
    }

    #[test]
    fn test_require_self_or() {
        let client = auth(Role::Client);
        assert!(client.require_self_or(client.user_id, &[Role::Admin]).is_ok());
        assert!(client.require_self_or(Uuid::new_v4(), &[Role::Admin]).is_err());
        assert!(auth(Role::Admin)
            .require_self_or(Uuid::new_v4(), &[Role::Admin])
            .is_ok());
    }

    #[test]
    fn test_service_token_is_staff() {
        let mut service = auth(Role::Admin);
        service.is_service = true;
        assert!(service.is_staff());
    }
}
