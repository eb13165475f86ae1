//! Account and role domain models for the identity service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

lazy_static::lazy_static! {
    /// Loose phone format: digits, spaces, dashes, parentheses and a leading plus.
    pub static ref PHONE_REGEX: regex::Regex =
        regex::Regex::new(r"^\+?[0-9 ()\-]{7,20}$").unwrap();
}

/// Role carried by every account and every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Veterinarian,
    Receptionist,
    Auxiliary,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Veterinarian,
        Role::Receptionist,
        Role::Auxiliary,
        Role::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Veterinarian => "veterinarian",
            Role::Receptionist => "receptionist",
            Role::Auxiliary => "auxiliary",
            Role::Client => "client",
        }
    }

    /// Clinic personnel, i.e. everyone except clients.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }

    /// Whether this role may appear in `allowed`.
    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "veterinarian" => Ok(Role::Veterinarian),
            "receptionist" => Ok(Role::Receptionist),
            "auxiliary" => Ok(Role::Auxiliary),
            "client" => Ok(Role::Client),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person who can sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("phone_format")
            .with_message(std::borrow::Cow::Borrowed("Phone number format is invalid")))
    }
}

/// Request body for POST /auth/register.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Address cannot exceed 255 characters"))]
    pub address: Option<String>,

    /// Defaults to client when omitted.
    pub role: Option<Role>,
}

/// Request body for POST /auth/login.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for PUT /auth/change-password.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, max = 128, message = "New password is required"))]
    pub new_password: String,
}

/// Request body for PUT /auth/profile. Role and status are not editable here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Address cannot exceed 255 characters"))]
    pub address: Option<String>,
}

/// Request body for PUT /auth/users/:id (admin).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "Address cannot exceed 255 characters"))]
    pub address: Option<String>,

    pub role: Option<Role>,

    pub is_active: Option<bool>,
}

/// Query parameters for GET /auth/users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Query parameters for GET /auth/users/search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchUsersQuery {
    pub q: Option<String>,
    pub role: Option<Role>,
}

/// Most hits returned by a user search.
pub const USER_SEARCH_LIMIT: i64 = 50;

/// Relevance of `account` for a search term; higher ranks first.
///
/// Name hits outrank email hits, and a prefix hit adds to a substring hit.
pub fn match_score(account: &Account, term: &str) -> u32 {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0;
    }
    let first = account.first_name.to_lowercase();
    let last = account.last_name.to_lowercase();
    let mut score = 0;
    if first.contains(&term) {
        score += 100;
    }
    if last.contains(&term) {
        score += 80;
    }
    if account.email.to_lowercase().contains(&term) {
        score += 60;
    }
    if first.starts_with(&term) {
        score += 50;
    }
    if last.starts_with(&term) {
        score += 40;
    }
    score
}

/// A user search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearchHit {
    #[serde(flatten)]
    pub user: AccountResponse,
    pub match_score: u32,
}

/// Counts returned by GET /auth/users/stats. `by_role` counts active accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub by_role: RoleCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub admin: i64,
    pub veterinarian: i64,
    pub receptionist: i64,
    pub auxiliary: i64,
    pub client: i64,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        let name = account.full_name();
        Self {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            name,
            phone: account.phone,
            address: account.address,
            role: account.role,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "ana@clinic.test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            phone: None,
            address: None,
            role: Role::Veterinarian,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
        assert!("owner".parse::<Role>().is_err());
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn test_role_is_staff() {
        assert!(Role::Auxiliary.is_staff());
        assert!(!Role::Client.is_staff());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Receptionist).unwrap();
        assert_eq!(json, "\"receptionist\"");
    }

    #[test]
    fn test_account_never_serializes_hash() {
        let json = serde_json::to_string(&sample_account()).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_account_response_has_full_name() {
        let response: AccountResponse = sample_account().into();
        assert_eq!(response.name, "Ana Ruiz");
        assert_eq!(response.role, Role::Veterinarian);
    }

    #[test]
    fn test_match_score_ranks_names_over_email() {
        let account = sample_account();
        assert_eq!(match_score(&account, "iz"), 80);
        assert_eq!(match_score(&account, "ruiz"), 120);
        assert_eq!(match_score(&account, "clinic"), 60);
        // First name, its prefix and the email all match
        assert_eq!(match_score(&account, "  ANA "), 210);
        assert_eq!(match_score(&account, "zzz"), 0);
        assert_eq!(match_score(&account, "   "), 0);
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "secret123".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            phone: Some("+34 600-123-456".to_string()),
            address: None,
            role: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(!errors.field_errors().contains_key("phone"));
    }

    #[test]
    fn test_register_request_rejects_bad_phone() {
        let request = RegisterRequest {
            email: "ana@clinic.test".to_string(),
            password: "secret123".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            phone: Some("call me".to_string()),
            address: None,
            role: Some(Role::Client),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
    }
}
