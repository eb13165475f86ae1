//! Account entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::account::{Account, Role};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for user_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum RoleDb {
    Admin,
    Veterinarian,
    Receptionist,
    Auxiliary,
    Client,
}

impl From<RoleDb> for Role {
    fn from(db_role: RoleDb) -> Self {
        match db_role {
            RoleDb::Admin => Role::Admin,
            RoleDb::Veterinarian => Role::Veterinarian,
            RoleDb::Receptionist => Role::Receptionist,
            RoleDb::Auxiliary => Role::Auxiliary,
            RoleDb::Client => Role::Client,
        }
    }
}

impl From<Role> for RoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => RoleDb::Admin,
            Role::Veterinarian => RoleDb::Veterinarian,
            Role::Receptionist => RoleDb::Receptionist,
            Role::Auxiliary => RoleDb::Auxiliary,
            Role::Client => RoleDb::Client,
        }
    }
}

/// Database row mapping for the accounts table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: RoleDb,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountEntity> for Account {
    fn from(entity: AccountEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            password_hash: entity.password_hash,
            first_name: entity.first_name,
            last_name: entity.last_name,
            phone: entity.phone,
            address: entity.address,
            role: entity.role.into(),
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
