//! Account repository for the identity service.

use domain::models::account::{
    AdminUpdateUserRequest, Role, RoleCounts, UpdateProfileRequest, UserStats,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::entities::{AccountEntity, RoleDb};
use crate::metrics::QueryTimer;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, address, role, is_active, created_at, updated_at";

/// Fields for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Role,
}

/// Account counts, flat as selected.
#[derive(Debug, Clone, FromRow)]
pub struct AccountCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub admin: i64,
    pub veterinarian: i64,
    pub receptionist: i64,
    pub auxiliary: i64,
    pub client: i64,
}

impl From<AccountCounts> for UserStats {
    fn from(counts: AccountCounts) -> Self {
        Self {
            total_users: counts.total_users,
            active_users: counts.active_users,
            inactive_users: counts.inactive_users,
            by_role: RoleCounts {
                admin: counts.admin,
                veterinarian: counts.veterinarian,
                receptionist: counts.receptionist,
                auxiliary: counts.auxiliary,
                client: counts.client,
            },
        }
    }
}

/// Repository for account database operations.
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_account_by_id");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Email lookup is case-insensitive.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_account_by_email");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Inserts a new account. A duplicate email surfaces as a unique violation.
    pub async fn create(&self, account: NewAccount<'_>) -> Result<AccountEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_account");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            r#"
            INSERT INTO accounts (email, password_hash, first_name, last_name, phone, address, role)
            VALUES (LOWER($1), $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.email)
        .bind(account.password_hash)
        .bind(account.first_name)
        .bind(account.last_name)
        .bind(account.phone)
        .bind(account.address)
        .bind(RoleDb::from(account.role))
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists accounts, optionally filtered by role and active flag.
    pub async fn list(
        &self,
        role: Option<Role>,
        active: Option<bool>,
    ) -> Result<Vec<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_accounts");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY last_name, first_name
            "#
        ))
        .bind(role.map(RoleDb::from))
        .bind(active)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Accounts whose first name, last name or email contains `term`.
    pub async fn search(
        &self,
        term: &str,
        role: Option<Role>,
        include_inactive: bool,
        limit: i64,
    ) -> Result<Vec<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("search_accounts");
        let pattern = format!("%{}%", term.trim());
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE (first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3 OR is_active)
            ORDER BY last_name, first_name
            LIMIT $4
            "#
        ))
        .bind(pattern)
        .bind(role.map(RoleDb::from))
        .bind(include_inactive)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn stats(&self) -> Result<UserStats, sqlx::Error> {
        let timer = QueryTimer::new("account_stats");
        let result = sqlx::query_as::<_, AccountCounts>(
            r#"
            SELECT COUNT(*) AS total_users,
                   COUNT(*) FILTER (WHERE is_active) AS active_users,
                   COUNT(*) FILTER (WHERE NOT is_active) AS inactive_users,
                   COUNT(*) FILTER (WHERE is_active AND role = 'admin') AS admin,
                   COUNT(*) FILTER (WHERE is_active AND role = 'veterinarian') AS veterinarian,
                   COUNT(*) FILTER (WHERE is_active AND role = 'receptionist') AS receptionist,
                   COUNT(*) FILTER (WHERE is_active AND role = 'auxiliary') AS auxiliary,
                   COUNT(*) FILTER (WHERE is_active AND role = 'client') AS client
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into)
    }

    /// Active accounts holding `role`.
    pub async fn list_active_by_role(&self, role: Role) -> Result<Vec<AccountEntity>, sqlx::Error> {
        self.list(Some(role), Some(true)).await
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &UpdateProfileRequest,
    ) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_account_profile");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            r#"
            UPDATE accounts
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn admin_update(
        &self,
        id: Uuid,
        update: &AdminUpdateUserRequest,
    ) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("admin_update_account");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            r#"
            UPDATE accounts
            SET email = COALESCE(LOWER($2), email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                role = COALESCE($7, role),
                is_active = COALESCE($8, is_active)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.email.as_deref())
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .bind(update.role.map(RoleDb::from))
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_account_password");
        let result = sqlx::query("UPDATE accounts SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Flips `is_active` and returns the updated row.
    pub async fn toggle_active(&self, id: Uuid) -> Result<Option<AccountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("toggle_account_active");
        let result = sqlx::query_as::<_, AccountEntity>(&format!(
            "UPDATE accounts SET is_active = NOT is_active WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Hard delete.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_account");
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
