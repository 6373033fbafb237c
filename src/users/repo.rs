use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, RoleFilter, User};
use crate::{
    error::{AppError, AppResult},
    pagination::{Page, Paginated},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: NewUser) -> AppResult<User>;
    async fn list(&self, filter: RoleFilter, page: Page) -> AppResult<Paginated<User>>;
    async fn promote_to_admin(&self, id: Uuid) -> AppResult<()>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn allowed_emails(&self) -> AppResult<Vec<String>>;
    async fn allow_email(&self, email: &str) -> AppResult<()>;
    async fn disallow_email(&self, email: &str) -> AppResult<()>;
    async fn is_email_allowed(&self, email: &str) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, is_admin, provider, provider_id, created_at";

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "get user"))
    }

    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE provider = $1 AND provider_id = $2"
        ))
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "get user by provider"))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, is_admin, provider, provider_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "create user"))
    }

    async fn list(&self, filter: RoleFilter, page: Page) -> AppResult<Paginated<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {} ORDER BY created_at, id LIMIT $1 OFFSET $2",
            filter.where_clause()
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "list users"))?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users {}",
            filter.where_clause()
        ))
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "count users"))?;

        Ok(Paginated::new(rows, page, total))
    }

    async fn promote_to_admin(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_admin = true, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "promote user"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "delete user"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn allowed_emails(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar("SELECT email FROM allowed_emails ORDER BY email")
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "list allow-list"))
    }

    async fn allow_email(&self, email: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO allowed_emails (email) VALUES ($1)")
            .bind(email)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "add to allow-list"))?;
        Ok(())
    }

    async fn disallow_email(&self, email: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM allowed_emails WHERE email = $1")
            .bind(email)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "remove from allow-list"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Email not found in allow-list"));
        }
        Ok(())
    }

    async fn is_email_allowed(&self, email: &str) -> AppResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM allowed_emails WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "check allow-list"))
    }
}
