use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Server-side half of a login; the cookie token points at it.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(&self, session: &Session) -> AppResult<()>;
    async fn find(&self, id: &str) -> AppResult<Option<Session>>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgSessionRepo {
    db: PgPool,
}

impl PgSessionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepo for PgSessionRepo {
    async fn create(&self, session: &Session) -> AppResult<()> {
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "create session"))?;
        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, expires_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "get session"))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "delete session"))?;
        Ok(())
    }
}
