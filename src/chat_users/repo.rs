use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{ChatUser, NewChatUser};
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ChatUserRepo: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<Option<ChatUser>>;
    /// Fails with `Conflict` when the id is taken.
    async fn create(&self, user: NewChatUser) -> AppResult<ChatUser>;
}

#[derive(Clone)]
pub struct PgChatUserRepo {
    db: PgPool,
}

impl PgChatUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatUserRepo for PgChatUserRepo {
    async fn get(&self, id: &str) -> AppResult<Option<ChatUser>> {
        sqlx::query_as::<_, ChatUser>(
            r#"
            SELECT id, age, gender, occupation, location, created_at
            FROM chat_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "get chat user"))
    }

    async fn create(&self, user: NewChatUser) -> AppResult<ChatUser> {
        sqlx::query_as::<_, ChatUser>(
            r#"
            INSERT INTO chat_users (id, age, gender, occupation, location)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, age, gender, occupation, location, created_at
            "#,
        )
        .bind(&user.id)
        .bind(user.age)
        .bind(&user.gender)
        .bind(&user.occupation)
        .bind(&user.location)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "create chat user"))?
        .ok_or_else(|| AppError::Conflict("Chat user already exists".into()))
    }
}
