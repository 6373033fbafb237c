use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::Interaction;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait InteractionRepo: Send + Sync {
    /// Fails with `NotFound` when `user_chat_id` has no chat user.
    async fn create(&self, user_chat_id: &str, context: &[String]) -> AppResult<Interaction>;

    /// Inserts a profile-less chat user and its first interaction atomically.
    async fn create_with_chat_user(
        &self,
        user_chat_id: &str,
        context: &[String],
    ) -> AppResult<Interaction>;
}

const INSERT_INTERACTION: &str = r#"
    INSERT INTO interactions (user_chat_id, context_interaction)
    VALUES ($1, $2)
    RETURNING id, user_chat_id, context_interaction, created_at
"#;

#[derive(Clone)]
pub struct PgInteractionRepo {
    db: PgPool,
}

impl PgInteractionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InteractionRepo for PgInteractionRepo {
    async fn create(&self, user_chat_id: &str, context: &[String]) -> AppResult<Interaction> {
        sqlx::query_as::<_, Interaction>(INSERT_INTERACTION)
            .bind(user_chat_id)
            .bind(context)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match AppError::from_db(e, "create interaction") {
                AppError::NotFound(_) => AppError::not_found("Referenced chat user not found"),
                other => other,
            })
    }

    async fn create_with_chat_user(
        &self,
        user_chat_id: &str,
        context: &[String],
    ) -> AppResult<Interaction> {
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::from_db(e, "begin interaction"))?;

        sqlx::query("INSERT INTO chat_users (id) VALUES ($1)")
            .bind(user_chat_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_db(e, "create chat user"))?;

        let interaction = sqlx::query_as::<_, Interaction>(INSERT_INTERACTION)
            .bind(user_chat_id)
            .bind(context)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::from_db(e, "create interaction"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::from_db(e, "commit interaction"))?;
        Ok(interaction)
    }
}
