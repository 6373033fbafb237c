use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{repo::InteractionRepo, repo_types::Interaction};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct InteractionService {
    repo: Arc<dyn InteractionRepo>,
}

impl InteractionService {
    pub fn new(repo: Arc<dyn InteractionRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, user_chat_id: &str, context: &[String]) -> AppResult<Interaction> {
        if user_chat_id.trim().is_empty() {
            return Err(AppError::bad_request("user_chat_id is required"));
        }
        let interaction = self.repo.create(user_chat_id, context).await?;
        info!(
            interaction_id = interaction.id,
            chat_user_id = %interaction.user_chat_id,
            citations = interaction.context_interaction.len(),
            "interaction recorded"
        );
        Ok(interaction)
    }

    /// Records an interaction for a freshly generated anonymous chat user.
    pub async fn create_for_new_chat_user(&self, context: &[String]) -> AppResult<Interaction> {
        let chat_user_id = Uuid::new_v4().to_string();
        let interaction = self.repo.create_with_chat_user(&chat_user_id, context).await?;
        info!(
            interaction_id = interaction.id,
            chat_user_id = %chat_user_id,
            citations = interaction.context_interaction.len(),
            "anonymous chat user created with interaction"
        );
        Ok(interaction)
    }
}
