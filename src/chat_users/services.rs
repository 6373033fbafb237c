use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{
    repo::ChatUserRepo,
    repo_types::{ChatUser, NewChatUser},
};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ChatUserService {
    repo: Arc<dyn ChatUserRepo>,
}

impl ChatUserService {
    pub fn new(repo: Arc<dyn ChatUserRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> AppResult<ChatUser> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Chat user not found"))
    }

    /// Stores a chat user, generating an id when the caller left it empty.
    pub async fn create(&self, mut user: NewChatUser) -> AppResult<ChatUser> {
        if user.id.trim().is_empty() {
            user.id = Uuid::new_v4().to_string();
        }
        let created = self.repo.create(user).await?;
        info!(chat_user_id = %created.id, "chat user created");
        Ok(created)
    }
}
