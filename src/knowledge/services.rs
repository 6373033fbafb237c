use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{
    client::KnowledgeBaseClient,
    prompt::RagRequest,
    repo_types::{Citation, IngestionJob},
};
use crate::{
    chat_users::services::ChatUserService,
    config::KnowledgeBaseConfig,
    error::{AppError, AppResult},
    interactions::services::InteractionService,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedAnswer {
    pub answer: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub citations: Vec<Citation>,
    #[serde(rename = "userChatID")]
    pub user_chat_id: String,
    pub interaction_id: i64,
}

/// Answers questions against the knowledge base and manages its ingestion.
#[derive(Clone)]
pub struct KnowledgeService {
    client: Arc<dyn KnowledgeBaseClient>,
    config: KnowledgeBaseConfig,
    chat_users: ChatUserService,
    interactions: InteractionService,
}

impl KnowledgeService {
    pub fn new(
        client: Arc<dyn KnowledgeBaseClient>,
        config: KnowledgeBaseConfig,
        chat_users: ChatUserService,
        interactions: InteractionService,
    ) -> Self {
        Self {
            client,
            config,
            chat_users,
            interactions,
        }
    }

    /// Runs one retrieve-and-generate round and records the interaction.
    ///
    /// Nothing is persisted when the upstream call fails. Without a
    /// `user_chat_id` an anonymous chat user is created together with the
    /// interaction, after the answer comes back.
    pub async fn complete_answer(
        &self,
        question: &str,
        session_id: Option<String>,
        user_chat_id: Option<String>,
    ) -> AppResult<CompletedAnswer> {
        if question.trim().is_empty() {
            warn!("empty question refused");
            return Err(AppError::bad_request("userMessage is required"));
        }
        let user_chat_id = user_chat_id.filter(|id| !id.trim().is_empty());
        if let Some(id) = &user_chat_id {
            self.chat_users.get(id).await?;
        }

        let answer = self
            .client
            .retrieve_and_generate(RagRequest::new(&self.config, question, session_id))
            .await?;
        let cited = answer.cited_uris();

        let interaction = match &user_chat_id {
            Some(id) => self.interactions.create(id, &cited).await?,
            None => self.interactions.create_for_new_chat_user(&cited).await?,
        };
        let user_chat_id = interaction.user_chat_id.clone();

        info!(
            chat_user_id = %user_chat_id,
            interaction_id = interaction.id,
            cited = cited.len(),
            "question answered"
        );
        Ok(CompletedAnswer {
            answer: answer.text,
            session_id: answer.session_id,
            citations: answer.citations,
            user_chat_id,
            interaction_id: interaction.id,
        })
    }

    pub async fn sync(&self) -> AppResult<IngestionJob> {
        let job = self
            .client
            .start_ingestion_job(&self.config.id, &self.config.data_source_id)
            .await?;
        info!(job_id = %job.ingestion_job_id, status = %job.status, "ingestion job started");
        Ok(job)
    }

    pub async fn ingestion_status(&self, job_id: &str) -> AppResult<IngestionJob> {
        if job_id.trim().is_empty() {
            return Err(AppError::bad_request("ingestion job id is required"));
        }
        self.client
            .ingestion_job(&self.config.id, &self.config.data_source_id, job_id)
            .await
    }
}
