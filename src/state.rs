use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    analytics::{repo::PgAnalyticsRepo, services::AnalyticsService},
    auth::{
        jwt::SessionKeys,
        oauth::{GoogleOAuth, OAuthProvider},
        repo::PgSessionRepo,
        services::SessionService,
    },
    chat_users::{repo::PgChatUserRepo, services::ChatUserService},
    config::AppConfig,
    interactions::{repo::PgInteractionRepo, services::InteractionService},
    knowledge::{
        client::BedrockKnowledgeBase, files::FileService, repo::PgFileRepo,
        services::KnowledgeService,
    },
    storage::{Storage, StorageClient},
    users::{repo::PgUserRepo, services::UserService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub oauth: Arc<dyn OAuthProvider>,
    pub sessions: SessionService,
    pub users: UserService,
    pub chat_users: ChatUserService,
    pub interactions: InteractionService,
    pub knowledge: KnowledgeService,
    pub files: FileService,
    pub analytics: AnalyticsService,
}

impl AppState {
    /// Wires Postgres repositories and the AWS clients into the services.
    pub async fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let kb = Arc::new(BedrockKnowledgeBase::new(&config.knowledge_base).await);

        let chat_users = ChatUserService::new(Arc::new(PgChatUserRepo::new(db.clone())));
        let interactions = InteractionService::new(Arc::new(PgInteractionRepo::new(db.clone())));

        Ok(Self {
            oauth: Arc::new(GoogleOAuth::new(config.google.clone())),
            sessions: SessionService::new(
                Arc::new(PgSessionRepo::new(db.clone())),
                SessionKeys::new(&config.session),
            ),
            users: UserService::new(
                Arc::new(PgUserRepo::new(db.clone())),
                config.initial_admin_email.clone(),
            ),
            knowledge: KnowledgeService::new(
                kb,
                config.knowledge_base.clone(),
                chat_users.clone(),
                interactions.clone(),
            ),
            chat_users,
            interactions,
            files: FileService::new(Arc::new(PgFileRepo::new(db.clone())), storage.clone()),
            analytics: AnalyticsService::new(Arc::new(PgAnalyticsRepo::new(db)), storage),
            config: Arc::new(config),
        })
    }
}
