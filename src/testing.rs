//! In-memory stand-ins for the database and AWS clients, used by unit and
//! router tests.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    analytics::{
        dates::DateRange, repo::AnalyticsRepo, repo_types::DailyStatistic,
        services::AnalyticsService,
    },
    auth::{
        jwt::SessionKeys,
        oauth::{OAuthIdentity, OAuthProvider},
        repo::{Session, SessionRepo},
        services::SessionService,
    },
    chat_users::{
        repo::ChatUserRepo,
        repo_types::{ChatUser, NewChatUser},
        services::ChatUserService,
    },
    config::{AppConfig, GoogleConfig, KnowledgeBaseConfig, SessionConfig, StorageConfig},
    error::{AppError, AppResult},
    interactions::{repo::InteractionRepo, repo_types::Interaction, services::InteractionService},
    knowledge::{
        client::KnowledgeBaseClient,
        files::FileService,
        prompt::RagRequest,
        repo::FileRepo,
        repo_types::{Citation, DataFile, IngestionJob, NewDataFile, RagAnswer},
        services::KnowledgeService,
    },
    pagination::{Page, Paginated},
    state::AppState,
    storage::{ObjectPage, StorageClient},
    users::{
        repo::UserRepo,
        repo_types::{NewUser, RoleFilter, User},
        services::UserService,
    },
};

pub const WIDGET_KEY: &str = "widget-test-key";

pub fn session_config() -> SessionConfig {
    SessionConfig {
        secret: "test-secret".into(),
        issuer: "docqa-test".into(),
        audience: "docqa-test-admin".into(),
        ttl_minutes: 30,
        cookie_secure: false,
    }
}

pub fn knowledge_base_config() -> KnowledgeBaseConfig {
    KnowledgeBaseConfig {
        id: "KB123".into(),
        model_id: "arn:aws:bedrock:us-east-1::foundation-model/test".into(),
        prompt: "Answer from $search_results$".into(),
        number_of_results: 5,
        region: "us-east-1".into(),
        data_source_id: "DS456".into(),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/docqa_test".into(),
        host: "127.0.0.1".into(),
        port: 3000,
        session: session_config(),
        google: GoogleConfig {
            client_id: "client".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:3000/login/google/callback".into(),
        },
        redirect_after_login: "http://localhost:3001/dashboard".into(),
        initial_admin_email: None,
        allow_origins: vec!["http://localhost:3001".into()],
        storage: StorageConfig {
            bucket: "docs".into(),
            region: "us-east-1".into(),
            endpoint: None,
            access_key: None,
            secret_key: None,
        },
        knowledge_base: knowledge_base_config(),
        chat_widget_key: WIDGET_KEY.into(),
    }
}

pub fn sample_user(email: &str, is_admin: bool) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.into(),
        is_admin,
        provider: "google".into(),
        provider_id: format!("gid-{email}"),
        created_at: OffsetDateTime::now_utc(),
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
    allowed: Mutex<BTreeSet<String>>,
}

impl InMemoryUsers {
    pub fn allow(&self, email: &str) {
        self.allowed.lock().unwrap().insert(email.to_string());
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    fn email_of(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.email.clone())
    }
}

#[async_trait]
impl UserRepo for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_provider(&self, provider: &str, provider_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.provider == provider && u.provider_id == provider_id)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            is_admin: user.is_admin,
            provider: user.provider,
            provider_id: user.provider_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.insert(created.clone());
        Ok(created)
    }

    async fn list(&self, filter: RoleFilter, page: Page) -> AppResult<Paginated<User>> {
        let matching: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| match filter {
                RoleFilter::All => true,
                RoleFilter::Admins => u.is_admin,
                RoleFilter::NonAdmins => !u.is_admin,
            })
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Paginated::new(data, page, total))
    }

    async fn promote_to_admin(&self, id: Uuid) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.is_admin = true;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn allowed_emails(&self) -> AppResult<Vec<String>> {
        Ok(self.allowed.lock().unwrap().iter().cloned().collect())
    }

    async fn allow_email(&self, email: &str) -> AppResult<()> {
        if !self.allowed.lock().unwrap().insert(email.to_string()) {
            return Err(AppError::Conflict("add to allow-list: already exists".into()));
        }
        Ok(())
    }

    async fn disallow_email(&self, email: &str) -> AppResult<()> {
        if !self.allowed.lock().unwrap().remove(email) {
            return Err(AppError::not_found("Email not found in allow-list"));
        }
        Ok(())
    }

    async fn is_email_allowed(&self, email: &str) -> AppResult<bool> {
        Ok(self.allowed.lock().unwrap().contains(email))
    }
}

#[derive(Default)]
pub struct InMemorySessions {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessions {
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn expire_all(&self) {
        let past = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        for session in self.sessions.lock().unwrap().values_mut() {
            session.expires_at = past;
        }
    }
}

#[async_trait]
impl SessionRepo for InMemorySessions {
    async fn create(&self, session: &Session) -> AppResult<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Option<Session>> {
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.sessions.lock().unwrap().remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryChatUsers {
    users: Mutex<BTreeMap<String, ChatUser>>,
}

impl InMemoryChatUsers {
    pub fn insert(&self, id: &str) {
        self.users.lock().unwrap().insert(
            id.to_string(),
            ChatUser {
                id: id.to_string(),
                age: None,
                gender: None,
                occupation: None,
                location: None,
                created_at: OffsetDateTime::now_utc(),
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.users.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatUserRepo for InMemoryChatUsers {
    async fn get(&self, id: &str) -> AppResult<Option<ChatUser>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, user: NewChatUser) -> AppResult<ChatUser> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            return Err(AppError::Conflict("Chat user already exists".into()));
        }
        let created = ChatUser {
            id: user.id,
            age: user.age,
            gender: user.gender,
            occupation: user.occupation,
            location: user.location,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(created.id.clone(), created.clone());
        Ok(created)
    }
}

/// Enforces the chat-user foreign key against an [`InMemoryChatUsers`].
pub struct InMemoryInteractions {
    chat_users: Arc<InMemoryChatUsers>,
    rows: Mutex<Vec<Interaction>>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
}

impl InMemoryInteractions {
    pub fn new(chat_users: Arc<InMemoryChatUsers>) -> Self {
        Self {
            chat_users,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Makes every following insert fail like a lost database connection.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    fn check_inserts(&self) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Database("create interaction: connection reset".into()));
        }
        Ok(())
    }

    fn push(&self, user_chat_id: &str, context: &[String]) -> Interaction {
        let row = Interaction {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_chat_id: user_chat_id.to_string(),
            context_interaction: context.to_vec(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Interaction> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl InteractionRepo for InMemoryInteractions {
    async fn create(&self, user_chat_id: &str, context: &[String]) -> AppResult<Interaction> {
        self.check_inserts()?;
        if !self.chat_users.contains(user_chat_id) {
            return Err(AppError::not_found("Referenced chat user not found"));
        }
        Ok(self.push(user_chat_id, context))
    }

    async fn create_with_chat_user(
        &self,
        user_chat_id: &str,
        context: &[String],
    ) -> AppResult<Interaction> {
        self.check_inserts()?;
        self.chat_users.insert(user_chat_id);
        Ok(self.push(user_chat_id, context))
    }
}

pub struct InMemoryFiles {
    users: Option<Arc<InMemoryUsers>>,
    rows: Mutex<Vec<DataFile>>,
    next_id: AtomicI64,
}

impl Default for InMemoryFiles {
    fn default() -> Self {
        Self {
            users: None,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryFiles {
    /// Resolves `user_email` through `users`, like the SQL join does.
    pub fn with_users(users: Arc<InMemoryUsers>) -> Self {
        Self {
            users: Some(users),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl FileRepo for InMemoryFiles {
    async fn create(&self, file: NewDataFile) -> AppResult<DataFile> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|f| f.s3_key == file.s3_key) {
            return Err(AppError::Conflict("save file: already exists".into()));
        }
        let user_email = match (&self.users, file.user_id) {
            (Some(users), Some(id)) => users.email_of(id),
            _ => None,
        };
        let row = DataFile {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            filename: file.filename,
            s3_key: file.s3_key,
            user_id: file.user_id,
            user_email,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn list(&self, page: Page) -> AppResult<Paginated<DataFile>> {
        let rows = self.rows.lock().unwrap();
        let data = rows
            .iter()
            .rev()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok(Paginated::new(data, page, rows.len() as i64))
    }

    async fn delete(&self, id: i64) -> AppResult<Option<DataFile>> {
        let mut rows = self.rows.lock().unwrap();
        let position = rows.iter().position(|f| f.id == id);
        Ok(position.map(|i| rows.remove(i)))
    }

    async fn existing_keys(&self, keys: &[String]) -> AppResult<Vec<String>> {
        let rows = self.rows.lock().unwrap();
        Ok(keys
            .iter()
            .filter(|k| rows.iter().any(|f| &f.s3_key == *k))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct AnalyticsSeed {
    interactions: i64,
    document: Option<String>,
    chat_users: i64,
    daily: Vec<DailyStatistic>,
    last_range: Option<DateRange>,
    last_active_days: Option<i32>,
}

/// Canned aggregates; records the arguments it was queried with.
#[derive(Default)]
pub struct InMemoryAnalytics {
    seed: Mutex<AnalyticsSeed>,
}

impl InMemoryAnalytics {
    pub fn seed_summary(&self, interactions: i64, document: Option<&str>, chat_users: i64) {
        let mut seed = self.seed.lock().unwrap();
        seed.interactions = interactions;
        seed.document = document.map(str::to_string);
        seed.chat_users = chat_users;
    }

    pub fn seed_daily(&self, date: &str, count: i64) {
        self.seed.lock().unwrap().daily.push(DailyStatistic {
            date: date.into(),
            count,
        });
    }

    pub fn last_range(&self) -> Option<DateRange> {
        self.seed.lock().unwrap().last_range
    }

    pub fn last_active_days(&self) -> Option<i32> {
        self.seed.lock().unwrap().last_active_days
    }

    fn record(&self, range: &DateRange) -> std::sync::MutexGuard<'_, AnalyticsSeed> {
        let mut seed = self.seed.lock().unwrap();
        seed.last_range = Some(*range);
        seed
    }
}

#[async_trait]
impl AnalyticsRepo for InMemoryAnalytics {
    async fn count_interactions(&self, range: &DateRange) -> AppResult<i64> {
        Ok(self.record(range).interactions)
    }

    async fn most_cited_document(&self, range: &DateRange) -> AppResult<Option<String>> {
        Ok(self.record(range).document.clone())
    }

    async fn count_chat_users(&self, range: &DateRange) -> AppResult<i64> {
        Ok(self.record(range).chat_users)
    }

    async fn daily_chat_users(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>> {
        Ok(self.record(range).daily.clone())
    }

    async fn daily_interactions(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>> {
        Ok(self.record(range).daily.clone())
    }

    async fn daily_active_users(
        &self,
        range: &DateRange,
        active_days: i32,
    ) -> AppResult<Vec<DailyStatistic>> {
        let mut seed = self.record(range);
        seed.last_active_days = Some(active_days);
        Ok(seed.daily.clone())
    }

    async fn export_chat_users(&self, _range: Option<&DateRange>) -> AppResult<Vec<ChatUser>> {
        Ok(Vec::new())
    }

    async fn export_interactions(&self, _range: Option<&DateRange>) -> AppResult<Vec<Interaction>> {
        Ok(Vec::new())
    }

    async fn export_files(&self, _range: Option<&DateRange>) -> AppResult<Vec<DataFile>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<BTreeSet<String>>,
    last_put: Mutex<Option<(String, String, Bytes)>>,
    deletes: AtomicUsize,
    fail_deletes: AtomicBool,
    fail_puts: AtomicBool,
}

impl FakeStorage {
    pub fn insert(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains(key)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn last_put(&self) -> Option<(String, String, Bytes)> {
        self.last_put.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("storage offline");
        }
        self.insert(key);
        *self.last_put.lock().unwrap() = Some((key.to_string(), content_type.to_string(), body));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("storage offline");
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        Ok(format!("https://fake-storage.local/{key}?op=get&ttl={}", ttl.as_secs()))
    }

    async fn presign_put(&self, key: &str, ttl: Duration) -> anyhow::Result<String> {
        Ok(format!("https://fake-storage.local/{key}?op=put&ttl={}", ttl.as_secs()))
    }

    async fn list_objects(
        &self,
        prefix: &str,
        page_size: i32,
        continuation_token: Option<String>,
    ) -> anyhow::Result<ObjectPage> {
        let skip: usize = continuation_token.map(|t| t.parse()).transpose()?.unwrap_or(0);
        let matching: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        let end = (skip + page_size as usize).min(matching.len());
        Ok(ObjectPage {
            keys: matching[skip.min(end)..end].to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

#[derive(Default)]
pub struct FakeKnowledgeBase {
    sources: Mutex<Vec<String>>,
    failing: AtomicBool,
    last_request: Mutex<Option<RagRequest>>,
    jobs: Mutex<HashMap<String, IngestionJob>>,
}

impl FakeKnowledgeBase {
    pub fn answer_with(&self, sources: &[&str]) {
        *self.sources.lock().unwrap() = sources.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn last_request(&self) -> Option<RagRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBaseClient for FakeKnowledgeBase {
    async fn retrieve_and_generate(&self, request: RagRequest) -> AppResult<RagAnswer> {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| "fake-session".into());
        *self.last_request.lock().unwrap() = Some(request);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable("Knowledge base is unavailable".into()));
        }
        let sources = self.sources.lock().unwrap().clone();
        Ok(RagAnswer {
            text: "fake answer".into(),
            session_id,
            citations: vec![Citation {
                text: Some("fake answer".into()),
                sources,
            }],
        })
    }

    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> AppResult<IngestionJob> {
        let job = IngestionJob {
            ingestion_job_id: Uuid::new_v4().simple().to_string(),
            knowledge_base_id: knowledge_base_id.into(),
            data_source_id: data_source_id.into(),
            status: "STARTING".into(),
            failure_reasons: Vec::new(),
        };
        self.jobs
            .lock()
            .unwrap()
            .insert(job.ingestion_job_id.clone(), job.clone());
        Ok(job)
    }

    async fn ingestion_job(
        &self,
        _knowledge_base_id: &str,
        _data_source_id: &str,
        job_id: &str,
    ) -> AppResult<IngestionJob> {
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("resource not found: no such ingestion job"))
    }
}

/// Treats the authorization code as the user's email.
pub struct FakeOAuth;

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn authorize_url(&self, state: &str) -> AppResult<String> {
        Ok(format!("https://fake-oauth.local/authorize?state={state}"))
    }

    async fn exchange(&self, code: &str) -> AppResult<OAuthIdentity> {
        Ok(OAuthIdentity {
            provider: self.name().to_string(),
            provider_id: code.to_string(),
            email: code.trim().to_lowercase(),
        })
    }
}

/// Handles onto the fakes behind a [`fake_state`].
#[derive(Clone)]
pub struct Fakes {
    pub users: Arc<InMemoryUsers>,
    pub sessions: Arc<InMemorySessions>,
    pub chat_users: Arc<InMemoryChatUsers>,
    pub interactions: Arc<InMemoryInteractions>,
    pub files: Arc<InMemoryFiles>,
    pub analytics: Arc<InMemoryAnalytics>,
    pub storage: Arc<FakeStorage>,
    pub knowledge: Arc<FakeKnowledgeBase>,
}

pub fn fake_state() -> (AppState, Fakes) {
    let config = test_config();
    let users = Arc::new(InMemoryUsers::default());
    let sessions = Arc::new(InMemorySessions::default());
    let chat_users = Arc::new(InMemoryChatUsers::default());
    let interactions = Arc::new(InMemoryInteractions::new(chat_users.clone()));
    let files = Arc::new(InMemoryFiles::with_users(users.clone()));
    let analytics = Arc::new(InMemoryAnalytics::default());
    let storage = Arc::new(FakeStorage::default());
    let knowledge = Arc::new(FakeKnowledgeBase::default());

    let chat_user_service = ChatUserService::new(chat_users.clone());
    let interaction_service = InteractionService::new(interactions.clone());
    let state = AppState {
        oauth: Arc::new(FakeOAuth),
        sessions: SessionService::new(sessions.clone(), SessionKeys::new(&config.session)),
        users: UserService::new(users.clone(), config.initial_admin_email.clone()),
        knowledge: KnowledgeService::new(
            knowledge.clone(),
            config.knowledge_base.clone(),
            chat_user_service.clone(),
            interaction_service.clone(),
        ),
        chat_users: chat_user_service,
        interactions: interaction_service,
        files: FileService::new(files.clone(), storage.clone()),
        analytics: AnalyticsService::new(analytics.clone(), storage.clone()),
        config: Arc::new(config),
    };

    let fakes = Fakes {
        users,
        sessions,
        chat_users,
        interactions,
        files,
        analytics,
        storage,
        knowledge,
    };
    (state, fakes)
}

/// Signs in a fresh user and returns the `Cookie` header value for it.
pub async fn login(state: &AppState, fakes: &Fakes, email: &str, is_admin: bool) -> String {
    let user = sample_user(email, is_admin);
    fakes.users.insert(user.clone());
    let issued = state.sessions.start(user.id).await.unwrap();
    format!("session={}", issued.token)
}
