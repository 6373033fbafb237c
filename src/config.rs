use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// MinIO-style endpoint; AWS defaults are used when absent.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Knowledge base the answering endpoint and ingestion jobs run against.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseConfig {
    pub id: String,
    pub model_id: String,
    pub prompt: String,
    pub number_of_results: i32,
    pub region: String,
    pub data_source_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub google: GoogleConfig,
    pub redirect_after_login: String,
    pub initial_admin_email: Option<String>,
    pub allow_origins: Vec<String>,
    pub storage: StorageConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub chat_widget_key: String,
}

const DEFAULT_ALLOW_ORIGINS: &str = "http://localhost:3001, http://localhost:3000";

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{name} is not set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut database_url = required("DATABASE_URL")?;
        if !database_url.contains("sslmode") {
            let sep = if database_url.contains('?') { '&' } else { '?' };
            database_url.push(sep);
            database_url.push_str("sslmode=disable");
        }

        let session = SessionConfig {
            secret: required("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "docqa".into()),
            audience: std::env::var("SESSION_AUDIENCE").unwrap_or_else(|_| "docqa-admin".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v != "false")
                .unwrap_or(true),
        };

        let google = GoogleConfig {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required("GOOGLE_REDIRECT_URI")?,
        };

        let storage = StorageConfig {
            bucket: required("S3_BUCKET")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: optional("S3_ENDPOINT"),
            access_key: optional("S3_ACCESS_KEY"),
            secret_key: optional("S3_SECRET_KEY"),
        };

        let knowledge_base = KnowledgeBaseConfig {
            id: required("KB_ID")?,
            model_id: required("KB_MODEL_ID")?,
            prompt: required("KB_MODEL_PROMPT")?,
            number_of_results: required("KB_NUMBER_OF_RESULTS")?
                .parse::<i32>()
                .context("KB_NUMBER_OF_RESULTS is not a number")?,
            region: required("KB_REGION")?,
            data_source_id: required("KB_S3_DATA_SOURCE")?,
        };

        let port = std::env::var("PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("PORT is not a valid port")?
            .unwrap_or(3000);

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            session,
            google,
            redirect_after_login: required("REDIRECT_AFTER_LOGIN")?,
            initial_admin_email: optional("INITIAL_ADMIN_EMAIL").map(|e| e.trim().to_lowercase()),
            allow_origins: split_origins(
                &std::env::var("ALLOW_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOW_ORIGINS.into()),
            ),
            storage,
            knowledge_base,
            chat_widget_key: required("CHAT_WIDGET_KEY")?,
        })
    }
}
