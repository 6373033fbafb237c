use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata row for an uploaded document.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    pub id: i64,
    pub filename: String,
    pub s3_key: String,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDataFile {
    pub filename: String,
    pub s3_key: String,
    pub user_id: Option<Uuid>,
}

/// One citation in a generated answer and the documents backing it.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub text: Option<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RagAnswer {
    pub text: String,
    pub session_id: String,
    pub citations: Vec<Citation>,
}

impl RagAnswer {
    /// Every cited source URI, in citation order.
    pub fn cited_uris(&self) -> Vec<String> {
        self.citations
            .iter()
            .flat_map(|c| c.sources.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestionJob {
    pub ingestion_job_id: String,
    pub knowledge_base_id: String,
    pub data_source_id: String,
    pub status: String,
    pub failure_reasons: Vec<String>,
}
