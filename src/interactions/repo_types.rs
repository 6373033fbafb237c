use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// One answered question and the documents cited for it.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Interaction {
    pub id: i64,
    pub user_chat_id: String,
    pub context_interaction: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
