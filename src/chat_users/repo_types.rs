use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Anonymous person talking to the chat widget.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewChatUser {
    pub id: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
}
