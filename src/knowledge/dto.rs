use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CompleteAnswerRequest {
    #[serde(rename = "userMessage")]
    pub user_message: String,
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
    #[serde(rename = "userChatID", default)]
    pub user_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    #[serde(alias = "key")]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsQuery {
    pub page_size: Option<i32>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResponse {
    pub files: Vec<String>,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub removed: Vec<String>,
}
