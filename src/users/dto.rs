use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}
