use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateInteractionRequest {
    pub user_chat_id: String,
    #[serde(default)]
    pub context_interaction: Vec<String>,
}
