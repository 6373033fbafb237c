use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use super::{dto::CreateInteractionRequest, repo_types::Interaction};
use crate::{auth::extractors::WidgetKey, error::AppResult, state::AppState};

pub fn interaction_routes() -> Router<AppState> {
    Router::new().route("/interactions", post(create_interaction))
}

#[instrument(skip(state, _key, body), fields(chat_user_id = %body.user_chat_id))]
pub async fn create_interaction(
    State(state): State<AppState>,
    _key: WidgetKey,
    Json(body): Json<CreateInteractionRequest>,
) -> AppResult<(StatusCode, Json<Interaction>)> {
    let created = state
        .interactions
        .create(&body.user_chat_id, &body.context_interaction)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
