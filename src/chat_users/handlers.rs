use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::CreateChatUserRequest,
    repo_types::{ChatUser, NewChatUser},
};
use crate::{auth::extractors::WidgetKey, error::AppResult, state::AppState};

pub fn chat_user_routes() -> Router<AppState> {
    Router::new()
        .route("/chat-users", post(create_chat_user))
        .route("/chat-users/:id", get(get_chat_user))
}

#[instrument(skip(state, _key, body))]
pub async fn create_chat_user(
    State(state): State<AppState>,
    _key: WidgetKey,
    Json(body): Json<CreateChatUserRequest>,
) -> AppResult<(StatusCode, Json<ChatUser>)> {
    body.validate()?;
    let created = state
        .chat_users
        .create(NewChatUser {
            id: body.id.unwrap_or_default(),
            age: body.age,
            gender: body.gender,
            occupation: body.occupation,
            location: body.location,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn get_chat_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ChatUser>> {
    Ok(Json(state.chat_users.get(&id).await?))
}
