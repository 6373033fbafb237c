use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{EmailRequest, PromoteRequest},
    repo_types::{RoleFilter, User},
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::AppResult,
    pagination::{PageQuery, Paginated},
    state::AppState,
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/not-admin", get(list_not_admin))
        .route("/users/admin", get(list_admins))
        .route("/users/promote-to-admin", post(promote_to_admin))
        .route(
            "/users/whitelist",
            get(get_allow_list).post(add_to_allow_list).delete(remove_from_allow_list),
        )
        .route("/users/:id", delete(delete_user))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn list_by_role(
    state: &AppState,
    filter: RoleFilter,
    q: PageQuery,
) -> AppResult<Json<Paginated<User>>> {
    let page = q.validate()?;
    Ok(Json(state.users.list(filter, page).await?))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Paginated<User>>> {
    list_by_role(&state, RoleFilter::All, q).await
}

#[instrument(skip(state, _admin))]
pub async fn list_not_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Paginated<User>>> {
    list_by_role(&state, RoleFilter::NonAdmins, q).await
}

#[instrument(skip(state, _admin))]
pub async fn list_admins(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Paginated<User>>> {
    list_by_role(&state, RoleFilter::Admins, q).await
}

#[instrument(skip(state, _admin))]
pub async fn promote_to_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<PromoteRequest>,
) -> AppResult<StatusCode> {
    state.users.promote_to_admin(body.user_id).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, _admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _admin))]
pub async fn get_allow_list(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.users.allow_list().await?))
}

#[instrument(skip(state, _admin))]
pub async fn add_to_allow_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    state.users.allow(&body.email).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, _admin))]
pub async fn remove_from_allow_list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    state.users.disallow(&body.email).await?;
    Ok(StatusCode::OK)
}
