use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::{error::AppError, state::AppState, users::repo_types::User};

pub const SESSION_COOKIE: &str = "session";

/// Session token from the `session` cookie, falling back to a Bearer header.
pub(crate) fn session_token(parts: &Parts) -> Option<String> {
    if let Some(cookie) = CookieJar::from_headers(&parts.headers).get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::to_string)
}

/// Signed-in admin-console user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing session".into()))?;
        let user_id = state.sessions.authenticate(&token).await?;

        let user = state.users.get(user_id).await.map_err(|e| match e {
            AppError::NotFound(_) => {
                warn!(%user_id, "session for deleted user");
                AppError::Unauthorized("User not found".into())
            }
            other => other,
        })?;
        Ok(AuthUser(user))
    }
}

/// Signed-in user with the admin flag set.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            warn!(user_id = %user.id, "admin route refused");
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(AdminUser(user))
    }
}

/// Requests from the chat widget must carry the shared widget key.
pub struct WidgetKey;

#[async_trait]
impl FromRequestParts<AppState> for WidgetKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        if presented != Some(state.config.chat_widget_key.as_str()) {
            return Err(AppError::Unauthorized("Invalid authorization".into()));
        }
        Ok(WidgetKey)
    }
}
