use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;
use tracing::{info, instrument, warn};

use super::{extractors::SESSION_COOKIE, services::random_token};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_LEN: usize = 32;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login/google", get(login_google))
        .route("/login/google/callback", get(google_callback))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

fn cookie(name: &'static str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

fn expired(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

#[instrument(skip(state, jar))]
pub async fn login_google(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let oauth_state = random_token(OAUTH_STATE_LEN);
    let url = state.oauth.authorize_url(&oauth_state)?;
    let jar = jar.add(cookie(
        OAUTH_STATE_COOKIE,
        oauth_state,
        state.config.session.cookie_secure,
        Duration::minutes(10),
    ));
    Ok((jar, Redirect::to(&url)))
}

#[instrument(skip(state, jar, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> AppResult<(CookieJar, Redirect)> {
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    match (expected.as_deref(), query.state.as_deref()) {
        (Some(expected), Some(got)) if !expected.is_empty() && expected == got => {}
        _ => {
            warn!("oauth state mismatch");
            return Err(AppError::Unauthorized("Invalid state".into()));
        }
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing code"))?;

    let identity = state.oauth.exchange(&code).await?;
    let user = state.users.login_with_oauth(identity).await?;
    let issued = state.sessions.start(user.id).await?;

    let max_age = issued.expires_at - time::OffsetDateTime::now_utc();
    let jar = jar.remove(expired(OAUTH_STATE_COOKIE)).add(cookie(
        SESSION_COOKIE,
        issued.token,
        state.config.session.cookie_secure,
        max_age,
    ));

    info!(user_id = %user.id, "login successful");
    Ok((jar, Redirect::to(&state.config.redirect_after_login)))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, &'static str)> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.sessions.end(&token).await?;
    }
    Ok((jar.remove(expired(SESSION_COOKIE)), "Logged out successfully"))
}
