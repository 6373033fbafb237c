use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::{
    config::GoogleConfig,
    error::{AppError, AppResult},
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// Who the provider says just logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub provider: String,
    pub provider_id: String,
    pub email: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn authorize_url(&self, state: &str) -> AppResult<String>;
    async fn exchange(&self, code: &str) -> AppResult<OAuthIdentity>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
}

pub struct GoogleOAuth {
    client: Client,
    cfg: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(cfg: GoogleConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str) -> AppResult<String> {
        let mut url = Url::parse(GOOGLE_AUTH_URL)
            .map_err(|e| AppError::Unexpected(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("redirect_uri", &self.cfg.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPES)
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn exchange(&self, code: &str) -> AppResult<OAuthIdentity> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.cfg.client_id.as_str()),
                ("client_secret", self.cfg.client_secret.as_str()),
                ("redirect_uri", self.cfg.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("token exchange: {e}")))?;

        if !response.status().is_success() {
            // body may echo the code; keep it out of the logs
            error!(status = %response.status(), "token exchange rejected");
            return Err(AppError::Unauthorized("OAuth code exchange failed".into()));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("token response: {e}")))?;

        let info: GoogleUserInfo = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::ServiceUnavailable(format!("userinfo: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("userinfo response: {e}")))?;

        let email = info
            .email
            .filter(|_| info.email_verified.unwrap_or(false))
            .ok_or_else(|| AppError::Forbidden("A verified email is required".into()))?;

        info!(provider = "google", "oauth identity resolved");
        Ok(OAuthIdentity {
            provider: self.name().to_string(),
            provider_id: info.sub,
            email: email.trim().to_lowercase(),
        })
    }
}
