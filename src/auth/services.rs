use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    jwt::SessionKeys,
    repo::{Session, SessionRepo},
};
use crate::error::{AppError, AppResult};

const SESSION_ID_LEN: usize = 40;

pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Issues, validates and revokes login sessions.
#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionRepo>,
    keys: SessionKeys,
}

/// A freshly opened session, ready to be set as a cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionRepo>, keys: SessionKeys) -> Self {
        Self { repo, keys }
    }

    pub async fn start(&self, user_id: Uuid) -> AppResult<IssuedSession> {
        let session_id = random_token(SESSION_ID_LEN);
        let (token, expires_at) = self
            .keys
            .sign(user_id, &session_id, OffsetDateTime::now_utc())
            .map_err(|e| AppError::Unexpected(format!("sign session token: {e}")))?;

        self.repo
            .create(&Session {
                id: session_id,
                user_id,
                expires_at,
            })
            .await?;
        info!(%user_id, "session started");
        Ok(IssuedSession { token, expires_at })
    }

    /// Resolves a token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> AppResult<Uuid> {
        let claims = self.keys.verify(token).map_err(|e| {
            debug!(error = %e, "session token rejected");
            AppError::Unauthorized("Invalid or expired session".into())
        })?;

        let session = self
            .repo
            .find(&claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or_else(|| AppError::Unauthorized("Session not found".into()))?;

        if session.expires_at <= OffsetDateTime::now_utc() {
            warn!(user_id = %session.user_id, "expired session presented");
            self.repo.delete(&session.id).await?;
            return Err(AppError::Unauthorized("Invalid or expired session".into()));
        }

        Ok(session.user_id)
    }

    /// Revokes the session behind `token`; unknown or invalid tokens are ignored.
    pub async fn end(&self, token: &str) -> AppResult<()> {
        let Ok(claims) = self.keys.verify(token) else {
            return Ok(());
        };
        self.repo.delete(&claims.sid).await?;
        info!(user_id = %claims.sub, "session ended");
        Ok(())
    }
}
