use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo::UserRepo,
    repo_types::{NewUser, RoleFilter, User},
};
use crate::{
    auth::oauth::OAuthIdentity,
    error::{AppError, AppResult},
    pagination::{Page, Paginated},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepo>,
    initial_admin_email: Option<String>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepo>, initial_admin_email: Option<String>) -> Self {
        Self {
            repo,
            initial_admin_email,
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Finds the account behind an OAuth identity, creating it on first login
    /// when the email is on the allow-list.
    pub async fn login_with_oauth(&self, identity: OAuthIdentity) -> AppResult<User> {
        if let Some(user) = self
            .repo
            .find_by_provider(&identity.provider, &identity.provider_id)
            .await?
        {
            return Ok(user);
        }

        let email = identity.email.trim().to_lowercase();
        let is_initial_admin = self.initial_admin_email.as_deref() == Some(email.as_str());
        if !is_initial_admin && !self.repo.is_email_allowed(&email).await? {
            warn!(%email, "login refused: email not on allow-list");
            return Err(AppError::Forbidden("Email is not allowed".into()));
        }

        let user = self
            .repo
            .create(NewUser {
                email,
                is_admin: is_initial_admin,
                provider: identity.provider,
                provider_id: identity.provider_id,
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, is_admin = user.is_admin, "user created");
        Ok(user)
    }

    pub async fn list(&self, filter: RoleFilter, page: Page) -> AppResult<Paginated<User>> {
        self.repo.list(filter, page).await
    }

    pub async fn promote_to_admin(&self, id: Uuid) -> AppResult<()> {
        self.repo.promote_to_admin(id).await?;
        info!(user_id = %id, "user promoted to admin");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repo.delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn allow_list(&self) -> AppResult<Vec<String>> {
        self.repo.allowed_emails().await
    }

    pub async fn allow(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email)?;
        self.repo.allow_email(&email).await.map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict("Email already in allow-list".into()),
            other => other,
        })
    }

    pub async fn disallow(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email)?;
        self.repo.disallow_email(&email).await
    }
}
