use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Admin-console account, created on first OAuth login.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub provider: String,
    #[serde(skip_serializing)]
    pub provider_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub is_admin: bool,
    pub provider: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    All,
    Admins,
    NonAdmins,
}

impl RoleFilter {
    pub(crate) fn where_clause(self) -> &'static str {
        match self {
            RoleFilter::All => "",
            RoleFilter::Admins => "WHERE is_admin = true",
            RoleFilter::NonAdmins => "WHERE is_admin = false",
        }
    }
}
