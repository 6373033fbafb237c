use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveUsersQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub active_days: Option<i32>,
}

/// Envelope every analytics response is wrapped in.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}
