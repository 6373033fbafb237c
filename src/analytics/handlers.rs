use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dates::{optional_range, required_range},
    dto::{ActiveUsersQuery, Data, RangeQuery},
    repo_types::{DailyStatistic, ExportLink, Statistic},
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics", get(summary))
        .route("/analytics/daily/users", get(daily_users))
        .route("/analytics/daily/interactions", get(daily_interactions))
        .route("/analytics/daily/active-users", get(daily_active_users))
        .route("/analytics/export", get(export))
}

#[instrument(skip(state, _user))]
pub async fn summary(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Data<Vec<Statistic>>>> {
    let range = optional_range(q.start_date.as_deref(), q.end_date.as_deref())?;
    let data = state.analytics.summary(range).await?;
    Ok(Json(Data { data }))
}

#[instrument(skip(state, _user))]
pub async fn daily_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Data<Vec<DailyStatistic>>>> {
    let range = required_range(q.start_date.as_deref(), q.end_date.as_deref())?;
    let data = state.analytics.daily_users(range).await?;
    Ok(Json(Data { data }))
}

#[instrument(skip(state, _user))]
pub async fn daily_interactions(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Data<Vec<DailyStatistic>>>> {
    let range = required_range(q.start_date.as_deref(), q.end_date.as_deref())?;
    let data = state.analytics.daily_interactions(range).await?;
    Ok(Json(Data { data }))
}

#[instrument(skip(state, _user))]
pub async fn daily_active_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<ActiveUsersQuery>,
) -> AppResult<Json<Data<Vec<DailyStatistic>>>> {
    let range = required_range(q.start_date.as_deref(), q.end_date.as_deref())?;
    let data = state.analytics.daily_active_users(range, q.active_days).await?;
    Ok(Json(Data { data }))
}

#[instrument(skip(state, _user))]
pub async fn export(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> AppResult<Json<Data<ExportLink>>> {
    let range = optional_range(q.start_date.as_deref(), q.end_date.as_deref())?;
    let data = state.analytics.export_csv(range).await?;
    Ok(Json(Data { data }))
}
