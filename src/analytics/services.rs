use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info};

use super::{
    dates::{format_date, DateRange},
    export,
    repo::AnalyticsRepo,
    repo_types::{DailyStatistic, ExportLink, Statistic},
};
use crate::{
    error::{AppError, AppResult},
    storage::StorageClient,
};

pub const DEFAULT_ACTIVE_DAYS: i32 = 7;
pub const MAX_ACTIVE_DAYS: i32 = 365;
pub const MAX_SERIES_DAYS: i64 = 3660;
const EXPORT_URL_TTL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// One entry per day of `range`, taking counts from `sparse` and zero elsewhere.
pub(crate) fn fill_days(range: &DateRange, sparse: Vec<DailyStatistic>) -> Vec<DailyStatistic> {
    let counts: HashMap<String, i64> = sparse.into_iter().map(|d| (d.date, d.count)).collect();
    let last = range.end_date();
    let mut day = Some(range.start_date());
    let mut out = Vec::new();
    while let Some(d) = day.filter(|d| *d <= last) {
        let date = format_date(d);
        let count = counts.get(&date).copied().unwrap_or(0);
        out.push(DailyStatistic { date, count });
        day = d.next_day();
    }
    out
}

fn check_series_length(range: &DateRange) -> AppResult<()> {
    if range.days() > MAX_SERIES_DAYS {
        return Err(AppError::bad_request(format!(
            "date range cannot exceed {MAX_SERIES_DAYS} days"
        )));
    }
    Ok(())
}

fn non_empty_series(series: Vec<DailyStatistic>, what: &str) -> AppResult<Vec<DailyStatistic>> {
    if series.iter().all(|d| d.count == 0) {
        return Err(AppError::not_found(format!(
            "no {what} found for the specified period"
        )));
    }
    Ok(series)
}

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepo>,
    storage: Arc<dyn StorageClient>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepo>, storage: Arc<dyn StorageClient>) -> Self {
        Self { repo, storage }
    }

    /// Interaction count, most-cited document and chat-user count, in that
    /// order. Without a range the month-to-date variants are produced.
    pub async fn summary(&self, range: Option<DateRange>) -> AppResult<Vec<Statistic>> {
        let explicit = range.is_some();
        let range = range.unwrap_or_else(|| DateRange::month_to_date(OffsetDateTime::now_utc()));
        let (start, end) = (format_date(range.start_date()), format_date(range.end_date()));

        let interactions = self.repo.count_interactions(&range).await?;
        if interactions == 0 {
            return Err(AppError::not_found(
                "no interactions found for the specified period",
            ));
        }
        let document = self
            .repo
            .most_cited_document(&range)
            .await?
            .ok_or_else(|| AppError::not_found("no data consulted in the specified period"))?;
        let users = self.repo.count_chat_users(&range).await?;
        if users == 0 {
            return Err(AppError::not_found("no users found for the specified period"));
        }

        Ok(if explicit {
            vec![
                Statistic::interactions_between(interactions, &start, &end),
                Statistic::most_consulted_between(document, &start, &end),
                Statistic::users_between(users, &start, &end),
            ]
        } else {
            vec![
                Statistic::monthly_interactions(interactions),
                Statistic::monthly_most_consulted(document),
                Statistic::monthly_users(users),
            ]
        })
    }

    pub async fn daily_users(&self, range: DateRange) -> AppResult<Vec<DailyStatistic>> {
        check_series_length(&range)?;
        let sparse = self.repo.daily_chat_users(&range).await?;
        non_empty_series(fill_days(&range, sparse), "users")
    }

    pub async fn daily_interactions(&self, range: DateRange) -> AppResult<Vec<DailyStatistic>> {
        check_series_length(&range)?;
        let sparse = self.repo.daily_interactions(&range).await?;
        non_empty_series(fill_days(&range, sparse), "interactions")
    }

    /// Distinct chat users with an interaction in the `active_days` days
    /// ending on each day of `range`.
    pub async fn daily_active_users(
        &self,
        range: DateRange,
        active_days: Option<i32>,
    ) -> AppResult<Vec<DailyStatistic>> {
        let active_days = active_days.unwrap_or(DEFAULT_ACTIVE_DAYS);
        if !(1..=MAX_ACTIVE_DAYS).contains(&active_days) {
            return Err(AppError::bad_request(format!(
                "active_days must be between 1 and {MAX_ACTIVE_DAYS}"
            )));
        }
        check_series_length(&range)?;
        let sparse = self.repo.daily_active_users(&range, active_days).await?;
        non_empty_series(fill_days(&range, sparse), "active users")
    }

    /// Writes the CSV export to storage and returns a 24h download link.
    pub async fn export_csv(&self, range: Option<DateRange>) -> AppResult<ExportLink> {
        let chat_users = self.repo.export_chat_users(range.as_ref()).await?;
        let interactions = self.repo.export_interactions(range.as_ref()).await?;
        let files = self.repo.export_files(range.as_ref()).await?;
        let body = export::render(&chat_users, &interactions, &files)?;

        let key = export::object_key(range.as_ref(), OffsetDateTime::now_utc());
        self.storage
            .put_object(&key, Bytes::from(body), "text/csv")
            .await
            .map_err(|e| {
                error!(%key, error = %e, "export upload failed");
                AppError::ServiceUnavailable("failed to upload export".into())
            })?;
        let download_url = self
            .storage
            .presign_get(&key, EXPORT_URL_TTL)
            .await
            .map_err(|e| {
                error!(%key, error = %e, "export presign failed");
                AppError::ServiceUnavailable("failed to generate download link".into())
            })?;

        info!(
            %key,
            chat_users = chat_users.len(),
            interactions = interactions.len(),
            files = files.len(),
            "database exported"
        );
        Ok(ExportLink { download_url })
    }
}
