use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::{dates::DateRange, repo_types::DailyStatistic};
use crate::{
    chat_users::repo_types::ChatUser,
    error::{AppError, AppResult},
    interactions::repo_types::Interaction,
    knowledge::repo_types::DataFile,
};

/// Read-only aggregate queries behind the analytics endpoints.
///
/// Daily queries may omit empty days; callers zero-fill.
#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn count_interactions(&self, range: &DateRange) -> AppResult<i64>;
    async fn most_cited_document(&self, range: &DateRange) -> AppResult<Option<String>>;
    async fn count_chat_users(&self, range: &DateRange) -> AppResult<i64>;

    async fn daily_chat_users(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>>;
    async fn daily_interactions(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>>;
    async fn daily_active_users(
        &self,
        range: &DateRange,
        active_days: i32,
    ) -> AppResult<Vec<DailyStatistic>>;

    async fn export_chat_users(&self, range: Option<&DateRange>) -> AppResult<Vec<ChatUser>>;
    async fn export_interactions(&self, range: Option<&DateRange>) -> AppResult<Vec<Interaction>>;
    async fn export_files(&self, range: Option<&DateRange>) -> AppResult<Vec<DataFile>>;
}

#[derive(Clone)]
pub struct PgAnalyticsRepo {
    db: PgPool,
}

impl PgAnalyticsRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn bounds(range: Option<&DateRange>) -> (Option<OffsetDateTime>, Option<OffsetDateTime>) {
    (range.map(|r| r.start), range.map(|r| r.end))
}

#[async_trait]
impl AnalyticsRepo for PgAnalyticsRepo {
    async fn count_interactions(&self, range: &DateRange) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM interactions WHERE created_at >= $1 AND created_at <= $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "count interactions"))
    }

    async fn most_cited_document(&self, range: &DateRange) -> AppResult<Option<String>> {
        sqlx::query_scalar(
            r#"
            SELECT uri
            FROM interactions, unnest(context_interaction) AS uri
            WHERE created_at >= $1 AND created_at <= $2
            GROUP BY uri
            ORDER BY COUNT(*) DESC, uri ASC
            LIMIT 1
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "most cited document"))
    }

    async fn count_chat_users(&self, range: &DateRange) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT id) FROM chat_users WHERE created_at >= $1 AND created_at <= $2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "count chat users"))
    }

    async fn daily_chat_users(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>> {
        sqlx::query_as::<_, DailyStatistic>(
            r#"
            SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
                   COUNT(*) AS count
            FROM chat_users
            WHERE created_at >= $1 AND created_at <= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "daily chat users"))
    }

    async fn daily_interactions(&self, range: &DateRange) -> AppResult<Vec<DailyStatistic>> {
        sqlx::query_as::<_, DailyStatistic>(
            r#"
            SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date,
                   COUNT(*) AS count
            FROM interactions
            WHERE created_at >= $1 AND created_at <= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "daily interactions"))
    }

    async fn daily_active_users(
        &self,
        range: &DateRange,
        active_days: i32,
    ) -> AppResult<Vec<DailyStatistic>> {
        // window for day d is (d - active_days, d], in whole UTC days
        sqlx::query_as::<_, DailyStatistic>(
            r#"
            SELECT to_char(d.day, 'YYYY-MM-DD') AS date,
                   COUNT(DISTINCT i.user_chat_id) AS count
            FROM generate_series($1::date, $2::date, interval '1 day') AS d(day)
            LEFT JOIN interactions i
              ON i.created_at >= ((d.day + interval '1 day' - make_interval(days => $3))
                                  AT TIME ZONE 'UTC')
             AND i.created_at <  ((d.day + interval '1 day') AT TIME ZONE 'UTC')
            GROUP BY d.day
            ORDER BY d.day
            "#,
        )
        .bind(range.start_date())
        .bind(range.end_date())
        .bind(active_days)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "daily active users"))
    }

    async fn export_chat_users(&self, range: Option<&DateRange>) -> AppResult<Vec<ChatUser>> {
        let (start, end) = bounds(range);
        sqlx::query_as::<_, ChatUser>(
            r#"
            SELECT id, age, gender, occupation, location, created_at
            FROM chat_users
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "export chat users"))
    }

    async fn export_interactions(&self, range: Option<&DateRange>) -> AppResult<Vec<Interaction>> {
        let (start, end) = bounds(range);
        sqlx::query_as::<_, Interaction>(
            r#"
            SELECT id, user_chat_id, context_interaction, created_at
            FROM interactions
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at <= $2)
            ORDER BY id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "export interactions"))
    }

    async fn export_files(&self, range: Option<&DateRange>) -> AppResult<Vec<DataFile>> {
        let (start, end) = bounds(range);
        sqlx::query_as::<_, DataFile>(
            r#"
            SELECT f.id, f.filename, f.s3_key, f.user_id, u.email AS user_email, f.created_at
            FROM files f
            LEFT JOIN users u ON u.id = f.user_id
            WHERE ($1::timestamptz IS NULL OR f.created_at >= $1)
              AND ($2::timestamptz IS NULL OR f.created_at <= $2)
            ORDER BY f.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "export files"))
    }
}
