use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{DataFile, NewDataFile};
use crate::{
    error::{AppError, AppResult},
    pagination::{Page, Paginated},
};

#[async_trait]
pub trait FileRepo: Send + Sync {
    async fn create(&self, file: NewDataFile) -> AppResult<DataFile>;
    async fn list(&self, page: Page) -> AppResult<Paginated<DataFile>>;
    /// Removes the row and returns it, or `None` when the id is unknown.
    async fn delete(&self, id: i64) -> AppResult<Option<DataFile>>;
    /// The subset of `keys` that still have a metadata row.
    async fn existing_keys(&self, keys: &[String]) -> AppResult<Vec<String>>;
}

#[derive(Clone)]
pub struct PgFileRepo {
    db: PgPool,
}

impl PgFileRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const FILE_SELECT: &str = r#"
    SELECT f.id, f.filename, f.s3_key, f.user_id, u.email AS user_email, f.created_at
    FROM files f
    LEFT JOIN users u ON u.id = f.user_id
"#;

#[async_trait]
impl FileRepo for PgFileRepo {
    async fn create(&self, file: NewDataFile) -> AppResult<DataFile> {
        sqlx::query_as::<_, DataFile>(
            r#"
            WITH f AS (
                INSERT INTO files (filename, s3_key, user_id)
                VALUES ($1, $2, $3)
                RETURNING id, filename, s3_key, user_id, created_at
            )
            SELECT f.id, f.filename, f.s3_key, f.user_id, u.email AS user_email, f.created_at
            FROM f
            LEFT JOIN users u ON u.id = f.user_id
            "#,
        )
        .bind(&file.filename)
        .bind(&file.s3_key)
        .bind(file.user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "save file"))
    }

    async fn list(&self, page: Page) -> AppResult<Paginated<DataFile>> {
        let rows = sqlx::query_as::<_, DataFile>(&format!(
            "{FILE_SELECT} ORDER BY f.created_at DESC, f.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "list files"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "count files"))?;

        Ok(Paginated::new(rows, page, total))
    }

    async fn delete(&self, id: i64) -> AppResult<Option<DataFile>> {
        sqlx::query_as::<_, DataFile>(
            r#"
            WITH f AS (
                DELETE FROM files WHERE id = $1
                RETURNING id, filename, s3_key, user_id, created_at
            )
            SELECT f.id, f.filename, f.s3_key, f.user_id, u.email AS user_email, f.created_at
            FROM f
            LEFT JOIN users u ON u.id = f.user_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_db(e, "delete file"))
    }

    async fn existing_keys(&self, keys: &[String]) -> AppResult<Vec<String>> {
        sqlx::query_scalar("SELECT s3_key FROM files WHERE s3_key = ANY($1)")
            .bind(keys)
            .fetch_all(&self.db)
            .await
            .map_err(|e| AppError::from_db(e, "check file keys"))
    }
}
