use std::{collections::HashSet, sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    repo::FileRepo,
    repo_types::{DataFile, NewDataFile},
};
use crate::{
    error::{AppError, AppResult},
    pagination::{Page, Paginated},
    storage::{ObjectPage, StorageClient},
    users::repo_types::User,
};

pub const DATA_PREFIX: &str = "data/";
const UPLOAD_URL_TTL: Duration = Duration::from_secs(60);
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_LISTING_SIZE: i32 = 100;
const MAX_LISTING_SIZE: i32 = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub url: String,
    pub file: DataFile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithUrl {
    #[serde(flatten)]
    pub file: DataFile,
    pub url: String,
}

/// Last path segment of `raw`, trimmed. Empty when nothing usable is left.
pub(crate) fn clean_filename(raw: &str) -> String {
    raw.trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn storage_unavailable(action: &'static str) -> impl FnOnce(anyhow::Error) -> AppError {
    move |e| {
        error!(error = %e, "{action} failed");
        AppError::ServiceUnavailable(format!("{action} failed"))
    }
}

/// Uploads, listings and deletion of knowledge-base documents.
#[derive(Clone)]
pub struct FileService {
    repo: Arc<dyn FileRepo>,
    storage: Arc<dyn StorageClient>,
}

impl FileService {
    pub fn new(repo: Arc<dyn FileRepo>, storage: Arc<dyn StorageClient>) -> Self {
        Self { repo, storage }
    }

    pub async fn issue_upload_url(&self, user: &User, filename: &str) -> AppResult<UploadTicket> {
        let filename = clean_filename(filename);
        if filename.is_empty() {
            warn!(user_id = %user.id, "upload refused: empty filename");
            return Err(AppError::bad_request("filename is required"));
        }

        let key = format!("{DATA_PREFIX}{filename}-{}", Uuid::new_v4());
        let url = self
            .storage
            .presign_put(&key, UPLOAD_URL_TTL)
            .await
            .map_err(storage_unavailable("presign upload"))?;

        let file = self
            .repo
            .create(NewDataFile {
                filename,
                s3_key: key,
                user_id: Some(user.id),
            })
            .await?;
        info!(file_id = file.id, key = %file.s3_key, user_id = %user.id, "upload url issued");
        Ok(UploadTicket { url, file })
    }

    pub async fn list_files(&self, page: Page) -> AppResult<Paginated<FileWithUrl>> {
        let files = self.repo.list(page).await?;
        let mut data = Vec::with_capacity(files.data.len());
        for file in files.data {
            let url = self
                .storage
                .presign_get(&file.s3_key, DOWNLOAD_URL_TTL)
                .await
                .map_err(storage_unavailable("presign download"))?;
            data.push(FileWithUrl { file, url });
        }
        Ok(Paginated::new(data, page, files.total))
    }

    pub async fn list_objects(
        &self,
        page_size: Option<i32>,
        continuation_token: Option<String>,
    ) -> AppResult<ObjectPage> {
        let page_size = page_size.unwrap_or(DEFAULT_LISTING_SIZE);
        if !(1..=MAX_LISTING_SIZE).contains(&page_size) {
            return Err(AppError::bad_request("Invalid page size"));
        }
        self.storage
            .list_objects(
                DATA_PREFIX,
                page_size,
                continuation_token.filter(|t| !t.is_empty()),
            )
            .await
            .map_err(storage_unavailable("list objects"))
    }

    /// Drops the metadata row, then the stored object.
    pub async fn delete_file(&self, id: i64) -> AppResult<()> {
        let file = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;

        if let Err(e) = self.storage.delete_object(&file.s3_key).await {
            error!(
                file_id = id,
                orphaned_key = %file.s3_key,
                error = %e,
                "object delete failed after metadata removal"
            );
            return Err(AppError::ServiceUnavailable(
                "File record removed but the stored object could not be deleted".into(),
            ));
        }
        info!(file_id = id, key = %file.s3_key, "file deleted");
        Ok(())
    }

    /// Deletes objects under `data/` that no metadata row points at.
    pub async fn reconcile_orphans(&self) -> AppResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token = None;
        loop {
            let page = self
                .storage
                .list_objects(DATA_PREFIX, MAX_LISTING_SIZE, token)
                .await
                .map_err(storage_unavailable("list objects"))?;
            keys.extend(page.keys);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let known: HashSet<String> = self.repo.existing_keys(&keys).await?.into_iter().collect();
        let mut removed = Vec::new();
        for key in keys.into_iter().filter(|k| !known.contains(k)) {
            self.storage
                .delete_object(&key)
                .await
                .map_err(storage_unavailable("delete orphan"))?;
            removed.push(key);
        }
        info!(removed = removed.len(), "orphaned objects reconciled");
        Ok(removed)
    }
}
