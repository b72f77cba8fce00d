use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{sort_newest_first, DeleteAllResponse, PhotoRecord},
};
use storage::{BlobStore, StoredBlob};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn BlobStore>,
}

impl ApiContext {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

pub fn photos_route() -> &'static str {
    "/api/photos"
}

pub fn upload_route() -> &'static str {
    "/api/upload"
}

pub fn delete_all_route() -> &'static str {
    "/api/delete-all"
}

/// Lists every stored photo, newest first. Any store failure yields no partial list.
pub async fn list_photos(ctx: &ApiContext) -> Result<Vec<PhotoRecord>, ApiError> {
    let blobs = ctx.store.list().await.map_err(|e| {
        error!(error = %e, "error fetching photos");
        ApiError::new(ErrorCode::StorageUnavailable, "Failed to fetch photos")
    })?;

    let mut photos: Vec<PhotoRecord> = blobs.into_iter().map(photo_record).collect();
    sort_newest_first(&mut photos);
    Ok(photos)
}

/// Stores `body` as-is under a freshly minted name. One write attempt, no retry.
pub async fn upload_photo(
    ctx: &ApiContext,
    body: &[u8],
    content_type: Option<&str>,
) -> Result<PhotoRecord, ApiError> {
    let content_type = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    let pathname = photo_pathname(Utc::now(), content_type);

    let stored = ctx
        .store
        .put(&pathname, body, content_type)
        .await
        .map_err(|e| {
            error!(%pathname, error = %e, "upload error");
            ApiError::new(ErrorCode::UploadFailed, "Upload failed").with_details(e.to_string())
        })?;
    info!(url = %stored.url, size_bytes = stored.size_bytes, "photo uploaded");
    Ok(photo_record(stored))
}

/// Lists then deletes every photo, dispatching the deletes independently.
///
/// The reported count is the number of photos seen at list time. When any
/// delete fails the whole batch reports `DeleteFailed`, and photos whose
/// delete already went through stay deleted.
pub async fn delete_all_photos(ctx: &ApiContext) -> Result<DeleteAllResponse, ApiError> {
    let blobs = ctx.store.list().await.map_err(|e| {
        error!(error = %e, "error listing photos for deletion");
        delete_failed(&e)
    })?;
    let attempted = blobs.len();

    let outcomes = join_all(blobs.iter().map(|blob| ctx.store.delete(&blob.url))).await;
    let mut completed = 0usize;
    let mut first_failure = None;
    for outcome in outcomes {
        match outcome {
            Ok(()) => completed += 1,
            Err(e) => {
                first_failure.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_failure {
        warn!(attempted, completed, error = %e, "error deleting photos");
        return Err(delete_failed(&e));
    }

    info!(attempted, "deleted all photos");
    Ok(DeleteAllResponse::attempted(attempted))
}

/// Timestamped name with a random suffix, e.g. `photo-1707900000123-9f86d081.jpg`.
pub fn photo_pathname(now: DateTime<Utc>, content_type: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "photo-{}-{}.{}",
        now.timestamp_millis(),
        &suffix[..8],
        extension_for(content_type)
    )
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/avif" => "avif",
        _ => "jpg",
    }
}

fn photo_record(blob: StoredBlob) -> PhotoRecord {
    PhotoRecord {
        url: blob.url,
        uploaded_at: blob.uploaded_at,
    }
}

fn delete_failed(err: &anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::DeleteFailed, "Failed to delete photos").with_details(err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
