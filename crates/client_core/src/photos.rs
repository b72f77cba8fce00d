use reqwest::{header::CONTENT_TYPE, Client, Response};
use shared::{
    error::ApiError,
    protocol::{sort_newest_first, DeleteAllResponse, PhotoRecord},
};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("photos are unavailable: {0}")]
    StorageUnavailable(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

/// Client-side cache of the photo wall, kept newest first.
///
/// Every call is a single request with no retry; a failed call leaves the
/// cache as it was.
pub struct PhotoWall {
    http: Client,
    server_url: String,
    photos: Vec<PhotoRecord>,
}

impl PhotoWall {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            photos: Vec::new(),
        }
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub async fn refresh(&mut self) -> Result<&[PhotoRecord], PhotoError> {
        let response = self
            .http
            .get(format!("{}/api/photos", self.server_url))
            .send()
            .await
            .map_err(|e| PhotoError::StorageUnavailable(e.to_string()))?;
        let mut photos: Vec<PhotoRecord> = success_json(response)
            .await
            .map_err(PhotoError::StorageUnavailable)?;

        sort_newest_first(&mut photos);
        self.photos = photos;
        Ok(&self.photos)
    }

    pub async fn upload(
        &mut self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<PhotoRecord, PhotoError> {
        let mut request = self
            .http
            .post(format!("{}/api/upload", self.server_url))
            .body(bytes);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PhotoError::UploadFailed(e.to_string()))?;
        let record: PhotoRecord = success_json(response)
            .await
            .map_err(PhotoError::UploadFailed)?;

        let position = self
            .photos
            .iter()
            .position(|photo| photo.uploaded_at <= record.uploaded_at)
            .unwrap_or(self.photos.len());
        self.photos.insert(position, record.clone());
        Ok(record)
    }

    /// Returns the count the server saw at list time, not a confirmed deletion count.
    pub async fn delete_all(&mut self) -> Result<usize, PhotoError> {
        let response = self
            .http
            .delete(format!("{}/api/delete-all", self.server_url))
            .send()
            .await
            .map_err(|e| PhotoError::DeleteFailed(e.to_string()))?;
        let body: DeleteAllResponse = success_json(response)
            .await
            .map_err(PhotoError::DeleteFailed)?;

        self.photos.clear();
        Ok(body.deleted_count)
    }
}

async fn success_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&text) {
            Ok(err) => match err.details {
                Some(details) => format!("{} ({details})", err.message),
                None => err.message,
            },
            Err(_) if text.trim().is_empty() => status.to_string(),
            Err(_) => text,
        };
        warn!(%status, %message, "photo request failed");
        return Err(message);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| format!("malformed response: {e}"))
}

#[cfg(test)]
#[path = "tests/photos_tests.rs"]
mod tests;
