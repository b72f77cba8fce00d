use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored photo as seen by clients. `uploadedAt` travels as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    pub success: bool,
    pub deleted_count: usize,
    pub message: String,
}

impl DeleteAllResponse {
    pub fn attempted(deleted_count: usize) -> Self {
        Self {
            success: true,
            deleted_count,
            message: format!("Deleted {deleted_count} photos"),
        }
    }
}

/// Sorts newest first. Equal timestamps keep no particular order.
pub fn sort_newest_first(photos: &mut [PhotoRecord]) {
    photos.sort_unstable_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
}
