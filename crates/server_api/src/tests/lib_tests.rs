use super::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone};
use std::sync::Mutex;
use storage::{BlobContent, Storage};

#[derive(Default)]
struct FakeStore {
    blobs: Mutex<Vec<StoredBlob>>,
    fail_list: bool,
    fail_put: bool,
    fail_delete_of: Option<String>,
}

impl FakeStore {
    fn with_blobs(blobs: Vec<StoredBlob>) -> Self {
        Self {
            blobs: Mutex::new(blobs),
            ..Self::default()
        }
    }

    fn urls(&self) -> Vec<String> {
        self.blobs
            .lock()
            .expect("lock")
            .iter()
            .map(|blob| blob.url.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for FakeStore {
    async fn list(&self) -> Result<Vec<StoredBlob>> {
        if self.fail_list {
            return Err(anyhow!("store offline"));
        }
        Ok(self.blobs.lock().expect("lock").clone())
    }

    async fn put(&self, pathname: &str, bytes: &[u8], content_type: &str) -> Result<StoredBlob> {
        if self.fail_put {
            return Err(anyhow!("quota exceeded"));
        }
        let blob = StoredBlob {
            url: format!("https://blob.test/{pathname}"),
            pathname: pathname.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            uploaded_at: Utc::now(),
        };
        self.blobs.lock().expect("lock").push(blob.clone());
        Ok(blob)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        if self.fail_delete_of.as_deref() == Some(url) {
            return Err(anyhow!("delete refused for {url}"));
        }
        self.blobs.lock().expect("lock").retain(|blob| blob.url != url);
        Ok(())
    }

    async fn get(&self, _pathname: &str) -> Result<Option<BlobContent>> {
        Ok(None)
    }
}

fn blob_at(name: &str, millis: i64) -> StoredBlob {
    StoredBlob {
        url: format!("https://blob.test/{name}"),
        pathname: name.to_string(),
        content_type: DEFAULT_CONTENT_TYPE.to_string(),
        size_bytes: 1,
        uploaded_at: Utc.timestamp_millis_opt(millis).unwrap(),
    }
}

fn context(store: FakeStore) -> (ApiContext, Arc<FakeStore>) {
    let store = Arc::new(store);
    (ApiContext::new(store.clone()), store)
}

#[tokio::test]
async fn list_photos_orders_newest_first() {
    let (ctx, _store) = context(FakeStore::with_blobs(vec![
        blob_at("old.jpg", 1_000),
        blob_at("newest.jpg", 3_000),
        blob_at("middle.jpg", 2_000),
    ]));

    let photos = list_photos(&ctx).await.expect("list");
    let urls: Vec<&str> = photos.iter().map(|photo| photo.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://blob.test/newest.jpg",
            "https://blob.test/middle.jpg",
            "https://blob.test/old.jpg"
        ]
    );
}

#[tokio::test]
async fn list_failure_reports_storage_unavailable() {
    let (ctx, _store) = context(FakeStore {
        fail_list: true,
        ..FakeStore::default()
    });
    let err = list_photos(&ctx).await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::StorageUnavailable);
}

#[tokio::test]
async fn upload_png_returns_url_and_recent_timestamp() {
    let (ctx, store) = context(FakeStore::default());
    let before = Utc::now();

    let record = upload_photo(&ctx, &[0u8; 10], Some("image/png"))
        .await
        .expect("upload");

    assert!(record.url.starts_with("https://blob.test/photo-"));
    assert!(record.url.ends_with(".png"));
    assert!(record.uploaded_at >= before - Duration::seconds(5));
    assert!(record.uploaded_at <= Utc::now() + Duration::seconds(5));

    let stored = store.blobs.lock().expect("lock").clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].size_bytes, 10);
    assert_eq!(stored[0].content_type, "image/png");
}

#[tokio::test]
async fn upload_without_content_type_defaults_to_jpeg() {
    let (ctx, store) = context(FakeStore::default());
    let record = upload_photo(&ctx, b"raw", Some("  ")).await.expect("upload");
    assert!(record.url.ends_with(".jpg"));
    assert_eq!(
        store.blobs.lock().expect("lock")[0].content_type,
        DEFAULT_CONTENT_TYPE
    );
}

#[tokio::test]
async fn upload_accepts_empty_and_non_image_payloads() {
    let (ctx, store) = context(FakeStore::default());
    upload_photo(&ctx, b"", Some("application/pdf"))
        .await
        .expect("empty upload");
    assert_eq!(store.urls().len(), 1);
}

#[tokio::test]
async fn upload_failure_leaves_no_record() {
    let (ctx, store) = context(FakeStore {
        fail_put: true,
        ..FakeStore::default()
    });
    let err = upload_photo(&ctx, b"bytes", None)
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::UploadFailed);
    assert_eq!(err.details.as_deref(), Some("quota exceeded"));
    assert!(store.urls().is_empty());
}

#[tokio::test]
async fn uploaded_photo_is_listed_first() {
    let storage = Storage::new("sqlite::memory:", "http://127.0.0.1:3000")
        .await
        .expect("db");
    let ctx = ApiContext::new(Arc::new(storage));

    upload_photo(&ctx, b"first", None).await.expect("first");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let latest = upload_photo(&ctx, b"second", Some("image/png"))
        .await
        .expect("second");

    let photos = list_photos(&ctx).await.expect("list");
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0], latest);
}

#[tokio::test]
async fn delete_all_on_empty_store_reports_zero() {
    let (ctx, _store) = context(FakeStore::default());
    let response = delete_all_photos(&ctx).await.expect("delete all");
    assert_eq!(response.deleted_count, 0);
    assert!(response.success);
}

#[tokio::test]
async fn delete_all_reports_listed_count() {
    let (ctx, store) = context(FakeStore::with_blobs(vec![
        blob_at("a.jpg", 1),
        blob_at("b.jpg", 2),
        blob_at("c.jpg", 3),
    ]));
    let response = delete_all_photos(&ctx).await.expect("delete all");
    assert_eq!(response.deleted_count, 3);
    assert_eq!(response.message, "Deleted 3 photos");
    assert!(store.urls().is_empty());
}

#[tokio::test]
async fn delete_all_partial_failure_is_not_rolled_back() {
    let (ctx, store) = context(FakeStore {
        blobs: Mutex::new(vec![
            blob_at("a.jpg", 1),
            blob_at("stuck.jpg", 2),
            blob_at("c.jpg", 3),
        ]),
        fail_delete_of: Some("https://blob.test/stuck.jpg".to_string()),
        ..FakeStore::default()
    });

    let err = delete_all_photos(&ctx).await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::DeleteFailed);
    assert_eq!(store.urls(), vec!["https://blob.test/stuck.jpg".to_string()]);
}

#[tokio::test]
async fn delete_all_list_failure_reports_delete_failed() {
    let (ctx, _store) = context(FakeStore {
        fail_list: true,
        ..FakeStore::default()
    });
    let err = delete_all_photos(&ctx).await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::DeleteFailed);
}

#[test]
fn pathname_carries_timestamp_suffix_and_extension() {
    let now = Utc.timestamp_millis_opt(1_707_900_000_123).unwrap();
    let name = photo_pathname(now, "image/webp; charset=binary");
    assert!(name.starts_with("photo-1707900000123-"));
    assert!(name.ends_with(".webp"));
    assert_eq!(name.len(), "photo-1707900000123-".len() + 8 + ".webp".len());
    assert_ne!(name, photo_pathname(now, "image/webp"));
}
