use super::*;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use shared::error::ErrorCode;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct StubState {
    photos: Arc<Mutex<Vec<PhotoRecord>>>,
    content_types: Arc<Mutex<Vec<Option<String>>>>,
    offline: Arc<Mutex<bool>>,
}

type StubError = (StatusCode, Json<ApiError>);

fn stub_failure(code: ErrorCode, message: &str) -> StubError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(code, message).with_details("store offline")),
    )
}

async fn stub_list(State(state): State<StubState>) -> Result<Json<Vec<PhotoRecord>>, StubError> {
    if *state.offline.lock().expect("lock") {
        return Err(stub_failure(
            ErrorCode::StorageUnavailable,
            "Failed to fetch photos",
        ));
    }
    // deliberately oldest first so the client has to sort
    let mut photos = state.photos.lock().expect("lock").clone();
    photos.sort_by_key(|photo| photo.uploaded_at);
    Ok(Json(photos))
}

async fn stub_upload(
    State(state): State<StubState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<PhotoRecord>, StubError> {
    if *state.offline.lock().expect("lock") {
        return Err(stub_failure(ErrorCode::UploadFailed, "Upload failed"));
    }
    state.content_types.lock().expect("lock").push(
        headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    let mut photos = state.photos.lock().expect("lock");
    let record = PhotoRecord {
        url: format!("http://stub/photo-{}-{}.jpg", photos.len(), body.len()),
        uploaded_at: Utc
            .timestamp_millis_opt(10_000 + photos.len() as i64 * 1_000)
            .unwrap(),
    };
    photos.push(record.clone());
    Ok(Json(record))
}

async fn stub_delete_all(
    State(state): State<StubState>,
) -> Result<Json<DeleteAllResponse>, StubError> {
    if *state.offline.lock().expect("lock") {
        return Err(stub_failure(ErrorCode::DeleteFailed, "Failed to delete photos"));
    }
    let mut photos = state.photos.lock().expect("lock");
    let count = photos.len();
    photos.clear();
    Ok(Json(DeleteAllResponse::attempted(count)))
}

async fn spawn_photo_server(state: StubState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/api/photos", get(stub_list))
        .route("/api/upload", post(stub_upload))
        .route("/api/delete-all", delete(stub_delete_all))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn refresh_caches_newest_first() {
    let state = StubState::default();
    state.photos.lock().expect("lock").extend([
        PhotoRecord {
            url: "http://stub/a.jpg".into(),
            uploaded_at: Utc.timestamp_millis_opt(1_000).unwrap(),
        },
        PhotoRecord {
            url: "http://stub/b.jpg".into(),
            uploaded_at: Utc.timestamp_millis_opt(3_000).unwrap(),
        },
    ]);
    let mut wall = PhotoWall::new(spawn_photo_server(state).await);

    let photos = wall.refresh().await.expect("refresh");
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].url, "http://stub/b.jpg");
    assert_eq!(photos[1].url, "http://stub/a.jpg");
}

#[tokio::test]
async fn upload_puts_new_photo_at_front_and_forwards_content_type() {
    let state = StubState::default();
    let mut wall = PhotoWall::new(spawn_photo_server(state.clone()).await);

    wall.upload(vec![1; 4], None).await.expect("first upload");
    let latest = wall
        .upload(vec![2; 10], Some("image/png"))
        .await
        .expect("second upload");

    assert_eq!(wall.photos()[0], latest);
    assert_eq!(wall.photos().len(), 2);
    assert_eq!(
        state.content_types.lock().expect("lock")[1].as_deref(),
        Some("image/png")
    );

    let refreshed = wall.refresh().await.expect("refresh");
    assert_eq!(refreshed[0], latest);
}

#[tokio::test]
async fn delete_all_clears_cache_and_returns_count() {
    let state = StubState::default();
    let mut wall = PhotoWall::new(spawn_photo_server(state).await);
    wall.upload(b"one".to_vec(), None).await.expect("upload");
    wall.upload(b"two".to_vec(), None).await.expect("upload");

    assert_eq!(wall.delete_all().await.expect("delete"), 2);
    assert!(wall.photos().is_empty());
    assert_eq!(wall.delete_all().await.expect("delete empty"), 0);
}

#[tokio::test]
async fn server_failures_map_to_taxonomy_and_keep_cache() {
    let state = StubState::default();
    let mut wall = PhotoWall::new(spawn_photo_server(state.clone()).await);
    wall.upload(b"kept".to_vec(), None).await.expect("upload");
    *state.offline.lock().expect("lock") = true;

    let err = wall.refresh().await.expect_err("refresh should fail");
    assert!(matches!(err, PhotoError::StorageUnavailable(ref m) if m.contains("Failed to fetch photos")));
    assert_eq!(wall.photos().len(), 1);

    let err = wall.upload(b"x".to_vec(), None).await.expect_err("upload");
    assert!(matches!(err, PhotoError::UploadFailed(ref m) if m.contains("store offline")));

    let err = wall.delete_all().await.expect_err("delete");
    assert!(matches!(err, PhotoError::DeleteFailed(_)));
    assert_eq!(wall.photos().len(), 1);
}

#[tokio::test]
async fn unreachable_server_is_storage_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mut wall = PhotoWall::new(format!("http://{addr}"));
    let err = wall.refresh().await.expect_err("should fail");
    assert!(matches!(err, PhotoError::StorageUnavailable(_)));
}
