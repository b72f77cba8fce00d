use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, MethodRouter},
    Json, Router,
};
use server_api::{
    delete_all_photos, delete_all_route, list_photos, photos_route, upload_photo, upload_route,
    ApiContext,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{DeleteAllResponse, PhotoRecord},
};
use storage::{BlobStore, Storage, BLOB_ROUTE_PREFIX};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url, &settings.public_base_url)
        .await
        .map_err(|error| {
            error!(
                %database_url,
                %error,
                "failed to open blob database; verify parent directory exists and permissions are correct"
            );
            error
        })?;
    let store: Arc<dyn BlobStore> = Arc::new(storage);

    let state = AppState {
        api: ApiContext::new(store),
        max_upload_bytes: settings.max_upload_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, public_base_url = %settings.public_base_url, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = match state.max_upload_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            photos_route(),
            proxy_route(get(http_list_photos), Method::GET),
        )
        .route(
            upload_route(),
            proxy_route(post(http_upload_photo), Method::POST).layer(upload_limit),
        )
        .route(
            delete_all_route(),
            proxy_route(delete(http_delete_all_photos), Method::DELETE),
        )
        .route(&format!("{BLOB_ROUTE_PREFIX}/:pathname"), get(download_blob))
        .with_state(state)
}

/// Wraps a proxy route with permissive CORS and a JSON 405 for other methods.
/// `OPTIONS` never reaches the route: the CORS layer answers it with 200.
fn proxy_route(
    route: MethodRouter<Arc<AppState>>,
    method: Method,
) -> MethodRouter<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([method, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    route.fallback(method_not_allowed).layer(cors)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn method_not_allowed() -> HttpError {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiError::new(
            ErrorCode::MethodNotAllowed,
            "Method not allowed",
        )),
    )
}

async fn http_list_photos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PhotoRecord>>, HttpError> {
    let photos = list_photos(&state.api).await.map_err(http_error)?;
    Ok(Json(photos))
}

async fn http_upload_photo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PhotoRecord>, HttpError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let record = upload_photo(&state.api, &body, content_type)
        .await
        .map_err(http_error)?;
    Ok(Json(record))
}

async fn http_delete_all_photos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeleteAllResponse>, HttpError> {
    let response = delete_all_photos(&state.api).await.map_err(http_error)?;
    Ok(Json(response))
}

async fn download_blob(
    State(state): State<Arc<AppState>>,
    Path(pathname): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let blob = state
        .api
        .store
        .get(&pathname)
        .await
        .map_err(|e| {
            http_error(
                ApiError::new(ErrorCode::StorageUnavailable, "Failed to load photo")
                    .with_details(e.to_string()),
            )
        })?
        .ok_or_else(|| http_error(ApiError::new(ErrorCode::NotFound, "photo not found")))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    Ok((StatusCode::OK, headers, blob.bytes))
}

fn http_error(err: ApiError) -> HttpError {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::StorageUnavailable
        | ErrorCode::UploadFailed
        | ErrorCode::DeleteFailed
        | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
