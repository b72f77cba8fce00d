use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Route prefix under which stored blobs are served back to clients.
pub const BLOB_ROUTE_PREFIX: &str = "/blobs";

/// Descriptor of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub url: String,
    pub pathname: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BlobContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Append-only object store the photo proxy talks to.
///
/// Implementations make no promise about ordering between concurrent calls;
/// `delete` of a url that no longer exists succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self) -> Result<Vec<StoredBlob>>;
    async fn put(&self, pathname: &str, bytes: &[u8], content_type: &str) -> Result<StoredBlob>;
    async fn delete(&self, url: &str) -> Result<()>;
    async fn get(&self, pathname: &str) -> Result<Option<BlobContent>>;
}

/// SQLite-backed blob store. Urls are minted against `public_base_url`.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    public_base_url: String,
}

impl Storage {
    pub async fn new(database_url: &str, public_base_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every pooled connection to `:memory:` would open its own empty database
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub fn url_for(&self, pathname: &str) -> String {
        format!("{}{BLOB_ROUTE_PREFIX}/{pathname}", self.public_base_url)
    }
}

#[async_trait]
impl BlobStore for Storage {
    async fn list(&self) -> Result<Vec<StoredBlob>> {
        let rows = sqlx::query(
            "SELECT url, pathname, content_type, size_bytes, uploaded_at_ms FROM blobs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list blobs")?;

        rows.into_iter()
            .map(|r| {
                let uploaded_at_ms = r.get::<i64, _>(4);
                Ok(StoredBlob {
                    url: r.get::<String, _>(0),
                    pathname: r.get::<String, _>(1),
                    content_type: r.get::<String, _>(2),
                    size_bytes: r.get::<i64, _>(3).max(0) as u64,
                    uploaded_at: millis_to_datetime(uploaded_at_ms)?,
                })
            })
            .collect()
    }

    async fn put(&self, pathname: &str, bytes: &[u8], content_type: &str) -> Result<StoredBlob> {
        let pathname = pathname.trim_start_matches('/');
        if pathname.is_empty() {
            return Err(anyhow!("blob pathname cannot be empty"));
        }

        let url = self.url_for(pathname);
        let uploaded_at = Utc::now();
        let size_bytes = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        sqlx::query(
            "INSERT INTO blobs (pathname, url, content_type, size_bytes, body, uploaded_at_ms) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(pathname)
        .bind(&url)
        .bind(content_type)
        .bind(size_bytes)
        .bind(bytes)
        .bind(uploaded_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store blob '{pathname}'"))?;
        debug!(%url, size_bytes, "blob stored");

        Ok(StoredBlob {
            url,
            pathname: pathname.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
            uploaded_at: millis_to_datetime(uploaded_at.timestamp_millis())?,
        })
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM blobs WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete blob '{url}'"))?;
        debug!(%url, removed = result.rows_affected(), "blob delete");
        Ok(())
    }

    async fn get(&self, pathname: &str) -> Result<Option<BlobContent>> {
        let row = sqlx::query("SELECT content_type, body FROM blobs WHERE pathname = ?")
            .bind(pathname)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load blob '{pathname}'"))?;
        Ok(row.map(|r| BlobContent {
            content_type: r.get::<String, _>(0),
            bytes: r.get::<Vec<u8>, _>(1),
        }))
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("stored upload time {millis} is out of range"))
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
